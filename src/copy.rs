//! Re-create a single record, optionally in another table, with overrides.
//!
//! The workflow runs in a fixed order: locate the source row and fetch the
//! target definition, validate overrides, reconcile each list field against
//! its live definition, then submit. Nothing is written unless every earlier
//! step succeeded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::pages::{fetch_records, PageSource, INTERNAL_FIELDS};
use crate::reconcile::{reconcile, ListDefinition, ListKind};
use crate::resource::Resource;
use crate::Record;

/// One column of a table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "Type")]
    pub field_type: String,
    #[serde(default = "editable_by_default")]
    pub editable: bool,
}

fn editable_by_default() -> bool {
    true
}

impl FieldDefinition {
    pub fn list_kind(&self) -> Option<ListKind> {
        ListKind::from_field_type(&self.field_type)
    }
}

/// Table-level operations the copy workflow needs beyond page fetches.
#[async_trait]
pub trait RecordStore: PageSource {
    async fn table_definition(&self, table: &str) -> Result<Vec<FieldDefinition>>;

    /// Current index→value definition of a list-typed field.
    async fn list_definition(&self, table: &str, field: &str) -> Result<ListDefinition>;

    /// Insert `record`, returning the created row when the backend echoes it.
    async fn create_record(&self, table: &str, record: &Record) -> Result<Option<Record>>;
}

#[derive(Debug, Clone)]
pub struct CopyRequest {
    pub source_table: String,
    /// Defaults to `source_table`.
    pub target_table: Option<String>,
    /// `where` fragment that must match exactly one source row.
    pub predicate: String,
    /// Values replacing (or adding to) the copied fields. List fields take an
    /// array of values.
    pub overrides: Record,
}

impl CopyRequest {
    pub fn new(source_table: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
            target_table: None,
            predicate: predicate.into(),
            overrides: Record::new(),
        }
    }

    pub fn into_table(mut self, table: impl Into<String>) -> Self {
        self.target_table = Some(table.into());
        self
    }

    pub fn with_override(mut self, field: impl Into<String>, value: Value) -> Self {
        self.overrides.insert(field.into(), value);
        self
    }

    pub fn target(&self) -> &str {
        self.target_table.as_deref().unwrap_or(&self.source_table)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyOutcome {
    /// The record as submitted, with list fields already mapped to indices.
    pub submitted: Record,
    pub created: Option<Record>,
}

pub async fn copy_record<S: RecordStore + ?Sized>(
    store: &S,
    request: &CopyRequest,
) -> Result<CopyOutcome> {
    let target = request.target();

    let source = locate_source(store, request).await?;
    let fields = store.table_definition(target).await?;

    validate_overrides(&fields, target, &request.overrides)?;

    let mut record = Record::new();
    for (name, value) in source {
        if INTERNAL_FIELDS.contains(&name.as_str()) {
            continue;
        }
        if fields.iter().any(|field| field.name == name && field.editable) {
            record.insert(name, value);
        }
    }
    for (name, value) in &request.overrides {
        record.insert(name.clone(), value.clone());
    }

    for field in &fields {
        let Some(kind) = field.list_kind() else {
            continue;
        };
        let desired = match record.get(&field.name) {
            None | Some(Value::Null) => continue,
            Some(value) => list_values(value),
        };
        let definition = store.list_definition(target, &field.name).await?;
        let indices = reconcile(&definition, kind, &desired);
        if indices.len() < desired.len() {
            warn!(
                table = target,
                field = %field.name,
                dropped = desired.len() - indices.len(),
                "list values missing from the target definition were dropped"
            );
        }
        record.insert(field.name.clone(), json!(indices));
    }

    let created = store.create_record(target, &record).await?;
    info!(
        source = %request.source_table,
        target,
        fields = record.len(),
        "copied record"
    );
    Ok(CopyOutcome {
        submitted: record,
        created,
    })
}

async fn locate_source<S: RecordStore + ?Sized>(
    store: &S,
    request: &CopyRequest,
) -> Result<Record> {
    let mut criteria = Map::new();
    criteria.insert("where".to_string(), json!(request.predicate));
    criteria.insert("limit".to_string(), json!(2));

    let resource = Resource::table(&request.source_table);
    let mut matches = fetch_records(store, &resource, &criteria).await?;
    if matches.len() != 1 {
        return Err(Error::AmbiguousSource {
            table: request.source_table.clone(),
            predicate: request.predicate.clone(),
            matches: matches.len(),
        });
    }
    Ok(matches.remove(0))
}

fn validate_overrides(fields: &[FieldDefinition], table: &str, overrides: &Record) -> Result<()> {
    for name in overrides.keys() {
        let writable = fields.iter().any(|field| &field.name == name && field.editable);
        if !writable {
            return Err(Error::InvalidField {
                field: name.clone(),
                table: table.to_string(),
            });
        }
    }
    Ok(())
}

/// Values of a list field as read from a row (`{"<index>": value}`) or as
/// supplied by a caller (an array, or a single value).
fn list_values(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(Option<u32>, &Value)> = map
                .iter()
                .map(|(key, item)| (key.trim().parse::<u32>().ok(), item))
                .collect();
            entries.sort_by_key(|(index, _)| index.unwrap_or(u32::MAX));
            entries.into_iter().map(|(_, item)| item.clone()).collect()
        }
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        scalar => vec![scalar.clone()],
    }
}
