use std::fmt::Write as _;

use anyhow::Result;
use clap::Args;
use dialoguer::console;
use rowport::{build_query, fetch_records, QueryMode, Record};
use serde_json::Value;

use crate::args::BaseArgs;
use crate::connect::connect;
use crate::ui::{apply_column_padding, header, styled_table, truncate, with_spinner};
use crate::utils::pluralize;

use super::{FilterArgs, ResourceArgs};

const MAX_CELL_CHARS: usize = 40;

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[command(flatten)]
    resource: ResourceArgs,

    #[command(flatten)]
    filter: FilterArgs,

    /// Maximum rows to return, 1-1000 (defaults to 100)
    #[arg(long)]
    limit: Option<u64>,

    /// Page to return, starting at 1 (replaces --limit)
    #[arg(long)]
    page_number: Option<u64>,

    /// Rows per page, 5-1000 (replaces --limit)
    #[arg(long)]
    page_size: Option<u64>,
}

pub async fn run(base: &BaseArgs, args: ListArgs) -> Result<()> {
    let mut criteria = args.filter.criteria();
    criteria.limit = args.limit;
    criteria.page_number = args.page_number;
    criteria.page_size = args.page_size;
    let criteria = criteria.to_map();
    build_query(&criteria, QueryMode::Paginated)?;

    let resource = args.resource.resource();
    let client = connect(base)?;
    let records = with_spinner(
        "Loading records...",
        fetch_records(&client, &resource, &criteria),
    )
    .await?;

    if base.json {
        println!("{}", serde_json::to_string(&records)?);
        return Ok(());
    }

    let mut output = String::new();
    let count = format!(
        "{} {}",
        records.len(),
        pluralize(records.len(), "record")
    );
    writeln!(output, "{} found in {resource}\n", console::style(count).bold())?;
    if !records.is_empty() {
        write!(output, "{}", render_records(&records))?;
    }
    println!("{output}");
    Ok(())
}

fn render_records(records: &[Record]) -> comfy_table::Table {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for name in record.keys() {
            if !columns.contains(&name.as_str()) {
                columns.push(name);
            }
        }
    }

    let mut table = styled_table();
    table.set_header(columns.iter().map(|name| header(name)).collect::<Vec<_>>());
    apply_column_padding(&mut table, (0, 3));
    for record in records {
        table.add_row(
            columns
                .iter()
                .map(|name| truncate(&display_value(record.get(*name)), MAX_CELL_CHARS))
                .collect::<Vec<_>>(),
        );
    }
    table
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(list)) => list
            .values()
            .map(|item| display_value(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| display_value(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}
