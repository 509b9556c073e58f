use anyhow::Result;
use clap::Args;
use dialoguer::Confirm;
use rowport::{copy_record, CopyRequest};
use serde_json::Value;

use crate::args::BaseArgs;
use crate::connect::connect;
use crate::ui::{is_interactive, print_command_status, with_spinner, CommandStatus};

#[derive(Debug, Clone, Args)]
pub struct CopyArgs {
    /// Table holding the source record
    table: String,

    /// Predicate matching exactly one source record (q.where)
    #[arg(long = "where", value_name = "PREDICATE")]
    predicate: String,

    /// Table to create the copy in (defaults to the source table)
    #[arg(long, value_name = "TABLE")]
    to: Option<String>,

    /// Override a field; VALUE is parsed as JSON when possible, so list fields take `["a","b"]`
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, Value)>,

    /// Skip confirmation
    #[arg(short = 'f', long)]
    force: bool,
}

impl CopyArgs {
    fn request(&self) -> CopyRequest {
        let mut request = CopyRequest::new(&self.table, &self.predicate);
        if let Some(target) = &self.to {
            request = request.into_table(target);
        }
        for (field, value) in &self.set {
            request = request.with_override(field, value.clone());
        }
        request
    }
}

pub async fn run(base: &BaseArgs, args: CopyArgs) -> Result<()> {
    let request = args.request();
    let client = connect(base)?;

    if !args.force && is_interactive() {
        let confirm = Confirm::new()
            .with_prompt(format!(
                "Copy the '{}' record matching `{}` into '{}'?",
                request.source_table,
                request.predicate,
                request.target()
            ))
            .default(false)
            .interact()?;

        if !confirm {
            return Ok(());
        }
    }

    match with_spinner("Copying record...", copy_record(&client, &request)).await {
        Ok(outcome) => {
            if base.json {
                let row = outcome.created.unwrap_or(outcome.submitted);
                println!("{}", serde_json::to_string(&row)?);
            } else {
                print_command_status(
                    CommandStatus::Success,
                    &format!("Copied record into '{}'", request.target()),
                );
            }
            Ok(())
        }
        Err(e) => {
            print_command_status(
                CommandStatus::Error,
                &format!("Failed to copy record from '{}'", request.source_table),
            );
            Err(e.into())
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{raw}'"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    let value = serde_json::from_str::<Value>(value)
        .unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn assignments_parse_json_or_fall_back_to_text() {
        assert_eq!(parse_assignment("Name=Rex"), Ok(("Name".to_string(), json!("Rex"))));
        assert_eq!(parse_assignment("Age=4"), Ok(("Age".to_string(), json!(4))));
        assert_eq!(
            parse_assignment(r#"Friends=["Cat","Frog"]"#),
            Ok(("Friends".to_string(), json!(["Cat", "Frog"])))
        );
        assert_eq!(
            parse_assignment("Note=a=b"),
            Ok(("Note".to_string(), json!("a=b")))
        );
        assert!(parse_assignment("Name").is_err());
        assert!(parse_assignment("=Rex").is_err());
    }

    #[test]
    fn request_carries_target_and_overrides() {
        let args = CopyArgs {
            table: "Pets".to_string(),
            predicate: "ID=4".to_string(),
            to: Some("Archive".to_string()),
            set: vec![("Name".to_string(), json!("Rex II"))],
            force: true,
        };
        let request = args.request();
        assert_eq!(request.target(), "Archive");
        assert_eq!(request.overrides.get("Name"), Some(&json!("Rex II")));
    }
}
