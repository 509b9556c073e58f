use anyhow::Result;
use clap::Args;
use rowport::{build_query, fetch_all, QueryMode};

use crate::args::BaseArgs;
use crate::connect::connect;
use crate::ui::with_spinner;

use super::{FilterArgs, ResourceArgs};

#[derive(Debug, Clone, Args)]
pub struct DumpArgs {
    #[command(flatten)]
    resource: ResourceArgs,

    #[command(flatten)]
    filter: FilterArgs,
}

/// Collects the whole result set in memory; use `export` for large tables.
pub async fn run(base: &BaseArgs, args: DumpArgs) -> Result<()> {
    let criteria = args.filter.to_map();
    build_query(&criteria, QueryMode::Bulk { page_number: 1 })?;

    let resource = args.resource.resource();
    let client = connect(base)?;
    let records = with_spinner(
        "Fetching all records...",
        fetch_all(&client, &resource, &criteria),
    )
    .await?;

    if base.json {
        println!("{}", serde_json::to_string(&records)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }
    Ok(())
}
