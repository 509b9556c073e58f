use anyhow::Result;
use clap::{Args, Subcommand};
use rowport::{Criteria, Resource};
use serde_json::{Map, Value};

use crate::args::BaseArgs;

mod copy;
mod dump;
mod export;
mod list;

#[derive(Debug, Clone, Args)]
pub struct RecordsArgs {
    #[command(subcommand)]
    command: RecordsCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum RecordsCommand {
    /// Fetch a single page of records
    List(list::ListArgs),
    /// Fetch every matching record and print it as one JSON array
    Dump(dump::DumpArgs),
    /// Stream every matching record into a JSON file
    Export(export::ExportArgs),
    /// Re-create one record, optionally in another table
    Copy(copy::CopyArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct ResourceArgs {
    /// Table name (or view name with --view)
    name: String,

    /// Read from a view instead of a table
    #[arg(long)]
    view: bool,
}

impl ResourceArgs {
    pub(crate) fn resource(&self) -> Resource {
        if self.view {
            Resource::view(&self.name)
        } else {
            Resource::table(&self.name)
        }
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct FilterArgs {
    /// Columns to return (q.select)
    #[arg(long)]
    select: Option<String>,

    /// Row predicate (q.where)
    #[arg(long = "where", value_name = "PREDICATE")]
    predicate: Option<String>,

    /// Grouping expression (q.groupBy)
    #[arg(long)]
    group_by: Option<String>,

    /// Sort expression (q.orderBy); keep it stable when paging large tables
    #[arg(long)]
    order_by: Option<String>,
}

impl FilterArgs {
    pub(crate) fn criteria(&self) -> Criteria {
        Criteria {
            select: self.select.clone(),
            r#where: self.predicate.clone(),
            group_by: self.group_by.clone(),
            order_by: self.order_by.clone(),
            ..Criteria::default()
        }
    }

    pub(crate) fn to_map(&self) -> Map<String, Value> {
        self.criteria().to_map()
    }
}

pub async fn run(base: BaseArgs, args: RecordsArgs) -> Result<()> {
    match args.command {
        RecordsCommand::List(list) => list::run(&base, list).await,
        RecordsCommand::Dump(dump) => dump::run(&base, dump).await,
        RecordsCommand::Export(export) => export::run(&base, export).await,
        RecordsCommand::Copy(copy) => copy::run(&base, copy).await,
    }
}
