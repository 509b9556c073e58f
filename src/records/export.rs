use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use rowport::sink::create_file;
use rowport::{build_query, stream_all, QueryMode};

use crate::args::BaseArgs;
use crate::connect::connect;
use crate::ui::{print_command_status, with_spinner, CommandStatus};

use super::{FilterArgs, ResourceArgs};

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    resource: ResourceArgs,

    #[command(flatten)]
    filter: FilterArgs,

    /// Destination file, or `-` for stdout
    #[arg(short = 'o', long, default_value = "-")]
    output: PathBuf,
}

pub async fn run(base: &BaseArgs, args: ExportArgs) -> Result<()> {
    let criteria = args.filter.to_map();
    build_query(&criteria, QueryMode::Bulk { page_number: 1 })?;

    let resource = args.resource.resource();
    let client = connect(base)?;

    if args.output == Path::new("-") {
        stream_all(&client, &resource, &criteria, io::stdout().lock()).await?;
        return Ok(());
    }

    let file = create_file(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let result = with_spinner(
        &format!("Exporting {resource}..."),
        stream_all(&client, &resource, &criteria, file),
    )
    .await;

    match result {
        Ok(_) => {
            print_command_status(
                CommandStatus::Success,
                &format!("Exported {resource} to {}", args.output.display()),
            );
            Ok(())
        }
        Err(e) => {
            print_command_status(
                CommandStatus::Error,
                &format!(
                    "{} is incomplete; discard it before retrying",
                    args.output.display()
                ),
            );
            Err(e.into())
        }
    }
}
