use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct BaseArgs {
    /// Output as JSON
    #[arg(short = 'j', long, global = true)]
    pub json: bool,

    /// Log requests and page progress to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// REST base URL of the account, e.g. https://acct.example.com/rest/v2 (or via ROWPORT_BASE_URL)
    #[arg(
        long,
        env = "ROWPORT_BASE_URL",
        hide_env_values = true,
        global = true
    )]
    pub base_url: Option<String>,

    /// Bearer token for the REST API (or via ROWPORT_TOKEN)
    #[arg(long, env = "ROWPORT_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Path to a .env file to load before running commands.
    #[arg(long, env = "ROWPORT_ENV_FILE", hide_env_values = true)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct CLIArgs<T: Args> {
    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub args: T,
}
