use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const ENV_FILE_VAR: &str = "ROWPORT_ENV_FILE";
const ENVIRONMENT_VAR: &str = "ROWPORT_ENV";

/// Load `.env` files before clap reads `env = ...` defaults.
pub fn bootstrap_from_args(args: &[OsString]) -> Result<()> {
    let explicit_env_file =
        extract_env_file_arg(args).or_else(|| std::env::var_os(ENV_FILE_VAR).map(PathBuf::from));
    load_env(explicit_env_file.as_ref())
}

pub fn load_env(explicit_env_file: Option<&PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let environment = std::env::var(ENVIRONMENT_VAR).ok();
    let env_files = resolve_env_files(&cwd, explicit_env_file, environment.as_deref());
    let mut loaded = HashMap::new();

    for env_file in env_files {
        if !env_file.exists() && explicit_env_file.is_none() {
            continue;
        }

        let parsed = dotenvy::from_path_iter(&env_file)
            .with_context(|| format!("failed to read env file {}", env_file.display()))?;
        for item in parsed {
            let (key, value) =
                item.with_context(|| format!("failed to parse env file {}", env_file.display()))?;
            // Real environment variables win over anything in a file.
            if std::env::var_os(&key).is_some() {
                continue;
            }
            loaded.insert(key, value);
        }
    }

    let mut envs: Vec<(String, String)> = loaded.into_iter().collect();
    envs.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in envs {
        std::env::set_var(key, value);
    }
    Ok(())
}

fn extract_env_file_arg(args: &[OsString]) -> Option<PathBuf> {
    let mut explicit = None;
    let mut idx = 1usize;
    while idx < args.len() {
        let Some(arg) = args[idx].to_str() else {
            idx += 1;
            continue;
        };

        if arg == "--" {
            break;
        }

        if arg == "--env-file" {
            if let Some(next) = args.get(idx + 1) {
                explicit = Some(PathBuf::from(next));
            }
            idx += 2;
            continue;
        }

        if let Some(value) = arg.strip_prefix("--env-file=") {
            explicit = Some(PathBuf::from(value));
        }

        idx += 1;
    }
    explicit
}

/// Files in increasing precedence; later files override earlier ones.
fn resolve_env_files(
    cwd: &Path,
    explicit_env_file: Option<&PathBuf>,
    environment: Option<&str>,
) -> Vec<PathBuf> {
    if let Some(path) = explicit_env_file {
        let full_path = if path.is_absolute() {
            path.clone()
        } else {
            cwd.join(path)
        };
        return vec![full_path];
    }

    let mut files = vec![cwd.join(".env")];
    if let Some(environment) = environment.map(str::trim).filter(|s| !s.is_empty()) {
        files.push(cwd.join(format!(".env.{environment}")));
    }
    files.push(cwd.join(".env.local"));
    files
}
