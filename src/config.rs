//! Start-up configuration. The connection string is the one setting the
//! portal really needs; everything else has a sensible default under the
//! application base directory.

use std::path::{Path, PathBuf};

use clap::Parser;
use directories::BaseDirs;
use thiserror::Error;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".edu-portal";
/// Log file written inside the base directory unless overridden.
const LOG_FILE_NAME: &str = "edu-portal.log";
/// Used when no connection string is configured: an embedded database next to
/// the materials folder.
pub const DEFAULT_CONNECTION: &str = "Data Source=portal.sqlite";
/// Placeholder shipped in sample configuration files.
const PLACEHOLDER_PASSWORD: &str = "your_password";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate home directory")]
    NoHomeDirectory,
    #[error("invalid PostgreSQL connection string: {0}")]
    InvalidPostgres(#[source] postgres::Error),
    #[error("invalid port `{0}` in connection string")]
    InvalidPort(String),
    #[error("unsupported connection string key `{0}`")]
    UnknownKey(String),
}

/// Command line and environment settings.
#[derive(Debug, Parser)]
#[command(
    name = "edu-portal",
    version,
    about = "Administer teachers, courses, students and course materials"
)]
pub struct Cli {
    /// Connection string: a PostgreSQL URL, `Host=...;Database=...` pairs, or
    /// a SQLite file (`Data Source=portal.sqlite`).
    #[arg(long, env = "EDU_PORTAL_DATABASE")]
    pub database: Option<String>,

    /// Base directory holding the Materials folder, the default database and
    /// the log file.
    #[arg(long, env = "EDU_PORTAL_HOME")]
    pub data_dir: Option<PathBuf>,

    /// Where to write logs.
    #[arg(long, env = "EDU_PORTAL_LOG")]
    pub log_file: Option<PathBuf>,
}

/// Which backend to talk to and how to reach it.
#[derive(Debug, Clone)]
pub enum ConnectionTarget {
    Sqlite(PathBuf),
    Postgres(postgres::Config),
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
    pub target: ConnectionTarget,
    /// The configured password is still the sample placeholder.
    pub placeholder_password: bool,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let data_dir = match cli.data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        let log_file = cli
            .log_file
            .unwrap_or_else(|| data_dir.join(LOG_FILE_NAME));
        let raw = cli
            .database
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONNECTION.to_string());
        let target = parse_connection_string(&raw, &data_dir)?;

        Ok(Self {
            placeholder_password: raw.contains(PLACEHOLDER_PASSWORD),
            data_dir,
            log_file,
            target,
        })
    }
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

/// Work out the backend from a connection string.
///
/// Accepted forms:
/// * `postgres://` / `postgresql://` URLs and libpq `key=value` strings;
/// * `Host=...;Port=...;Database=...;Username=...;Password=...` pairs;
/// * `Data Source=<file>`, `sqlite:<file>` or a bare file path for SQLite.
///
/// Relative SQLite paths resolve against `data_dir`.
pub fn parse_connection_string(
    raw: &str,
    data_dir: &Path,
) -> Result<ConnectionTarget, ConfigError> {
    let raw = raw.trim();
    let lower = raw.to_ascii_lowercase();

    if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
        return raw
            .parse::<postgres::Config>()
            .map(ConnectionTarget::Postgres)
            .map_err(ConfigError::InvalidPostgres);
    }

    if let Some(path) = lower.strip_prefix("sqlite:") {
        let path = &raw[raw.len() - path.len()..];
        return Ok(ConnectionTarget::Sqlite(resolve_path(
            path.trim_start_matches("//"),
            data_dir,
        )));
    }

    if raw.contains(';') || lower.starts_with("data source=") {
        return parse_key_value_pairs(raw, data_dir);
    }

    if raw.contains('=') {
        // libpq style: `host=localhost dbname=portal user=admin`
        return raw
            .parse::<postgres::Config>()
            .map(ConnectionTarget::Postgres)
            .map_err(ConfigError::InvalidPostgres);
    }

    Ok(ConnectionTarget::Sqlite(resolve_path(raw, data_dir)))
}

fn parse_key_value_pairs(raw: &str, data_dir: &Path) -> Result<ConnectionTarget, ConfigError> {
    let mut config = postgres::Config::new();

    for pair in raw.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "data source" | "datasource" | "filename" => {
                return Ok(ConnectionTarget::Sqlite(resolve_path(value, data_dir)));
            }
            "host" | "server" => {
                config.host(value);
            }
            "port" => {
                let port = value
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(value.to_string()))?;
                config.port(port);
            }
            "database" | "initial catalog" => {
                config.dbname(value);
            }
            "username" | "user id" | "userid" | "user" => {
                config.user(value);
            }
            "password" => {
                config.password(value);
            }
            "application name" => {
                config.application_name(value);
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
    }

    Ok(ConnectionTarget::Postgres(config))
}

fn resolve_path(value: &str, data_dir: &Path) -> PathBuf {
    let path = Path::new(value.trim());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}
