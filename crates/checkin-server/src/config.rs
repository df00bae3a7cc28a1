use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

/// Secret used when `SECRET_KEY` is not set. Fine for local runs only.
pub const DEFAULT_SECRET_KEY: &str = "dev-change-me";

/// Database file name inside the data directory.
pub const DB_FILE: &str = "checkin.db";

#[derive(Debug, Parser)]
#[command(name = "checkin-server", version, about = "Weekly check-in web service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0", global = true)]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080, global = true)]
    pub port: u16,

    /// Directory holding the SQLite database.
    #[arg(long, env = "DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// Key used to sign session cookies.
    #[arg(long, env = "SECRET_KEY", default_value = DEFAULT_SECRET_KEY, hide_env_values = true, global = true)]
    pub secret_key: String,

    /// Slug of the user allowed to manage questions.
    #[arg(long, env = "ADMIN_SLUG", default_value = "mina", global = true)]
    pub admin_slug: String,

    /// Session lifetime in hours.
    #[arg(long, default_value_t = 336, global = true)]
    pub session_ttl_hours: u64,

    /// Expired-session cleanup interval in seconds.
    #[arg(long, default_value_t = 3600, global = true)]
    pub gc_interval_seconds: u64,

    /// Log level (env-filter syntax).
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Drop all data, recreate the schema and insert the default users and questions.
    InitDb,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    pub fn to_config(&self) -> ServerConfig {
        ServerConfig {
            listen: SocketAddr::new(self.host, self.port),
            data_dir: self.data_dir.clone(),
            secret_key: self.secret_key.clone(),
            admin_slug: self.admin_slug.clone(),
            session_ttl: Duration::from_secs(self.session_ttl_hours.saturating_mul(60 * 60)),
            gc_interval: Duration::from_secs(self.gc_interval_seconds.max(1)),
        }
    }
}

#[derive(Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub data_dir: PathBuf,
    pub secret_key: String,
    pub admin_slug: String,
    pub session_ttl: Duration,
    pub gc_interval: Duration,
}

impl ServerConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    pub fn session_ttl_ms(&self) -> i64 {
        i64::try_from(self.session_ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen", &self.listen)
            .field("data_dir", &self.data_dir)
            .field("secret_key", &"<redacted>")
            .field("admin_slug", &self.admin_slug)
            .field("session_ttl", &self.session_ttl)
            .field("gc_interval", &self.gc_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_config() {
        let cli = Cli::try_parse_from([
            "checkin-server",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--data-dir",
            "/tmp/checkin",
            "--secret-key",
            "s3cret",
            "init-db",
        ])
        .unwrap();
        assert_eq!(cli.command(), Command::InitDb);

        let config = cli.to_config();
        assert_eq!(config.listen, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.db_path(), PathBuf::from("/tmp/checkin/checkin.db"));
        assert!(!config.uses_default_secret());
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["checkin-server", "--secret-key", "x"]).unwrap();
        assert_eq!(cli.command(), Command::Serve);
    }

    #[test]
    fn huge_session_ttl_saturates() {
        let hours = u64::MAX.to_string();
        let cli = Cli::try_parse_from(["checkin-server", "--session-ttl-hours", hours.as_str()]).unwrap();
        let config = cli.to_config();
        assert_eq!(config.session_ttl, Duration::from_secs(u64::MAX));
        assert_eq!(config.session_ttl_ms(), i64::MAX);
    }
}
