//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use portal_auth::AuthConfig;
use portal_db::DbConfig;
use portal_files::FileStoreConfig;

const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Parser)]
#[command(name = "portal-server", version, about = "Employee portal backend")]
pub struct Cli {
    #[command(flatten)]
    pub config: ServerConfig,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Create the demo accounts, jobs and assets before serving.
        #[arg(long)]
        seed: bool,
    },
    /// Create the demo accounts, jobs and assets, then exit.
    Seed,
}

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    #[arg(long, env = "PORTAL_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// SurrealDB endpoint: `mem://` or `ws://host:port`.
    #[arg(long, env = "PORTAL_DATABASE_URL", default_value = "mem://")]
    pub database_url: String,

    #[arg(long, env = "PORTAL_DATABASE_NAMESPACE", default_value = "portal")]
    pub database_namespace: String,

    #[arg(long, env = "PORTAL_DATABASE_NAME", default_value = "main")]
    pub database_name: String,

    #[arg(long, env = "PORTAL_DATABASE_USER")]
    pub database_user: Option<String>,

    #[arg(long, env = "PORTAL_DATABASE_PASSWORD", hide_env_values = true)]
    pub database_password: Option<String>,

    /// HS256 signing secret for access tokens.
    #[arg(long, env = "PORTAL_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "PORTAL_TOKEN_LIFETIME_SECS", default_value_t = 86_400)]
    pub token_lifetime_secs: u64,

    #[arg(long, env = "PORTAL_PASSWORD_PEPPER", hide_env_values = true)]
    pub password_pepper: Option<String>,

    /// Directory that receives uploaded files.
    #[arg(long, env = "PORTAL_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    #[arg(long, env = "PORTAL_MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: u64,

    /// Allowed CORS origins, comma separated. Empty allows any origin.
    #[arg(long, env = "PORTAL_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.database_url.clone(),
            namespace: self.database_namespace.clone(),
            database: self.database_name.clone(),
            username: self.database_user.clone(),
            password: self.database_password.clone(),
        }
    }

    /// Auth settings. Serving requires a signing secret of reasonable
    /// length.
    pub fn auth_config(&self) -> anyhow::Result<AuthConfig> {
        let Some(secret) = self.jwt_secret.clone() else {
            bail!("PORTAL_JWT_SECRET (or --jwt-secret) must be set");
        };
        if secret.len() < MIN_JWT_SECRET_LEN {
            bail!("the JWT secret must be at least {MIN_JWT_SECRET_LEN} bytes");
        }
        Ok(AuthConfig {
            jwt_secret: secret,
            access_token_lifetime_secs: self.token_lifetime_secs,
            pepper: self.password_pepper.clone(),
            ..Default::default()
        })
    }

    pub fn file_store_config(&self) -> FileStoreConfig {
        FileStoreConfig {
            root: self.upload_dir.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("portal-server").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_run_in_memory() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config.db_config().url, "mem://");
        assert_eq!(cli.config.file_store_config().max_upload_bytes, 10 * 1024 * 1024);
        assert!(cli.config.cors_origins.is_empty());
    }

    #[test]
    fn serving_requires_a_long_secret() {
        assert!(parse(&[]).config.auth_config().is_err());
        assert!(parse(&["--jwt-secret", "short"]).config.auth_config().is_err());

        let secret = "s".repeat(MIN_JWT_SECRET_LEN);
        let auth = parse(&["--jwt-secret", &secret]).config.auth_config().unwrap();
        assert_eq!(auth.access_token_lifetime_secs, 86_400);
    }

    #[test]
    fn cors_origins_split_on_commas() {
        let cli = parse(&["--cors-origins", "http://a.test,http://b.test", "seed"]);
        assert_eq!(cli.config.cors_origins.len(), 2);
        assert!(matches!(cli.command, Some(Command::Seed)));
    }
}
