//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{AccountStatus, Database, NewAccount, Role};
use crate::jwt;
use crate::password;
use clap::Parser;
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Staffgate",
    about = "Authentication and session service for the staffing admin backend"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7310")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "staffgate.db")]
    pub database: String,

    /// Public origin this service is reached at (e.g., "https://auth.example.com").
    /// Cookies are marked Secure when the scheme is https
    #[arg(long, default_value = "http://localhost:7310")]
    pub public_origin: String,

    /// Frontend origin allowed by CORS with credentials. Omit to disable CORS
    #[arg(long)]
    pub cors_origin: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = jwt::DEFAULT_ACCESS_TTL_SECS)]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, default_value_t = jwt::DEFAULT_REFRESH_TTL_SECS)]
    pub refresh_ttl_secs: u64,

    /// Do not rotate the refresh credential on refresh (rotation is the default)
    #[arg(long)]
    pub no_rotate_refresh: bool,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Create a superadmin account with this email on startup and print a
    /// generated one-time password
    #[arg(long, value_name = "EMAIL")]
    pub create_superadmin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Parse and validate the public-origin URL.
/// Returns None and logs an error if validation fails.
pub fn validate_public_origin(public_origin: &str) -> Option<Url> {
    let url = match Url::parse(public_origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %public_origin, error = %e, "Invalid public-origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost");

    if !is_https && !is_localhost {
        error!("public-origin must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Parse the CORS origin, if configured.
pub fn validate_cors_origin(cors_origin: Option<&str>) -> Result<Option<Url>, ()> {
    match cors_origin {
        None => Ok(None),
        Some(origin) => match Url::parse(origin) {
            Ok(url) => Ok(Some(url)),
            Err(e) => {
                error!(origin = %origin, error = %e, "Invalid cors-origin URL");
                Err(())
            }
        },
    }
}

/// Handle the --create-superadmin flag: create the account and print a
/// generated one-time password, or report that the email is taken.
pub async fn handle_create_superadmin(db: &Database, email: &str) {
    match db.users().find_by_email(email).await {
        Ok(Some(_)) => {
            println!();
            println!("Account already exists: {}", email);
            println!();
        }
        Ok(None) => {
            let one_time_password = Uuid::new_v4().simple().to_string();
            let hash = match password::hash_password(&one_time_password) {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash generated password");
                    std::process::exit(1);
                }
            };
            let now = match jwt::now_secs() {
                Ok(now) => now as i64,
                Err(e) => {
                    error!(error = %e, "Clock error");
                    std::process::exit(1);
                }
            };

            let account = NewAccount {
                email,
                password_hash: &hash,
                role: Role::Superadmin,
                client_id: None,
                status: AccountStatus::Active,
            };
            match db.users().create(&account, now).await {
                Ok(_) => {
                    println!();
                    println!("Superadmin created: {}", email);
                    println!("One-time password: {}", one_time_password);
                    println!("Change it after the first login.");
                    println!();
                }
                Err(e) => {
                    error!(error = %e, "Failed to create superadmin");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing account");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    public_origin: Url,
    cors_origin: Option<Url>,
    jwt_secret: String,
) -> ServerConfig {
    let secure_cookies = public_origin.scheme() == "https";

    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_ttl_secs: args.access_ttl_secs,
        refresh_ttl_secs: args.refresh_ttl_secs,
        rotate_refresh: !args.no_rotate_refresh,
        secure_cookies,
        cors_origin,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
