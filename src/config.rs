use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use log::{info, warn};

const DEFAULT_ADMIN_USERNAME: &str = "nuredin";
const DEFAULT_ADMIN_PASSWORD: &str = "nure1234";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub admin: AdminCredentials,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
}

/// The single admin login. Compared in plain text; not a security boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: DEFAULT_ADMIN_USERNAME.to_owned(),
            password: DEFAULT_ADMIN_PASSWORD.to_owned(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL should be set".to_owned())?;
        let port: u16 = try_load("PORT", 8080);

        Ok(Self {
            database_url,
            bind_addr: try_load("BIND_ADDR", "127.0.0.1".to_owned()),
            port,
            admin: AdminCredentials {
                username: try_load("ADMIN_USERNAME", DEFAULT_ADMIN_USERNAME.to_owned()),
                password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_owned()),
            },
            storage_root: PathBuf::from(try_load("STORAGE_ROOT", "./storage".to_owned())),
            public_base_url: try_load("PUBLIC_BASE_URL", format!("http://localhost:{port}")),
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
        })
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value ({e}), using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
