use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub dev_mode: bool,
    /// Fresh values tried per issuance before a collision becomes an error
    pub key_generation_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("KEYSMITH_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let key_generation_attempts: u32 = env::var("KEY_GENERATION_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(5);

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "keysmith.db".to_string()),
            dev_mode,
            key_generation_attempts,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.dev_mode {
            "keysmith=debug,tower_http=debug"
        } else {
            "keysmith=info,tower_http=info"
        }
    }
}
