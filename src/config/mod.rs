use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub app_mode: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub queue_endpoint: String,
    pub queue_region: String,
    pub queue_name: String,
    pub admin_token: Option<String>,
    pub resend_api_key: String,
    pub resend_api_url: String,
    pub mail_from: String,
    pub mail_timeout_seconds: u64,
    pub notify_send_concurrency: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;
        let app_mode = env_or("APP_MODE", "api");

        let notify_send_concurrency: usize = env_or_parse("NOTIFY_SEND_CONCURRENCY", "1")?;
        if notify_send_concurrency == 0 {
            return Err(anyhow!("invalid NOTIFY_SEND_CONCURRENCY: must be at least 1"));
        }

        Ok(Self {
            http_addr,
            app_mode,
            database_url: env_or_err("DATABASE_URL")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            queue_endpoint: env_or_err("QUEUE_ENDPOINT")?,
            queue_region: env_or("QUEUE_REGION", "fr-par"),
            queue_name: env_or_err("QUEUE_NAME")?,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            resend_api_key: env_or_err("RESEND_API_KEY")?,
            resend_api_url: env_or("RESEND_API_URL", "https://api.resend.com"),
            mail_from: env_or("MAIL_FROM", "Incident Snapper <notifications@reppans.xyz>"),
            mail_timeout_seconds: env_or_parse("MAIL_TIMEOUT_SECONDS", "10")?,
            notify_send_concurrency,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
