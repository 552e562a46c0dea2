use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    /// Slip verification oracle. When unset, slip uploads park orders in
    /// pending_confirmation for manual review.
    pub slip2go_api_url: Option<String>,
    pub slip2go_api_key: Option<String>,
    /// Fire-and-forget order-event webhook. When unset, events are only logged.
    pub notify_webhook_url: Option<String>,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("SELLIO_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "sellio.db".to_string()),
            base_url,
            slip2go_api_url: env::var("SLIP2GO_API_URL").ok(),
            slip2go_api_key: env::var("SLIP2GO_API_KEY").ok(),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok(),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
