use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Shared-secret bearer token RevenueCat sends with every webhook call.
    pub revenuecat_webhook_token: String,
    /// HS256 secret for first-party app tokens.
    pub auth_token_secret: String,
    pub dev_mode: bool,
    /// Accept a bare X-User-Id header instead of a token (local dev only).
    pub allow_dev_user_header: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("MOMENTUM_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "momentum.db".to_string()),
            revenuecat_webhook_token: env::var("REVENUECAT_WEBHOOK_TOKEN").unwrap_or_default(),
            auth_token_secret: env::var("AUTH_TOKEN_SECRET").unwrap_or_default(),
            dev_mode,
            allow_dev_user_header: dev_mode
                && env::var("ALLOW_DEV_USER_HEADER")
                    .map(|v| v == "1")
                    .unwrap_or(false),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
