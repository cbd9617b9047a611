#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub token_ttl: TokenTtl,
    pub stripe: Stripe,
    pub email: Email,
    pub media: Media,
    pub maintenance: Maintenance,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB
    pub body_limit: u64,
    /// Seconds
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct UserSecret {
    pub secret: String,
    pub refresh_secret: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtl {
    pub access_seconds: i64,
    pub refresh_seconds: i64,
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access_seconds: 300,
            refresh_seconds: 86_400,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Email {
    /// Course-update emails are skipped when unset.
    pub resend_api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Media {
    pub root: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Maintenance {
    pub inactive_user_days: i64,
    pub sweep_interval_secs: u64,
}
