use std::{env, str::FromStr};

use anyhow::{Context, Result};

use super::config_model::{
    BackendServer, Database, DotEnvyConfig, Email, Maintenance, Media, Stripe, TokenTtl,
    UserSecret,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required_parsed("SERVER_PORT_BACKEND")?,
        body_limit: required_parsed("SERVER_BODY_LIMIT")?,
        timeout: required_parsed("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let stripe = Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
        success_url: required("STRIPE_SUCCESS_URL")?,
        cancel_url: required("STRIPE_CANCEL_URL")?,
        currency: optional("STRIPE_CURRENCY").unwrap_or_else(|| "usd".to_string()),
        timeout_secs: optional_parsed("STRIPE_TIMEOUT_SECS")?.unwrap_or(10),
    };

    let email = Email {
        resend_api_key: optional("RESEND_API_KEY"),
        from: optional("EMAIL_FROM").unwrap_or_else(|| "noreply@example.com".to_string()),
    };

    let media = Media {
        root: optional("MEDIA_ROOT").unwrap_or_else(|| "media".to_string()),
    };

    let maintenance = Maintenance {
        inactive_user_days: optional_parsed("INACTIVE_USER_DAYS")?.unwrap_or(30),
        sweep_interval_secs: optional_parsed("INACTIVE_USER_SWEEP_SECS")?.unwrap_or(86_400),
    };

    // Secrets are read per request by the extractor; fail fast if absent.
    get_user_secret()?;

    Ok(DotEnvyConfig {
        backend_server,
        database,
        token_ttl: get_token_ttl()?,
        stripe,
        email,
        media,
        maintenance,
    })
}

pub fn get_user_secret() -> Result<UserSecret> {
    dotenvy::dotenv().ok();

    Ok(UserSecret {
        secret: required("JWT_USER_SECRET")?,
        refresh_secret: required("JWT_USER_REFRESH_SECRET")?,
    })
}

pub fn get_token_ttl() -> Result<TokenTtl> {
    let defaults = TokenTtl::default();

    Ok(TokenTtl {
        access_seconds: optional_parsed("JWT_ACCESS_TTL_SECONDS")?
            .unwrap_or(defaults.access_seconds),
        refresh_seconds: optional_parsed("JWT_REFRESH_TTL_SECONDS")?
            .unwrap_or(defaults.refresh_seconds),
    })
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} is invalid"))
}

fn required_parsed<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(key)?
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn optional_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    optional(key)
        .map(|value| value.parse().with_context(|| format!("{key} is invalid")))
        .transpose()
}
