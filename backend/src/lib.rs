pub mod auth;
pub mod axum_http;
pub mod background;
pub mod config;
pub mod usecases;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use lms_core::{
    infra::db::{postgres::postgres_connection, repositories::users::UserPostgres},
    notifications::resend::{ResendMailer, ResendSettings},
    payments::stripe_client::{StripeClient, StripeSettings},
};
use tracing::{error, info, warn};

use crate::config::config_model::DotEnvyConfig;

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    lms_core::observability::init_observability("backend")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = Arc::new(postgres_connection::establish_connection(
        &dotenvy_env.database.url,
    )?);
    info!("Postgres connection has been established");

    let stripe_client = Arc::new(StripeClient::new(stripe_settings(&dotenvy_env))?);
    let mailer = build_mailer(&dotenvy_env)?;

    let user_repository = Arc::new(UserPostgres::new(Arc::clone(&postgres_pool)));
    let maintenance = dotenvy_env.maintenance;
    let deactivation = tokio::spawn(async move {
        if let Err(err) = background::user_deactivation::run(user_repository, maintenance).await {
            error!(error = ?err, "user_deactivation: loop exited");
        }
    });

    let served =
        axum_http::http_serve::start(dotenvy_env, postgres_pool, stripe_client, mailer).await;
    deactivation.abort();

    served
}

fn stripe_settings(config: &DotEnvyConfig) -> StripeSettings {
    StripeSettings {
        secret_key: config.stripe.secret_key.clone(),
        webhook_secret: config.stripe.webhook_secret.clone(),
        success_url: config.stripe.success_url.clone(),
        cancel_url: config.stripe.cancel_url.clone(),
        currency: config.stripe.currency.clone(),
        timeout: Duration::from_secs(config.stripe.timeout_secs),
    }
}

fn build_mailer(config: &DotEnvyConfig) -> Result<Option<Arc<ResendMailer>>> {
    let Some(api_key) = config.email.resend_api_key.clone() else {
        warn!("RESEND_API_KEY is not set, course update emails are disabled");
        return Ok(None);
    };

    let mailer = ResendMailer::new(ResendSettings {
        api_key,
        from: config.email.from.clone(),
        timeout: Duration::from_secs(10),
    })?;

    Ok(Some(Arc::new(mailer)))
}
