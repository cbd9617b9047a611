use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Extension, Router, ServiceExt,
    extract::Request,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use lms_core::{
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
    notifications::resend::ResendMailer,
    payments::stripe_client::StripeClient,
};
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    normalize_path::NormalizePathLayer,
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::{
    auth::UserDirectory,
    axum_http::{default_routers, routers},
    config::{config_loader, config_model::DotEnvyConfig},
};

pub fn app(
    config: &DotEnvyConfig,
    db_pool: Arc<PgPoolSquad>,
    stripe_client: Arc<StripeClient>,
    mailer: Option<Arc<ResendMailer>>,
) -> Result<Router> {
    let user_secret = config_loader::get_user_secret()?;
    let user_directory = UserDirectory(Arc::new(UserPostgres::new(Arc::clone(&db_pool))));

    let api = Router::new()
        .nest(
            "/courses",
            routers::courses::routes(Arc::clone(&db_pool), mailer),
        )
        .nest("/lessons", routers::lessons::routes(Arc::clone(&db_pool)))
        .nest(
            "/subscriptions",
            routers::subscriptions::routes(Arc::clone(&db_pool)),
        )
        .nest(
            "/payments",
            routers::payments::routes(Arc::clone(&db_pool), stripe_client),
        )
        .nest("/users", routers::users::routes(Arc::clone(&db_pool)))
        .nest(
            "/token",
            routers::tokens::routes(Arc::clone(&db_pool), user_secret, config.token_ttl),
        )
        .route("/health-check", get(default_routers::health_check));

    let app = Router::new()
        .nest("/api", api)
        .nest_service("/media", ServeDir::new(&config.media.root))
        .fallback(default_routers::not_found)
        .layer(Extension(user_directory))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

pub async fn start(
    config: Arc<DotEnvyConfig>,
    db_pool: Arc<PgPoolSquad>,
    stripe_client: Arc<StripeClient>,
    mailer: Option<Arc<ResendMailer>>,
) -> Result<()> {
    let app = app(&config, db_pool, stripe_client, mailer)?;
    // `/api/courses/` and `/api/courses` hit the same route.
    let app = NormalizePathLayer::trim_trailing_slash().layer(app);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
