use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use lms_core::{
    domain::{
        repositories::{courses::CourseRepository, subscriptions::SubscriptionRepository},
        value_objects::subscriptions::ToggleSubscriptionModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{courses::CoursePostgres, subscriptions::SubscriptionPostgres},
    },
};

use crate::{
    auth::AuthUser,
    axum_http::extractors::JsonBody,
    usecases::{errors::UseCaseError, subscriptions::SubscriptionUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let course_repository = CoursePostgres::new(Arc::clone(&db_pool));
    let usecase = SubscriptionUseCase::new(
        Arc::new(subscription_repository),
        Arc::new(course_repository),
    );

    router(Arc::new(usecase))
}

pub fn router<S, C>(usecase: Arc<SubscriptionUseCase<S, C>>) -> Router
where
    S: SubscriptionRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", post(toggle::<S, C>))
        .with_state(usecase)
}

pub async fn toggle<S, C>(
    State(usecase): State<Arc<SubscriptionUseCase<S, C>>>,
    auth: AuthUser,
    JsonBody(model): JsonBody<ToggleSubscriptionModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    Ok(Json(usecase.toggle(auth.actor(), model).await?))
}
