use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use lms_core::{
    domain::{
        repositories::{courses::CourseRepository, subscriptions::SubscriptionRepository},
        value_objects::courses::{CourseDto, CourseModel},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{courses::CoursePostgres, subscriptions::SubscriptionPostgres},
    },
    notifications::MailSender,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::extractors::{IdPath, JsonBody},
    usecases::{courses::CourseUseCase, errors::UseCaseError},
};

pub fn routes<M>(db_pool: Arc<PgPoolSquad>, mailer: Option<Arc<M>>) -> Router
where
    M: MailSender + Send + Sync + 'static,
{
    let course_repository = CoursePostgres::new(Arc::clone(&db_pool));
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let usecase = CourseUseCase::new(
        Arc::new(course_repository),
        Arc::new(subscription_repository),
        mailer,
    );

    router(Arc::new(usecase))
}

pub fn router<C, S, M>(usecase: Arc<CourseUseCase<C, S, M>>) -> Router
where
    C: CourseRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list::<C, S, M>).post(create::<C, S, M>))
        .route(
            "/:id",
            get(retrieve::<C, S, M>)
                .put(replace::<C, S, M>)
                .patch(partial_update::<C, S, M>)
                .delete(destroy::<C, S, M>),
        )
        .with_state(usecase)
}

pub async fn list<C, S, M>(
    State(usecase): State<Arc<CourseUseCase<C, S, M>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, UseCaseError>
where
    C: CourseRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    Ok(Json(usecase.list(auth.actor()).await?))
}

pub async fn create<C, S, M>(
    State(usecase): State<Arc<CourseUseCase<C, S, M>>>,
    auth: AuthUser,
    JsonBody(model): JsonBody<CourseModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    C: CourseRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    let course = usecase.create(auth.actor(), model).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn retrieve<C, S, M>(
    State(usecase): State<Arc<CourseUseCase<C, S, M>>>,
    auth: AuthUser,
    IdPath(course_id): IdPath,
) -> Result<impl IntoResponse, UseCaseError>
where
    C: CourseRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    Ok(Json(usecase.retrieve(auth.actor(), course_id).await?))
}

pub async fn replace<C, S, M>(
    State(usecase): State<Arc<CourseUseCase<C, S, M>>>,
    auth: AuthUser,
    IdPath(course_id): IdPath,
    JsonBody(model): JsonBody<CourseModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    C: CourseRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    update(usecase, auth, course_id, model, false).await
}

pub async fn partial_update<C, S, M>(
    State(usecase): State<Arc<CourseUseCase<C, S, M>>>,
    auth: AuthUser,
    IdPath(course_id): IdPath,
    JsonBody(model): JsonBody<CourseModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    C: CourseRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    update(usecase, auth, course_id, model, true).await
}

/// Subscribers are emailed in the background once the update is stored.
async fn update<C, S, M>(
    usecase: Arc<CourseUseCase<C, S, M>>,
    auth: AuthUser,
    course_id: Uuid,
    model: CourseModel,
    partial: bool,
) -> Result<Json<CourseDto>, UseCaseError>
where
    C: CourseRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    let course = usecase
        .update(auth.actor(), course_id, model, partial)
        .await?;

    let notifier = Arc::clone(&usecase);
    let updated = course.clone();
    tokio::spawn(async move {
        notifier.notify_subscribers(updated).await;
    });

    Ok(Json(course))
}

pub async fn destroy<C, S, M>(
    State(usecase): State<Arc<CourseUseCase<C, S, M>>>,
    auth: AuthUser,
    IdPath(course_id): IdPath,
) -> Result<impl IntoResponse, UseCaseError>
where
    C: CourseRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    usecase.delete(auth.actor(), course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
