use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use lms_core::{
    domain::{
        repositories::{
            courses::CourseRepository, lessons::LessonRepository, payments::PaymentRepository,
        },
        value_objects::payments::{CheckoutModel, ListPaymentsQuery, PaymentModel},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            courses::CoursePostgres, lessons::LessonPostgres, payments::PaymentPostgres,
        },
    },
    payments::stripe_client::StripeClient,
};
use serde_json::json;

use crate::{
    auth::AuthUser,
    axum_http::extractors::{IdPath, JsonBody, QueryParams},
    usecases::{
        errors::UseCaseError,
        payments::{PaymentUseCase, StripeGateway},
    },
};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Arc<StripeClient>) -> Router {
    let payment_repository = PaymentPostgres::new(Arc::clone(&db_pool));
    let course_repository = CoursePostgres::new(Arc::clone(&db_pool));
    let lesson_repository = LessonPostgres::new(Arc::clone(&db_pool));

    let usecase = PaymentUseCase::new(
        Arc::new(payment_repository),
        Arc::new(course_repository),
        Arc::new(lesson_repository),
        stripe_client,
    );

    router(Arc::new(usecase))
}

pub fn router<P, C, L, G>(usecase: Arc<PaymentUseCase<P, C, L, G>>) -> Router
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list::<P, C, L, G>).post(create::<P, C, L, G>))
        .route("/stripe", post(create_checkout::<P, C, L, G>))
        .route("/stripe/webhook", post(stripe_webhook::<P, C, L, G>))
        .route(
            "/:id",
            get(retrieve::<P, C, L, G>)
                .put(replace::<P, C, L, G>)
                .patch(partial_update::<P, C, L, G>)
                .delete(destroy::<P, C, L, G>),
        )
        .with_state(usecase)
}

pub async fn list<P, C, L, G>(
    State(usecase): State<Arc<PaymentUseCase<P, C, L, G>>>,
    auth: AuthUser,
    QueryParams(query): QueryParams<ListPaymentsQuery>,
) -> Result<impl IntoResponse, UseCaseError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    Ok(Json(usecase.list(auth.actor(), query).await?))
}

pub async fn create<P, C, L, G>(
    State(usecase): State<Arc<PaymentUseCase<P, C, L, G>>>,
    auth: AuthUser,
    JsonBody(model): JsonBody<PaymentModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    let payment = usecase.create(auth.actor(), model).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn retrieve<P, C, L, G>(
    State(usecase): State<Arc<PaymentUseCase<P, C, L, G>>>,
    auth: AuthUser,
    IdPath(payment_id): IdPath,
) -> Result<impl IntoResponse, UseCaseError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    Ok(Json(usecase.retrieve(auth.actor(), payment_id).await?))
}

pub async fn replace<P, C, L, G>(
    State(usecase): State<Arc<PaymentUseCase<P, C, L, G>>>,
    auth: AuthUser,
    IdPath(payment_id): IdPath,
    JsonBody(model): JsonBody<PaymentModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    Ok(Json(
        usecase
            .update(auth.actor(), payment_id, model, false)
            .await?,
    ))
}

pub async fn partial_update<P, C, L, G>(
    State(usecase): State<Arc<PaymentUseCase<P, C, L, G>>>,
    auth: AuthUser,
    IdPath(payment_id): IdPath,
    JsonBody(model): JsonBody<PaymentModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    Ok(Json(
        usecase
            .update(auth.actor(), payment_id, model, true)
            .await?,
    ))
}

pub async fn destroy<P, C, L, G>(
    State(usecase): State<Arc<PaymentUseCase<P, C, L, G>>>,
    auth: AuthUser,
    IdPath(payment_id): IdPath,
) -> Result<impl IntoResponse, UseCaseError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    usecase.delete(auth.actor(), payment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_checkout<P, C, L, G>(
    State(usecase): State<Arc<PaymentUseCase<P, C, L, G>>>,
    auth: AuthUser,
    JsonBody(model): JsonBody<CheckoutModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    let checkout = usecase.create_checkout(auth.actor(), model).await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

/// Called by Stripe, authenticated by the signature header only.
pub async fn stripe_webhook<P, C, L, G>(
    State(usecase): State<Arc<PaymentUseCase<P, C, L, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, UseCaseError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    usecase.handle_webhook(&body, signature).await?;
    Ok(Json(json!({ "received": true })))
}
