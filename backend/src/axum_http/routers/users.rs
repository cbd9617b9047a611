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
        repositories::users::UserRepository,
        value_objects::users::{RegisterUserModel, UpdateUserModel},
    },
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
};

use crate::{
    auth::AuthUser,
    axum_http::extractors::{IdPath, JsonBody},
    usecases::{errors::UseCaseError, users::UserUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let usecase = UserUseCase::new(Arc::new(user_repository));

    router(Arc::new(usecase))
}

pub fn router<U>(usecase: Arc<UserUseCase<U>>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list::<U>).post(register::<U>))
        .route(
            "/:id",
            get(retrieve::<U>)
                .put(replace::<U>)
                .patch(partial_update::<U>)
                .delete(destroy::<U>),
        )
        .with_state(usecase)
}

pub async fn list<U>(
    State(usecase): State<Arc<UserUseCase<U>>>,
    _auth: AuthUser,
) -> Result<impl IntoResponse, UseCaseError>
where
    U: UserRepository + Send + Sync + 'static,
{
    Ok(Json(usecase.list().await?))
}

/// Open to anonymous callers.
pub async fn register<U>(
    State(usecase): State<Arc<UserUseCase<U>>>,
    JsonBody(model): JsonBody<RegisterUserModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    U: UserRepository + Send + Sync + 'static,
{
    let user = usecase.register(model).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn retrieve<U>(
    State(usecase): State<Arc<UserUseCase<U>>>,
    auth: AuthUser,
    IdPath(user_id): IdPath,
) -> Result<impl IntoResponse, UseCaseError>
where
    U: UserRepository + Send + Sync + 'static,
{
    Ok(Json(usecase.retrieve(auth.actor(), user_id).await?))
}

pub async fn replace<U>(
    State(usecase): State<Arc<UserUseCase<U>>>,
    auth: AuthUser,
    IdPath(user_id): IdPath,
    JsonBody(model): JsonBody<UpdateUserModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    U: UserRepository + Send + Sync + 'static,
{
    Ok(Json(usecase.update(auth.actor(), user_id, model, false).await?))
}

pub async fn partial_update<U>(
    State(usecase): State<Arc<UserUseCase<U>>>,
    auth: AuthUser,
    IdPath(user_id): IdPath,
    JsonBody(model): JsonBody<UpdateUserModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    U: UserRepository + Send + Sync + 'static,
{
    Ok(Json(usecase.update(auth.actor(), user_id, model, true).await?))
}

pub async fn destroy<U>(
    State(usecase): State<Arc<UserUseCase<U>>>,
    auth: AuthUser,
    IdPath(user_id): IdPath,
) -> Result<impl IntoResponse, UseCaseError>
where
    U: UserRepository + Send + Sync + 'static,
{
    usecase.delete(auth.actor(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axum_http::routers::test_support::{json_body, json_request, set_jwt_env};
    use chrono::Utc;
    use lms_core::domain::{entities::users::UserEntity, repositories::users::MockUserRepository};
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn anonymous_registration_hides_the_password() {
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_username_taken().returning(|_, _| Ok(false));
        user_repo.expect_email_taken().returning(|_, _| Ok(false));
        user_repo.expect_create().times(1).returning(|entity| {
            let now = Utc::now();
            Ok(UserEntity {
                id: Uuid::new_v4(),
                username: entity.username,
                email: entity.email,
                password_hash: entity.password_hash,
                phone: entity.phone,
                city: entity.city,
                avatar: entity.avatar,
                is_moderator: entity.is_moderator,
                is_active: entity.is_active,
                last_login: None,
                created_at: now,
                updated_at: now,
            })
        });

        let response = router(Arc::new(UserUseCase::new(Arc::new(user_repo))))
            .oneshot(json_request(
                "POST",
                "/",
                None,
                json!({
                    "username": "carol",
                    "email": "carol@example.com",
                    "password": "long-enough-secret"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["username"], "carol");
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn anonymous_list_is_unauthorized() {
        set_jwt_env();
        let response = router(Arc::new(UserUseCase::new(Arc::new(
            MockUserRepository::new(),
        ))))
        .oneshot(
            axum::http::Request::builder()
                .uri("/")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
