use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use lms_core::{
    domain::{
        repositories::users::UserRepository,
        value_objects::users::{TokenObtainModel, TokenRefreshModel},
    },
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
};

use crate::{
    axum_http::extractors::JsonBody,
    config::config_model::{TokenTtl, UserSecret},
    usecases::{errors::UseCaseError, tokens::TokenUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>, secret: UserSecret, ttl: TokenTtl) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let usecase = TokenUseCase::new(Arc::new(user_repository), secret, ttl);

    router(Arc::new(usecase))
}

pub fn router<U>(usecase: Arc<TokenUseCase<U>>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", post(obtain::<U>))
        .route("/refresh", post(refresh::<U>))
        .with_state(usecase)
}

pub async fn obtain<U>(
    State(usecase): State<Arc<TokenUseCase<U>>>,
    JsonBody(model): JsonBody<TokenObtainModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    U: UserRepository + Send + Sync + 'static,
{
    Ok(Json(usecase.obtain(model).await?))
}

pub async fn refresh<U>(
    State(usecase): State<Arc<TokenUseCase<U>>>,
    JsonBody(model): JsonBody<TokenRefreshModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    U: UserRepository + Send + Sync + 'static,
{
    Ok(Json(usecase.refresh(model).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axum_http::routers::test_support::{json_body, json_request};
    use axum::http::StatusCode;
    use lms_core::domain::repositories::users::MockUserRepository;
    use serde_json::json;
    use tower::ServiceExt;

    fn app(user_repo: MockUserRepository) -> Router {
        router(Arc::new(TokenUseCase::new(
            Arc::new(user_repo),
            UserSecret {
                secret: "access".to_string(),
                refresh_secret: "refresh".to_string(),
            },
            TokenTtl::default(),
        )))
    }

    #[tokio::test]
    async fn unknown_user_gets_unauthorized() {
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_username().returning(|_| Ok(None));

        let response = app(user_repo)
            .oneshot(json_request(
                "POST",
                "/",
                None,
                json!({ "username": "ghost", "password": "whatever1" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_refresh_token_gets_unauthorized() {
        let response = app(MockUserRepository::new())
            .oneshot(json_request(
                "POST",
                "/refresh",
                None,
                json!({ "refresh": "not-a-jwt" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], 401);
    }
}
