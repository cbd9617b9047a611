use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
};
use lms_core::{
    domain::{
        repositories::{courses::CourseRepository, lessons::LessonRepository},
        value_objects::lessons::LessonModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{courses::CoursePostgres, lessons::LessonPostgres},
    },
};

use crate::{
    auth::AuthUser,
    axum_http::extractors::{IdPath, JsonBody},
    usecases::{errors::UseCaseError, lessons::LessonUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let lesson_repository = LessonPostgres::new(Arc::clone(&db_pool));
    let course_repository = CoursePostgres::new(Arc::clone(&db_pool));
    let usecase = LessonUseCase::new(Arc::new(lesson_repository), Arc::new(course_repository));

    router(Arc::new(usecase))
}

pub fn router<L, C>(usecase: Arc<LessonUseCase<L, C>>) -> Router
where
    L: LessonRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list::<L, C>).post(create::<L, C>))
        .route(
            "/:id",
            get(retrieve::<L, C>)
                .put(replace::<L, C>)
                .patch(partial_update::<L, C>)
                .delete(destroy::<L, C>),
        )
        // Explicit aliases kept for existing clients.
        .route("/:id/update", put(replace::<L, C>))
        .route("/:id/delete", delete(destroy::<L, C>))
        .with_state(usecase)
}

pub async fn list<L, C>(
    State(usecase): State<Arc<LessonUseCase<L, C>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, UseCaseError>
where
    L: LessonRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    Ok(Json(usecase.list(auth.actor()).await?))
}

pub async fn create<L, C>(
    State(usecase): State<Arc<LessonUseCase<L, C>>>,
    auth: AuthUser,
    JsonBody(model): JsonBody<LessonModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    L: LessonRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    let lesson = usecase.create(auth.actor(), model).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

pub async fn retrieve<L, C>(
    State(usecase): State<Arc<LessonUseCase<L, C>>>,
    auth: AuthUser,
    IdPath(lesson_id): IdPath,
) -> Result<impl IntoResponse, UseCaseError>
where
    L: LessonRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    Ok(Json(usecase.retrieve(auth.actor(), lesson_id).await?))
}

pub async fn replace<L, C>(
    State(usecase): State<Arc<LessonUseCase<L, C>>>,
    auth: AuthUser,
    IdPath(lesson_id): IdPath,
    JsonBody(model): JsonBody<LessonModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    L: LessonRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    Ok(Json(
        usecase
            .update(auth.actor(), lesson_id, model, false)
            .await?,
    ))
}

pub async fn partial_update<L, C>(
    State(usecase): State<Arc<LessonUseCase<L, C>>>,
    auth: AuthUser,
    IdPath(lesson_id): IdPath,
    JsonBody(model): JsonBody<LessonModel>,
) -> Result<impl IntoResponse, UseCaseError>
where
    L: LessonRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    Ok(Json(
        usecase.update(auth.actor(), lesson_id, model, true).await?,
    ))
}

pub async fn destroy<L, C>(
    State(usecase): State<Arc<LessonUseCase<L, C>>>,
    auth: AuthUser,
    IdPath(lesson_id): IdPath,
) -> Result<impl IntoResponse, UseCaseError>
where
    L: LessonRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    usecase.delete(auth.actor(), lesson_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axum_http::routers::test_support::{
        bearer, empty_request, json_body, json_request, set_jwt_env,
    };
    use chrono::Utc;
    use lms_core::domain::{
        entities::{courses::CourseEntity, lessons::LessonEntity},
        repositories::{courses::MockCourseRepository, lessons::MockLessonRepository},
        value_objects::{access_policy::Actor, enums::user_roles::UserRole},
    };
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn lesson(owner_id: Uuid) -> LessonEntity {
        let now = Utc::now();
        LessonEntity {
            id: Uuid::new_v4(),
            title: "Pattern matching".to_string(),
            description: String::new(),
            preview: None,
            video_link: None,
            course_id: Uuid::new_v4(),
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn app(lesson_repo: MockLessonRepository, course_repo: MockCourseRepository) -> Router {
        router(Arc::new(LessonUseCase::new(
            Arc::new(lesson_repo),
            Arc::new(course_repo),
        )))
    }

    #[tokio::test]
    async fn anonymous_requests_are_unauthorized() {
        set_jwt_env();
        let mut lesson_repo = MockLessonRepository::new();
        lesson_repo.expect_list().never();
        lesson_repo.expect_find_by_id().never();
        lesson_repo.expect_create().never();
        lesson_repo.expect_update().never();
        lesson_repo.expect_delete_detaching_payments().never();
        let app = app(lesson_repo, MockCourseRepository::new());

        let id = Uuid::new_v4();
        let body = json!({ "title": "Closures", "course": Uuid::new_v4() });
        let requests = [
            empty_request("GET", "/", None),
            json_request("POST", "/", None, body.clone()),
            empty_request("GET", &format!("/{id}"), None),
            json_request("PUT", &format!("/{id}"), None, body.clone()),
            json_request("PATCH", &format!("/{id}"), None, body.clone()),
            empty_request("DELETE", &format!("/{id}"), None),
            json_request("PUT", &format!("/{id}/update"), None, body),
            empty_request("DELETE", &format!("/{id}/delete"), None),
        ];

        for request in requests {
            let label = format!("{} {}", request.method(), request.uri());
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{label}");
        }
    }

    #[tokio::test]
    async fn foreign_video_link_is_bad_request_on_the_field() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let mut lesson_repo = MockLessonRepository::new();
        lesson_repo.expect_create().never();

        let response = app(lesson_repo, MockCourseRepository::new())
            .oneshot(json_request(
                "POST",
                "/",
                Some(&bearer(actor)),
                json!({
                    "title": "Closures",
                    "course": Uuid::new_v4(),
                    "video_link": "https://vimeo.com/123"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["errors"]["video_link"].is_array());
    }

    #[tokio::test]
    async fn youtube_link_is_accepted() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let course_id = Uuid::new_v4();

        let mut course_repo = MockCourseRepository::new();
        course_repo.expect_find_by_id().returning(|id| {
            let now = Utc::now();
            Ok(Some(CourseEntity {
                id,
                title: "Rust".to_string(),
                description: "d".to_string(),
                preview: None,
                owner_id: Uuid::new_v4(),
                created_at: now,
                updated_at: now,
            }))
        });
        let mut lesson_repo = MockLessonRepository::new();
        lesson_repo.expect_create().times(1).returning(|entity| {
            let mut created = lesson(entity.owner_id);
            created.course_id = entity.course_id;
            created.video_link = entity.video_link;
            Ok(created)
        });

        let response = app(lesson_repo, course_repo)
            .oneshot(json_request(
                "POST",
                "/",
                Some(&bearer(actor)),
                json!({
                    "title": "Closures",
                    "course": course_id,
                    "video_link": "youtu.be/abc123"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["video_link"], "youtu.be/abc123");
        assert_eq!(body["course"], course_id.to_string());
    }

    #[tokio::test]
    async fn moderator_can_update_through_alias_but_not_delete() {
        let owned = lesson(Uuid::new_v4());
        let lesson_id = owned.id;
        let mut lesson_repo = MockLessonRepository::new();
        let found = owned.clone();
        lesson_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        lesson_repo
            .expect_update()
            .times(1)
            .returning(move |_, _| Ok(owned.clone()));
        lesson_repo.expect_delete_detaching_payments().never();
        let app = app(lesson_repo, MockCourseRepository::new());

        let moderator = bearer(Actor::new(Uuid::new_v4(), UserRole::Moderator));

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/{lesson_id}/update"),
                Some(&moderator),
                json!({ "title": "Pattern matching, revisited" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request(
                "DELETE",
                &format!("/{lesson_id}/delete"),
                Some(&moderator),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
