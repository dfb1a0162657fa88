//! HTTP/JSON adapter over `ThreadService`
//!
//! Handlers only translate: path, query and body in; entity or
//! `{kind, message}` error out. Every rule is enforced by the service.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use threadline_core::{
    Comment, ErrorKind, NewComment, NewPost, NewUser, Post, PostUpdate, ServiceError,
    ThreadNode, ThreadOptions, ThreadService, User, COMMENTS_ENABLED_DEFAULT,
};

// =============================================================================
// State
// =============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ThreadService>,
}

impl AppState {
    /// Wrap a service for the router.
    pub fn new(service: Arc<ThreadService>) -> Self {
        Self { service }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", get(get_post).put(update_post))
        .route(
            "/posts/:id/comments",
            get(list_comments).post(create_comment),
        )
        .route("/posts/:id/thread", get(get_thread))
        .route("/comments/:id", get(get_comment))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

/// Service error rendered as `{kind, message}` with a matching status.
#[derive(Debug)]
pub struct ApiError(ServiceError);

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    kind: String,
    message: String,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::ParamOutOfRange => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Forbidden | ErrorKind::CommentsForbidden => StatusCode::FORBIDDEN,
        ErrorKind::Backend => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = ErrorBody {
            kind: kind.as_str().to_string(),
            message: self.0.detail().to_string(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Request Shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct PageQuery {
    offset: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentsQuery {
    parent_id: Option<String>,
    offset: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ThreadQuery {
    depth: Option<usize>,
    limit: Option<i64>,
}

// Ids and timestamps are assigned server-side; unknown fields are ignored.

#[derive(Debug, Deserialize)]
struct CreateUserBody {
    username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostBody {
    title: String,
    content: String,
    author_id: String,
    #[serde(default = "comments_enabled_default")]
    comments_enabled: bool,
}

fn comments_enabled_default() -> bool {
    COMMENTS_ENABLED_DEFAULT
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePostBody {
    title: String,
    content: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommentBody {
    text: String,
    author_id: String,
    #[serde(default)]
    parent_id: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.service.create_user(NewUser::new(body.username)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<User>> {
    Ok(Json(state.service.get_user(&id).await?))
}

async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<CreatePostBody>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let input = NewPost::new(body.title, body.content, body.author_id)
        .with_comments_enabled(body.comments_enabled);
    let post = state.service.create_post(input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    let posts = state.service.list_posts_page(page.offset, page.limit).await?;
    Ok(Json(posts))
}

async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Post>> {
    Ok(Json(state.service.get_post(&id).await?))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePostBody>,
) -> ApiResult<Json<Post>> {
    let update = PostUpdate::new(id, body.title, body.content);
    let post = state.service.update_post(update, &body.user_id).await?;
    Ok(Json(post))
}

async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(body): Json<CreateCommentBody>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let mut input = NewComment::new(post_id, body.author_id, body.text);
    if let Some(parent_id) = body.parent_id {
        input = input.reply_to(parent_id);
    }
    let comment = state.service.create_comment(input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(query): Query<CommentsQuery>,
) -> ApiResult<Json<Vec<Comment>>> {
    let comments = state
        .service
        .list_comments_page(
            &post_id,
            query.parent_id.as_deref(),
            query.offset,
            query.limit,
        )
        .await?;
    Ok(Json(comments))
}

async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Comment>> {
    Ok(Json(state.service.get_comment(&id).await?))
}

async fn get_thread(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(query): Query<ThreadQuery>,
) -> ApiResult<Json<Vec<ThreadNode>>> {
    let mut options = ThreadOptions::default();
    if let Some(depth) = query.depth {
        options = options.with_max_depth(depth);
    }
    if let Some(limit) = query.limit {
        options = options.with_page_size(limit);
    }
    Ok(Json(state.service.load_thread(&post_id, options).await?))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use threadline_core::{MemoryBackend, ServiceConfig, SimClock};
    use tower::ServiceExt;

    fn app() -> Router {
        let service = ThreadService::new(Arc::new(MemoryBackend::new()), ServiceConfig::default());
        router(AppState::new(Arc::new(service)))
    }

    fn app_at(clock_ms: i64) -> Router {
        let service = ThreadService::new(Arc::new(MemoryBackend::new()), ServiceConfig::default())
            .with_clock(Arc::new(SimClock::at_ms(clock_ms)));
        router(AppState::new(Arc::new(service)))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_full_flow_over_http() {
        let app = app();

        let (status, user) = send(&app, Method::POST, "/users", Some(json!({"username": "alice"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let user_id = user["id"].as_str().unwrap().to_string();

        let (status, post) = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({
                "title": "Hello",
                "content": "World",
                "authorId": user_id,
                "commentsEnabled": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let post_id = post["id"].as_str().unwrap().to_string();

        let (status, root) = send(
            &app,
            Method::POST,
            &format!("/posts/{post_id}/comments"),
            Some(json!({"text": "first!", "authorId": user_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let root_id = root["id"].as_str().unwrap().to_string();
        assert!(root["parentId"].is_null());

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/posts/{post_id}/comments"),
            Some(json!({"text": "reply", "authorId": user_id, "parentId": root_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, replies) = send(
            &app,
            Method::GET,
            &format!("/posts/{post_id}/comments?parentId={root_id}&offset=0&limit=10"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replies.as_array().unwrap().len(), 1);
        assert_eq!(replies[0]["text"], "reply");

        let (status, thread) = send(&app, Method::GET, &format!("/posts/{post_id}/thread"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(thread[0]["replies"][0]["comment"]["text"], "reply");

        let (status, listed) = send(&app, Method::GET, "/posts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = app();

        let (status, body) = send(&app, Method::POST, "/users", Some(json!({"username": "al"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");

        let (status, _) = send(&app, Method::POST, "/users", Some(json!({"username": "alice"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&app, Method::POST, "/users", Some(json!({"username": "alice"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "already_exists");

        let (status, body) = send(&app, Method::GET, "/posts/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
        assert_eq!(body["message"], "post nope");

        let (status, body) = send(&app, Method::GET, "/posts?limit=1000", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "param_out_of_range");
    }

    #[tokio::test]
    async fn test_forbidden_statuses() {
        let app = app();
        let (_, alice) = send(&app, Method::POST, "/users", Some(json!({"username": "alice"}))).await;
        let (_, bob) = send(&app, Method::POST, "/users", Some(json!({"username": "bob"}))).await;

        let (_, post) = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({
                "title": "t",
                "content": "c",
                "authorId": alice["id"],
                "commentsEnabled": false
            })),
        )
        .await;
        let post_id = post["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/posts/{post_id}"),
            Some(json!({"title": "x", "content": "y", "userId": bob["id"]})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "forbidden");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/posts/{post_id}/comments"),
            Some(json!({"text": "hi", "authorId": alice["id"]})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "comments_forbidden");

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/posts/{post_id}"),
            Some(json!({"title": "new", "content": "body", "userId": alice["id"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "new");
    }

    #[tokio::test]
    async fn test_create_ignores_client_ids_and_timestamps() {
        let app = app_at(1_700_000_000_000);

        let (status, user) = send(
            &app,
            Method::POST,
            "/users",
            Some(json!({"id": "chosen-user", "username": "alice"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_ne!(user["id"], "chosen-user");

        let (status, post) = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({
                "id": "chosen-post",
                "title": "t",
                "content": "c",
                "authorId": user["id"],
                "createdAt": "1999-01-01T00:00:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_ne!(post["id"], "chosen-post");
        assert!(post["createdAt"].as_str().unwrap().starts_with("2023-11-14T22:13:20"));
        assert_eq!(post["commentsEnabled"], true);

        let post_id = post["id"].as_str().unwrap().to_string();
        let (status, comment) = send(
            &app,
            Method::POST,
            &format!("/posts/{post_id}/comments"),
            Some(json!({"id": "chosen-comment", "text": "hi", "authorId": user["id"]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_ne!(comment["id"], "chosen-comment");
        assert_eq!(comment["postId"], post_id.as_str());
    }

    #[test]
    fn test_backend_errors_map_to_500() {
        assert_eq!(status_for(ErrorKind::Backend), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorKind::CommentsForbidden), StatusCode::FORBIDDEN);
    }
}
