//! JSON-over-HTTP front for the three pipeline entry points.

use crate::server_security::{require_bearer, ApiToken};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Response as HttpResponse, StatusCode},
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use repowiki_pipeline::{ErrorKind, GenerateError, Strategy, WikiGenerator};
use repowiki_protocol::{serialize_json, SubsystemId, WikiPageId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct HttpState {
    pub wiki: Arc<WikiGenerator>,
    pub auth: Option<ApiToken>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    repo_url: Option<String>,
}

#[derive(Serialize)]
struct GenerateReply {
    id: WikiPageId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailBody {
    subsystem_id: Option<SubsystemId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailReply {
    success: bool,
    files_processed: usize,
    total_files: usize,
    summary: String,
}

pub fn router(state: HttpState) -> Router {
    let auth = state.auth.clone();
    Router::new()
        .route(
            "/generate",
            post(|state: State<HttpState>, body: Bytes| generate(state, body, Strategy::Paths)),
        )
        .route(
            "/generate-v2",
            post(|state: State<HttpState>, body: Bytes| generate(state, body, Strategy::Content)),
        )
        .route("/generate-subsystem-summary", post(subsystem_summary))
        .route("/health", get(health))
        .route_layer(middleware::from_fn_with_state(auth, require_bearer))
        .with_state(state)
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::NoValidFiles => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn generate(State(state): State<HttpState>, body: Bytes, strategy: Strategy) -> Response {
    let request: GenerateBody = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let Some(repo_url) = request.repo_url.filter(|url| !url.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid_input", "repoUrl is required");
    };

    match state.wiki.generate(&repo_url, strategy).await {
        Ok(id) => json_response(StatusCode::OK, &GenerateReply { id }),
        Err(err) => generate_error(err),
    }
}

async fn subsystem_summary(State(state): State<HttpState>, body: Bytes) -> Response {
    let request: DetailBody = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let Some(subsystem_id) = request.subsystem_id else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            "subsystemId is required",
        );
    };

    match state.wiki.generate_subsystem_detail(subsystem_id).await {
        Ok(detail) => json_response(
            StatusCode::OK,
            &DetailReply {
                success: true,
                files_processed: detail.files_processed,
                total_files: detail.total_files,
                summary: detail.summary,
            },
        ),
        Err(err) => generate_error(err),
    }
}

async fn health() -> Response {
    json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|err| {
        error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            &format!("request body is not valid JSON: {err}"),
        )
    })
}

fn generate_error(err: GenerateError) -> Response {
    error_response(status_for(err.kind), err.kind.as_str(), &err.message)
}

pub(crate) fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let envelope = ErrorEnvelope {
        code: code.to_string(),
        message: message.to_string(),
    };
    json_response(status, &envelope)
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    let (status, body) = match serialize_json(value) {
        Ok(json) => (status, json),
        Err(err) => {
            log::error!("Failed to serialize HTTP response: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"code":"internal","message":"serialization failed"}"#.to_string(),
            )
        }
    };

    let mut builder = HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json");
    if status == StatusCode::UNAUTHORIZED {
        builder = builder.header("www-authenticate", "Bearer");
    }
    builder.body(Body::from(body)).unwrap_or_else(|err| {
        log::error!("Failed to build HTTP response: {err}");
        let mut fallback = Response::new(Body::empty());
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
