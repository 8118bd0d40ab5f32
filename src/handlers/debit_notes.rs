use crate::{
    errors::{ErrorResponse, ServiceError},
    models::TransactionDocument,
    services::{mapper::TargetDoc, RequestContext},
    tracing::current_request_id,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::ACCEPT_LANGUAGE, HeaderMap},
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

pub const USER_HEADER: &str = "x-user-id";
const GUEST_USER: &str = "Guest";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MakeDebitNoteRequest {
    /// Optional shell the note is built on, as an object or its JSON text.
    #[serde(default)]
    pub target_doc: Option<TargetDoc>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// First language tag of an `Accept-Language` value, without its weight.
fn preferred_language(raw: &str) -> Option<&str> {
    raw.split(',')
        .next()
        .and_then(|tag| tag.split(';').next())
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && *tag != "*")
}

/// Target shell carried by the request body. An empty body means no shell;
/// anything else must decode as a [`MakeDebitNoteRequest`].
fn target_from_body(body: &[u8]) -> Result<Option<TargetDoc>, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let Json(request) = Json::<MakeDebitNoteRequest>::from_bytes(body)
        .map_err(|rejection| ServiceError::InvalidInput(rejection.body_text()))?;
    Ok(request.target_doc)
}

pub fn request_context(headers: &HeaderMap, default_language: &str) -> RequestContext {
    let user = header_str(headers, USER_HEADER).unwrap_or(GUEST_USER);
    let lang = header_str(headers, ACCEPT_LANGUAGE.as_str())
        .and_then(preferred_language)
        .unwrap_or(default_language);

    let ctx = RequestContext::new(user, lang);
    match current_request_id() {
        Some(request_id) => ctx.with_request_id(request_id.as_str()),
        None => ctx,
    }
}

/// Build a debit note against a submitted sales invoice
#[utoipa::path(
    post,
    path = "/api/v1/sales-invoices/{name}/debit-note",
    tag = "Debit Notes",
    summary = "Make sales debit note",
    description = "Maps a submitted sales invoice into an unsaved note, net of earlier returns.",
    params(("name" = String, Path, description = "Sales invoice name")),
    request_body(content = MakeDebitNoteRequest, description = "Optional target shell"),
    responses(
        (status = 200, description = "Debit note prepared", body = ApiResponse<TransactionDocument>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Draft source or invalid target", body = ErrorResponse),
        (status = 404, description = "Sales invoice not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn make_sales_debit(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<TransactionDocument> {
    let ctx = request_context(&headers, &state.config.default_language);
    let target = target_from_body(&body)?;

    let note = state
        .debit_note_service()
        .make_sales_debit(&ctx, &name, target)
        .await?;

    Ok(Json(ApiResponse::success(note)))
}
