//! HTTP routes
//!
//! LUD6 errors travel in the JSON body, so every LNURL route answers 200.
//! That includes requests axum itself would reject: malformed paths and query
//! strings are turned into error envelopes rather than 4xx replies.

use crate::error::{LnurlError, ValidationError};
use crate::lnurl::{LnurlPayService, LnurlResponse};
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

const LNURLP_PREFIX: &str = "/.well-known/lnurlp";

#[derive(Serialize)]
pub struct Health {
    pub status: String,
}

/// Build the router with all routes.
///
/// Everything below the LNURL-pay prefix is answered with an envelope: nested
/// usernames reach the handler, an empty one hits the fallback.
pub fn router(service: LnurlPayService) -> Router {
    Router::new()
        .route(&format!("{}/*username", LNURLP_PREFIX), get(lnurlp))
        .route("/health", get(health))
        .fallback(fallback)
        .with_state(service)
}

/// Serve until the listener fails.
pub async fn serve(listener: TcpListener, service: LnurlPayService) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("LNURL-pay server listening on {}", addr);
    }
    axum::serve(listener, router(service)).await
}

/// The first `amount` parameter wins; later duplicates are ignored.
fn first_amount(pairs: Vec<(String, String)>) -> Option<String> {
    pairs
        .into_iter()
        .find(|(key, _)| key == "amount")
        .map(|(_, value)| value)
}

fn invalid_username(raw: impl Into<String>) -> Json<LnurlResponse> {
    let err = LnurlError::from(ValidationError::InvalidUsername(raw.into()));
    warn!("LNURL-pay request rejected: {}", err);
    Json(LnurlResponse::error(&err))
}

async fn lnurlp(
    State(service): State<LnurlPayService>,
    username: Result<Path<String>, PathRejection>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Json<LnurlResponse> {
    let username = match username {
        Ok(Path(username)) => username,
        Err(rejection) => return invalid_username(rejection.body_text()),
    };

    let amount = match query {
        Ok(Query(pairs)) => first_amount(pairs),
        Err(rejection) => {
            let err = LnurlError::from(ValidationError::AmountUnparsable(rejection.body_text()));
            warn!("LNURL-pay request for {:?} failed: {}", username, err);
            return Json(LnurlResponse::error(&err));
        }
    };

    Json(service.handle(&username, amount.as_deref()).await)
}

async fn fallback(uri: Uri) -> Response {
    let path = uri.path();
    let under_prefix = path
        .strip_prefix(LNURLP_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    if under_prefix {
        invalid_username(path).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Health check endpoint.
async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}
