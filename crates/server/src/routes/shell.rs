//! Static shell fallback.
//!
//! Unmatched `GET`s are looked up in the shell directory. Anything that is
//! not there navigates back to the install page. Unmatched API paths are
//! plain 404s.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use shop_catalog_core::catalog::view::INSTALL_ROUTE;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::error::AppError;
use crate::state::AppState;

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Fallback handler for both origins.
pub async fn fallback(State(state): State<AppState>, request: Request) -> Response {
    if is_api_path(request.uri().path()) || request.method() != Method::GET {
        return AppError::NotFound.into_response();
    }

    let served: Result<_, Infallible> = ServeDir::new(&state.config().static_dir)
        .oneshot(request)
        .await;
    let response = match served {
        Ok(response) => response,
        Err(never) => match never {},
    };

    if response.status() == StatusCode::NOT_FOUND {
        Redirect::to(INSTALL_ROUTE).into_response()
    } else {
        response.map(Body::new)
    }
}
