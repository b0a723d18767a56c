use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::criteria::{self, CriteriaError};
use crate::models::BookingPayload;
use crate::service::BookingService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BookingService>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "booking not found".to_string()),
            ApiError::Internal(e) => {
                error!("request failed: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl From<CriteriaError> for ApiError {
    fn from(e: CriteriaError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/bookings", post(create_booking).get(get_all_bookings))
        .route("/bookings/count", get(count_bookings))
        .route(
            "/bookings/:id",
            get(get_booking)
                .put(update_booking)
                .patch(partial_update_booking)
                .delete(delete_booking),
        )
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<BookingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.id.is_some() {
        return Err(ApiError::BadRequest(
            "a new booking cannot already have an id".to_string(),
        ));
    }
    let booking = state.service.save(payload.into_new()).await?;
    let location = format!("/bookings/{}", booking.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(booking),
    ))
}

async fn get_all_bookings(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let (criteria, page) = criteria::parse_query(&params)?;
    let (items, total) = state.service.find_all(criteria, page).await?;
    Ok((
        [(HeaderName::from_static("x-total-count"), total.to_string())],
        Json(items),
    ))
}

async fn count_bookings(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let (criteria, _) = criteria::parse_query(&params)?;
    let total = state.service.count(criteria).await?;
    Ok(Json(total))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.service.find_one(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(booking))
}

/// PUT: full overwrite. The body must carry the same id as the path.
async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<BookingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    check_body_id(id, &payload)?;
    let updated = state
        .service
        .update(id, payload.into_replacement())
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(updated))
}

/// PATCH: merge-patch, only fields present in the body overwrite stored
/// values.
async fn partial_update_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<BookingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    check_body_id(id, &payload)?;
    let merged = state
        .service
        .partial_update(id, payload.into_patch())
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(merged))
}

async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health_check() -> &'static str {
    "OK"
}

fn check_body_id(path_id: i64, payload: &BookingPayload) -> Result<(), ApiError> {
    match payload.id {
        None => Err(ApiError::BadRequest(
            "booking id is missing from the request body".to_string(),
        )),
        Some(body_id) if body_id != path_id => Err(ApiError::BadRequest(
            "booking id does not match the request path".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_expected_status_codes() {
        let response = ApiError::BadRequest("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn criteria_errors_become_bad_requests() {
        let err: ApiError = CriteriaError::UnknownField("wat".to_string()).into();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn body_id_must_match_path() {
        let payload = BookingPayload::default();
        assert!(matches!(
            check_body_id(1, &payload),
            Err(ApiError::BadRequest(_))
        ));

        let payload = BookingPayload {
            id: Some(2),
            ..Default::default()
        };
        assert!(matches!(
            check_body_id(1, &payload),
            Err(ApiError::BadRequest(_))
        ));
        assert!(check_body_id(2, &payload).is_ok());
    }
}
