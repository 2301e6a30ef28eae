use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use super::model::{GenerateQuery, GenerateRequest, GenerateResponse, LogoutResponse};
use crate::AppState;
use crate::error::AppError;
use crate::utils::success_to_api_response;

#[axum::debug_handler]
pub async fn generate(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<GenerateQuery>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<GenerateRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    if query.count > state.config.max_generate_count {
        return Err(AppError::Validation(format!(
            "count must not exceed {}",
            state.config.max_generate_count
        )));
    }

    let accepted = state.tokens.generate(query.count, req.into());

    Ok((
        StatusCode::ACCEPTED,
        success_to_api_response(GenerateResponse { accepted }),
    ))
}

#[axum::debug_handler]
pub async fn list_tokens(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let tokens = state.tokens.list_all().await?;

    Ok((StatusCode::OK, success_to_api_response(tokens)))
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> impl IntoResponse {
    let outcome = state.tokens.logout(id).await;

    (
        StatusCode::ACCEPTED,
        success_to_api_response(LogoutResponse { id, outcome }),
    )
}
