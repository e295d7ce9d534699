//! HTTP server for the OrderDesk API.

use crate::apis::{
	orders::{self, ChecklistResponse, NextActionResponse, StatusChangeRequest, StatusChangeResponse},
	APIError,
};
use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::Json,
	routing::{get, post},
	Router,
};
use orderdesk_config::ApiConfig;
use orderdesk_core::projection::OrderBoard;
use orderdesk_core::OrderDesk;
use orderdesk_types::Order;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub desk: Arc<OrderDesk>,
}

/// Routes under `/api`.
pub fn router(state: AppState) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", get(handle_board))
				.route("/orders/{id}", get(handle_get_order).delete(handle_delete_order))
				.route("/orders/{id}/next-action", get(handle_next_action))
				.route("/orders/{id}/status", post(handle_status_change))
				.route("/orders/{id}/checklist/{index}", post(handle_toggle_item)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(state)
}

/// Serves the API until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	desk: Arc<OrderDesk>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(AppState { desk });

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("OrderDesk API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /api/orders.
async fn handle_board(State(state): State<AppState>) -> Json<OrderBoard> {
	Json(orders::get_board(&state.desk))
}

/// Handles GET /api/orders/{id}.
async fn handle_get_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	orders::get_order(&state.desk, &id).await.map(Json)
}

async fn handle_next_action(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<NextActionResponse>, APIError> {
	orders::get_next_action(&state.desk, &id).await.map(Json)
}

/// Handles POST /api/orders/{id}/status.
async fn handle_status_change(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(request): Json<StatusChangeRequest>,
) -> Result<Json<StatusChangeResponse>, APIError> {
	match orders::change_status(&state.desk, &id, request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Status change failed: {}", e);
			Err(e)
		},
	}
}

async fn handle_toggle_item(
	State(state): State<AppState>,
	Path((id, index)): Path<(String, usize)>,
) -> Result<Json<ChecklistResponse>, APIError> {
	orders::toggle_checklist_item(&state.desk, &id, index)
		.await
		.map(Json)
}

/// Handles DELETE /api/orders/{id}.
async fn handle_delete_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<StatusCode, APIError> {
	orders::delete_order(&state.desk, &id).await?;
	Ok(StatusCode::NO_CONTENT)
}
