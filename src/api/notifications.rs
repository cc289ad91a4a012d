//! Notification API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::models::{DispatchReceipt, DispatchRequest, HistoryQuery, InboxEntry, SendSummary};
use crate::AppState;

/// POST /api/notifications/send - Dispatch a broadcast to its audience.
pub async fn send_notification(
    State(state): State<AppState>,
    Json(request): Json<DispatchRequest>,
) -> ApiResult<DispatchReceipt> {
    let receipt = state.dispatch.dispatch(&request).await?;
    success(receipt)
}

/// GET /api/notifications/inbox/:profile_id - A profile's inbox, newest first.
pub async fn inbox(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> ApiResult<Vec<InboxEntry>> {
    let entries = state.dispatch.list_inbox(&profile_id).await?;
    success(entries)
}

/// PUT /api/notifications/:delivery_id/read - Mark a delivery read.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(delivery_id): Path<String>,
) -> ApiResult<()> {
    state.dispatch.mark_read(&delivery_id).await?;
    success(())
}

/// GET /api/notifications/history?limit=N - Send history with aggregates.
pub async fn notification_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<SendSummary>> {
    let limit = query.limit.clamp(1, 500);
    let sends = state.dispatch.history(limit).await?;
    success(sends)
}

/// DELETE /api/notifications/sends/:send_id - Delete a send and its deliveries.
pub async fn delete_send(
    State(state): State<AppState>,
    Path(send_id): Path<String>,
) -> ApiResult<()> {
    state.dispatch.delete_send(&send_id).await?;
    success(())
}
