use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::json;

use super::domain::{
    days_left, parse_wire_date, Permit, PermitDraft, PermitDraftError, PermitStatus,
};
use super::store::{PermitStore, PermitUpdate};
use crate::error::AppError;

/// Router builder exposing the CRUD passthrough for the permit collection.
/// The handlers forward to the store; the only logic here is attaching the
/// derived expiration countdown to read responses.
pub fn scaffold_router<S>(store: Arc<S>) -> Router
where
    S: PermitStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/scaffolds",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route(
            "/api/v1/scaffolds/:permit_id",
            put(update_handler::<S>).delete(delete_handler::<S>),
        )
        .with_state(store)
}

/// Read view: the stored record plus `daysUntilExpiration`, clamped at zero
/// and never persisted. The status label is re-derived from the calendar so
/// stale cached labels do not reach clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitView {
    #[serde(flatten)]
    permit: Permit,
    #[serde(skip_serializing_if = "Option::is_none")]
    days_until_expiration: Option<i64>,
}

impl PermitView {
    pub fn derive(mut permit: Permit, today: NaiveDate) -> Self {
        let days_until_expiration = match permit.window() {
            Ok(window) => {
                let left = days_left(window.end, today);
                permit.status = if left > 0 {
                    PermitStatus::Active
                } else {
                    PermitStatus::Expired
                };
                Some(left.max(0))
            }
            // Unreadable dates: surface the record as stored.
            Err(_) => None,
        };

        Self {
            permit,
            days_until_expiration,
        }
    }
}

pub(crate) async fn list_handler<S>(
    State(store): State<Arc<S>>,
) -> Result<Json<Vec<PermitView>>, AppError>
where
    S: PermitStore + 'static,
{
    let permits = store.list_all().await?;
    let today = Local::now().date_naive();
    let views = permits
        .into_iter()
        .map(|permit| PermitView::derive(permit, today))
        .collect();
    Ok(Json(views))
}

pub(crate) async fn create_handler<S>(
    State(store): State<Arc<S>>,
    Json(draft): Json<PermitDraft>,
) -> Result<impl IntoResponse, AppError>
where
    S: PermitStore + 'static,
{
    draft.validate()?;
    let created = store.create(&draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn update_handler<S>(
    State(store): State<Arc<S>>,
    Path(permit_id): Path<String>,
    Json(update): Json<PermitUpdate>,
) -> Result<Json<Permit>, AppError>
where
    S: PermitStore + 'static,
{
    if let Some(raw) = update.estimated_end_date.as_deref() {
        parse_wire_date(raw).map_err(PermitDraftError::Date)?;
    }

    let updated = store.update(&permit_id, &update).await?;
    Ok(Json(updated))
}

pub(crate) async fn delete_handler<S>(
    State(store): State<Arc<S>>,
    Path(permit_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    S: PermitStore + 'static,
{
    store.delete(&permit_id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permit(start: &str, end: &str) -> Permit {
        Permit {
            id: Some("abc123".to_string()),
            area: "North Yard".to_string(),
            sub_area: "Bay 3".to_string(),
            start_date: start.to_string(),
            estimated_end_date: end.to_string(),
            leader_name: "Lead".to_string(),
            executor_name: "Exec".to_string(),
            leader_phone: "+15550001".to_string(),
            executor_phone: "+15550002".to_string(),
            status: PermitStatus::Active,
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn view_attaches_clamped_countdown_and_fresh_status() {
        let view = PermitView::derive(permit("2024-01-01", "2024-01-10"), date(2024, 1, 8));
        let body = serde_json::to_value(&view).expect("serializes");
        assert_eq!(body["daysUntilExpiration"], 3);
        assert_eq!(body["status"], "active");

        let view = PermitView::derive(permit("2024-01-01", "2024-01-10"), date(2024, 1, 20));
        let body = serde_json::to_value(&view).expect("serializes");
        assert_eq!(body["daysUntilExpiration"], 0);
        assert_eq!(body["status"], "expired");
    }

    #[test]
    fn view_leaves_unreadable_records_as_stored() {
        let view = PermitView::derive(permit("soon", "later"), date(2024, 1, 8));
        let body = serde_json::to_value(&view).expect("serializes");
        assert!(body.get("daysUntilExpiration").is_none());
        assert_eq!(body["status"], "active");
    }
}
