use serde::Deserialize;
use tauri::Emitter;

use crate::{auth, config, db, orders, payload_arg0_as_string, retry};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderCancelPayload {
    #[serde(alias = "order_id", alias = "id")]
    order_id: String,
    #[serde(alias = "guest_name", alias = "name")]
    guest_name: String,
}

fn parse_order_cancel_payload(
    arg0: Option<serde_json::Value>,
    arg1: Option<String>,
) -> Result<OrderCancelPayload, String> {
    let payload = match arg0 {
        Some(serde_json::Value::String(order_id)) => {
            serde_json::json!({ "orderId": order_id, "guestName": arg1 })
        }
        Some(v) => v,
        None => serde_json::json!({ "guestName": arg1 }),
    };
    let mut parsed: OrderCancelPayload = serde_json::from_value(payload)
        .map_err(|e| format!("Invalid cancel payload: {e}"))?;
    parsed.order_id = parsed.order_id.trim().to_string();
    parsed.guest_name = parsed.guest_name.trim().to_string();
    if parsed.order_id.is_empty() {
        return Err("Missing orderId".into());
    }
    if parsed.guest_name.is_empty() {
        return Err("Missing guestName".into());
    }
    Ok(parsed)
}

fn emit_queue_snapshot(app: &tauri::AppHandle, db: &db::DbState) {
    if let Ok(snapshot) = orders::queue_snapshot(db) {
        let _ = app.emit("queue_snapshot", snapshot);
    }
}

#[tauri::command]
pub async fn order_submit(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    config: tauri::State<'_, config::Config>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    auth::require_guest(&auth_state).map_err(|e| e.to_string())?;

    let payload = arg0.ok_or("Missing order payload")?;
    let normalized = payload.get("orderData").cloned().unwrap_or(payload);
    let request: orders::SubmitOrderRequest =
        serde_json::from_value(normalized).map_err(|e| format!("Invalid order payload: {e}"))?;

    let confirmation = orders::submit_order(&db, config.wait_minutes_per_order, &request)
        .map_err(|e| e.to_string())?;

    let confirmation_json = serde_json::json!({
        "success": true,
        "orderId": confirmation.order_id,
        "queueNumber": confirmation.queue_number,
        "estimatedWait": confirmation.estimated_wait,
        "degraded": confirmation.degraded,
    });
    let _ = app.emit("order_created", confirmation_json.clone());
    emit_queue_snapshot(&app, &db);

    Ok(confirmation_json)
}

#[tauri::command]
pub async fn order_cancel(
    arg0: Option<serde_json::Value>,
    arg1: Option<String>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    auth::require_guest(&auth_state).map_err(|e| e.to_string())?;
    let payload = parse_order_cancel_payload(arg0, arg1)?;

    let seed = payload.order_id.bytes().map(i64::from).sum();
    retry::with_retry("order_cancel", retry::RetryPolicy::default(), seed, || async {
        orders::cancel_order(&db, &payload.order_id, &payload.guest_name)
    })
    .await
    .map_err(|e| e.to_string())?;

    let _ = app.emit(
        "order_cancelled",
        serde_json::json!({ "orderId": payload.order_id }),
    );
    emit_queue_snapshot(&app, &db);

    Ok(serde_json::json!({ "success": true, "orderId": payload.order_id }))
}

#[tauri::command]
pub async fn order_get_ahead(
    arg0: Option<serde_json::Value>,
    arg1: Option<String>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<serde_json::Value, String> {
    auth::require_guest(&auth_state).map_err(|e| e.to_string())?;
    let order_id = payload_arg0_as_string(arg0, &["orderId", "order_id", "id"])
        .or(arg1)
        .ok_or("Missing orderId")?;
    let ahead = orders::orders_ahead(&db, &order_id).map_err(|e| e.to_string())?;
    let total_prep: i64 = ahead.iter().map(|o| o.preparation_minutes).sum();
    Ok(serde_json::json!({
        "orderId": order_id,
        "ahead": ahead,
        "totalPreparationMinutes": total_prep,
    }))
}

#[tauri::command]
pub async fn orders_get_mine(
    arg0: Option<serde_json::Value>,
    arg1: Option<String>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Vec<serde_json::Value>, String> {
    auth::require_guest(&auth_state).map_err(|e| e.to_string())?;
    let guest_name = payload_arg0_as_string(arg0, &["guestName", "guest_name", "name"])
        .or(arg1)
        .ok_or("Missing guestName")?;
    orders::orders_for_guest(&db, &guest_name).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn queue_get_snapshot(
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<serde_json::Value, String> {
    auth::require_guest(&auth_state).map_err(|e| e.to_string())?;
    retry::with_retry("queue_snapshot", retry::RetryPolicy::default(), 0, || async {
        orders::queue_snapshot(&db)
    })
    .await
    .map_err(|e| e.to_string())
}

const QUEUE_MONITOR_MIN_INTERVAL_SECS: u64 = 5;

/// Periodically emit a `queue_snapshot` event so dashboards stay current
/// even if an individual order event was missed. Uses its own database
/// connection.
pub fn start_queue_monitor(
    app: tauri::AppHandle,
    db: std::sync::Arc<db::DbState>,
    interval_secs: u64,
) {
    let cadence =
        std::time::Duration::from_secs(interval_secs.max(QUEUE_MONITOR_MIN_INTERVAL_SECS));

    tauri::async_runtime::spawn(async move {
        tracing::info!(interval_secs = cadence.as_secs(), "Starting queue monitor");
        loop {
            match orders::queue_snapshot(&db) {
                Ok(snapshot) => {
                    let _ = app.emit("queue_snapshot", snapshot);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "queue monitor snapshot failed");
                }
            }
            tokio::time::sleep(cadence).await;
        }
    });
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_cancel_payload_supports_object_shape() {
        let parsed = parse_order_cancel_payload(
            Some(serde_json::json!({ "orderId": " order-1 ", "guestName": "Ada" })),
            None,
        )
        .expect("object payload should parse");
        assert_eq!(parsed.order_id, "order-1");
        assert_eq!(parsed.guest_name, "Ada");
    }

    #[test]
    fn parse_cancel_payload_supports_legacy_tuple_shape() {
        let parsed = parse_order_cancel_payload(
            Some(serde_json::json!("order-2")),
            Some("Grace".to_string()),
        )
        .expect("legacy payload should parse");
        assert_eq!(parsed.order_id, "order-2");
        assert_eq!(parsed.guest_name, "Grace");
    }

    #[test]
    fn parse_cancel_payload_requires_both_fields() {
        assert!(parse_order_cancel_payload(Some(serde_json::json!("order-3")), None).is_err());
        assert!(parse_order_cancel_payload(
            Some(serde_json::json!({ "guestName": "Ada" })),
            None
        )
        .is_err());
    }
}
