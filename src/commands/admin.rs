use serde::Deserialize;
use serde_json::Value;
use tauri::Emitter;

use crate::orders::OrderStatus;
use crate::{admin, auth, db, payload_arg0_as_string};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkUpdatePayload {
    action: String,
    #[serde(default, alias = "order_ids", alias = "ids")]
    order_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdatePayload {
    #[serde(alias = "order_id", alias = "id")]
    order_id: String,
    status: String,
}

fn parse_bulk_payload(arg0: Option<Value>) -> Result<(admin::BulkAction, Vec<String>), String> {
    let payload = arg0.ok_or("Missing bulk update payload")?;
    let parsed: BulkUpdatePayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid bulk payload: {e}"))?;
    let action = admin::BulkAction::parse(&parsed.action)
        .ok_or_else(|| format!("Unknown bulk action: {}", parsed.action))?;
    if parsed.order_ids.is_empty() {
        return Err("No orders selected".into());
    }
    Ok((action, parsed.order_ids))
}

fn parse_status_payload(
    arg0: Option<Value>,
    arg1: Option<String>,
) -> Result<(String, OrderStatus), String> {
    let payload = match arg0 {
        Some(Value::String(order_id)) => {
            serde_json::json!({ "orderId": order_id, "status": arg1 })
        }
        Some(v) => v,
        None => serde_json::json!({ "status": arg1 }),
    };
    let parsed: StatusUpdatePayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid status payload: {e}"))?;
    let order_id = parsed.order_id.trim().to_string();
    if order_id.is_empty() {
        return Err("Missing orderId".into());
    }
    let status = OrderStatus::parse(&parsed.status)
        .ok_or_else(|| format!("Unknown status: {}", parsed.status))?;
    Ok((order_id, status))
}

#[tauri::command]
pub async fn admin_orders_list(
    arg0: Option<Value>,
    arg1: Option<String>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Vec<Value>, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let status = payload_arg0_as_string(arg0, &["status"])
        .or(arg1)
        .and_then(|s| OrderStatus::parse(&s));
    admin::list_orders(&db, status).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn admin_order_update_status(
    arg0: Option<Value>,
    arg1: Option<String>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let (order_id, status) = parse_status_payload(arg0, arg1)?;
    admin::update_order_status(&db, &order_id, status).map_err(|e| e.to_string())?;

    let _ = app.emit(
        "order_status_updated",
        serde_json::json!({ "orderId": order_id, "status": status.as_str() }),
    );
    Ok(serde_json::json!({ "success": true, "orderId": order_id }))
}

#[tauri::command]
pub async fn admin_orders_bulk_update(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let (action, order_ids) = parse_bulk_payload(arg0)?;
    let outcome = admin::bulk_update(&db, action, &order_ids).map_err(|e| e.to_string())?;

    let outcome_json = serde_json::json!({
        "success": outcome.failed.is_empty(),
        "action": action,
        "successCount": outcome.succeeded.len(),
        "failedCount": outcome.failed.len(),
        "succeeded": outcome.succeeded,
        "failed": outcome.failed,
    });
    let _ = app.emit("orders_bulk_updated", outcome_json.clone());
    Ok(outcome_json)
}

// ---------------------------------------------------------------------------
// Catalog management
// ---------------------------------------------------------------------------

fn emit_menu_updated(app: &tauri::AppHandle) {
    let _ = app.emit("menu_updated", serde_json::json!({}));
}

#[tauri::command]
pub async fn admin_category_save(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let payload = arg0.ok_or("Missing category payload")?;
    let id = payload.get("id").and_then(Value::as_str);
    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .ok_or("Missing category name")?;
    let display_order = payload
        .get("displayOrder")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let category_id =
        admin::save_drink_category(&db, id, name, display_order).map_err(|e| e.to_string())?;
    emit_menu_updated(&app);
    Ok(serde_json::json!({ "success": true, "id": category_id }))
}

#[tauri::command]
pub async fn admin_drink_save(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let payload = arg0.ok_or("Missing drink payload")?;
    let input: admin::DrinkInput =
        serde_json::from_value(payload).map_err(|e| format!("Invalid drink payload: {e}"))?;
    let drink_id = admin::save_drink(&db, &input).map_err(|e| e.to_string())?;
    emit_menu_updated(&app);
    Ok(serde_json::json!({ "success": true, "id": drink_id }))
}

#[tauri::command]
pub async fn admin_drink_set_active(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let payload = arg0.ok_or("Missing payload")?;
    let drink_id = payload
        .get("drinkId")
        .or_else(|| payload.get("id"))
        .and_then(Value::as_str)
        .ok_or("Missing drinkId")?;
    let active = payload
        .get("active")
        .and_then(Value::as_bool)
        .ok_or("Missing active flag")?;
    admin::set_drink_active(&db, drink_id, active).map_err(|e| e.to_string())?;
    emit_menu_updated(&app);
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn admin_option_category_save(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let payload = arg0.ok_or("Missing option category payload")?;
    let id = payload.get("id").and_then(Value::as_str);
    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .ok_or("Missing option category name")?;
    let required = payload
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let display_order = payload
        .get("displayOrder")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let category_id = admin::save_option_category(&db, id, name, required, display_order)
        .map_err(|e| e.to_string())?;
    emit_menu_updated(&app);
    Ok(serde_json::json!({ "success": true, "id": category_id }))
}

#[tauri::command]
pub async fn admin_option_value_save(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let payload = arg0.ok_or("Missing option value payload")?;
    let id = payload.get("id").and_then(Value::as_str);
    let category_id = payload
        .get("optionCategoryId")
        .or_else(|| payload.get("categoryId"))
        .and_then(Value::as_str)
        .ok_or("Missing optionCategoryId")?;
    let value = payload
        .get("value")
        .and_then(Value::as_str)
        .ok_or("Missing value")?;
    let display_order = payload
        .get("displayOrder")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let value_id = admin::save_option_value(&db, id, category_id, value, display_order)
        .map_err(|e| e.to_string())?;
    emit_menu_updated(&app);
    Ok(serde_json::json!({ "success": true, "id": value_id }))
}

#[tauri::command]
pub async fn admin_drink_option_bind(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let payload = arg0.ok_or("Missing binding payload")?;
    let drink_id = payload
        .get("drinkId")
        .and_then(Value::as_str)
        .ok_or("Missing drinkId")?;
    let category_id = payload
        .get("optionCategoryId")
        .and_then(Value::as_str)
        .ok_or("Missing optionCategoryId")?;
    let default_value_id = payload.get("defaultValueId").and_then(Value::as_str);
    admin::bind_drink_option(&db, drink_id, category_id, default_value_id)
        .map_err(|e| e.to_string())?;
    emit_menu_updated(&app);
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn admin_drink_option_unbind(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let payload = arg0.ok_or("Missing binding payload")?;
    let drink_id = payload
        .get("drinkId")
        .and_then(Value::as_str)
        .ok_or("Missing drinkId")?;
    let category_id = payload
        .get("optionCategoryId")
        .and_then(Value::as_str)
        .ok_or("Missing optionCategoryId")?;
    admin::unbind_drink_option(&db, drink_id, category_id).map_err(|e| e.to_string())?;
    emit_menu_updated(&app);
    Ok(serde_json::json!({ "success": true }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_bulk_payload_resolves_action_and_ids() {
        let (action, ids) = parse_bulk_payload(Some(serde_json::json!({
            "action": "mark_ready",
            "orderIds": ["a", "b"]
        })))
        .expect("bulk payload");
        assert_eq!(action, admin::BulkAction::MarkReady);
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn parse_bulk_payload_rejects_empty_selection_and_unknown_action() {
        assert!(parse_bulk_payload(Some(serde_json::json!({
            "action": "mark_ready",
            "orderIds": []
        })))
        .is_err());
        assert!(parse_bulk_payload(Some(serde_json::json!({
            "action": "promote",
            "orderIds": ["a"]
        })))
        .is_err());
    }

    #[test]
    fn parse_status_payload_supports_both_shapes() {
        let (id, status) = parse_status_payload(
            Some(serde_json::json!({ "orderId": "o1", "status": "ready" })),
            None,
        )
        .expect("object shape");
        assert_eq!(id, "o1");
        assert_eq!(status, OrderStatus::Ready);

        let (id, status) =
            parse_status_payload(Some(serde_json::json!("o2")), Some("completed".to_string()))
                .expect("tuple shape");
        assert_eq!(id, "o2");
        assert_eq!(status, OrderStatus::Completed);
    }

    #[test]
    fn parse_status_payload_rejects_unknown_status() {
        assert!(parse_status_payload(
            Some(serde_json::json!({ "orderId": "o1", "status": "teleported" })),
            None
        )
        .is_err());
    }
}
