use serde_json::Value;

use crate::{auth, config, db};

#[tauri::command]
pub async fn settings_get(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing settings payload")?;
    let category = payload
        .get("category")
        .and_then(Value::as_str)
        .ok_or("Missing category")?;
    let key = payload
        .get("key")
        .and_then(Value::as_str)
        .ok_or("Missing key")?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(match db::get_setting(&conn, category, key) {
        Some(value) => Value::String(value),
        None => Value::Null,
    })
}

#[tauri::command]
pub async fn settings_set(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    auth::require_admin(&auth_state).map_err(|e| e.to_string())?;
    let payload = arg0.ok_or("Missing settings payload")?;
    let category = payload
        .get("category")
        .and_then(Value::as_str)
        .ok_or("Missing category")?;
    let key = payload
        .get("key")
        .and_then(Value::as_str)
        .ok_or("Missing key")?;
    let value = payload
        .get("value")
        .and_then(Value::as_str)
        .ok_or("Missing value")?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    db::set_setting(&conn, category, key, value)?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn config_get(
    config: tauri::State<'_, config::Config>,
) -> Result<Value, String> {
    Ok(serde_json::json!({
        "waitMinutesPerOrder": config.wait_minutes_per_order,
        "guestBypass": config.guest_bypass,
        "telemetryEnabled": config.telemetry_enabled,
    }))
}

#[tauri::command]
pub async fn app_get_info(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "gitSha": option_env!("BUILD_GIT_SHA").unwrap_or("unknown"),
        "dbPath": db.db_path.display().to_string(),
    }))
}
