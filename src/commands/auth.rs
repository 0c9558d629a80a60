use serde_json::Value;

use crate::{auth, db, payload_arg0_as_string};

#[tauri::command]
pub async fn auth_login_guest(
    arg0: Option<Value>,
    arg1: Option<String>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    let password = payload_arg0_as_string(arg0, &["password"])
        .or(arg1)
        .unwrap_or_default();
    auth::login_guest(&password, &db, &auth_state).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn auth_login_admin(
    arg0: Option<Value>,
    arg1: Option<String>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    let password = payload_arg0_as_string(arg0, &["password"])
        .or(arg1)
        .ok_or("Missing password")?;
    auth::login_admin(&password, &db, &auth_state).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn auth_logout(auth_state: tauri::State<'_, auth::AuthState>) -> Result<Value, String> {
    auth::logout(&auth_state);
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn auth_get_session(
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    Ok(auth::get_session_json(&auth_state))
}

#[tauri::command]
pub async fn auth_validate_session(
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    Ok(auth::validate_session(&auth_state))
}

#[tauri::command]
pub async fn auth_has_permission(
    arg0: Option<Value>,
    arg1: Option<String>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<bool, String> {
    let permission = payload_arg0_as_string(arg0, &["permission"]).or(arg1);
    Ok(auth::has_permission(&auth_state, permission.as_deref()))
}

#[tauri::command]
pub async fn auth_track_activity(
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    auth::track_activity(&auth_state);
    Ok(serde_json::json!({ "success": true }))
}
