use crate::{db, names, orders, wizard};

/// Build the store-derived context for the wizard's current drink.
fn step_context(
    db_state: &db::DbState,
    state: &wizard::WizardState,
) -> Result<wizard::StepContext, String> {
    let drink_id = state.request.drink_id.trim();
    if drink_id.is_empty() {
        return Ok(wizard::StepContext::default());
    }
    let conn = db_state.conn.lock().map_err(|e| e.to_string())?;
    let drink_has_options =
        crate::menu::drink_has_options(&conn, drink_id).map_err(|e| e.to_string())?;
    let missing_required =
        orders::missing_required_categories(&conn, drink_id, &state.request.options)
            .map_err(|e| e.to_string())?;
    Ok(wizard::StepContext {
        drink_has_options,
        missing_required,
    })
}

fn parse_state(arg0: Option<serde_json::Value>) -> Result<wizard::WizardState, String> {
    let payload = arg0.ok_or("Missing wizard state")?;
    let normalized = payload.get("state").cloned().unwrap_or(payload);
    serde_json::from_value(normalized).map_err(|e| format!("Invalid wizard state: {e}"))
}

#[tauri::command]
pub async fn wizard_advance(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    let state = parse_state(arg0)?;
    let context = step_context(&db, &state)?;
    let next = wizard::advance(&state, &context).map_err(|e| e.to_string())?;
    Ok(serde_json::json!({ "step": next }))
}

#[tauri::command]
pub async fn wizard_back(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    let state = parse_state(arg0)?;
    let context = step_context(&db, &state)?;
    match wizard::back(state.step, context.drink_has_options) {
        Some(step) => Ok(serde_json::json!({ "step": step })),
        None => Err("Cannot go back from this step".to_string()),
    }
}

#[tauri::command]
pub async fn guest_name_generate() -> Result<serde_json::Value, String> {
    let name = names::generate_funny_guest_name();
    Ok(serde_json::json!({ "name": name, "generated": true }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;
    use crate::wizard::WizardStep;

    #[test]
    fn parse_state_accepts_wrapped_and_bare_shapes() {
        let bare = parse_state(Some(serde_json::json!({
            "step": "drink_selection",
            "request": { "drinkId": "d1", "guestName": "" }
        })))
        .expect("bare state");
        assert_eq!(bare.step, WizardStep::DrinkSelection);
        assert_eq!(bare.request.drink_id, "d1");

        let wrapped = parse_state(Some(serde_json::json!({
            "state": { "step": "review" }
        })))
        .expect("wrapped state");
        assert_eq!(wrapped.step, WizardStep::Review);
    }

    #[test]
    fn parse_state_rejects_unknown_steps() {
        assert!(parse_state(Some(serde_json::json!({ "step": "checkout" }))).is_err());
        assert!(parse_state(None).is_err());
    }
}
