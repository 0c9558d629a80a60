use crate::{db, menu, retry};

#[tauri::command]
pub async fn menu_get_full(
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    retry::with_retry("menu_get_full", retry::RetryPolicy::default(), 0, || async {
        menu::get_menu(&db)
    })
    .await
    .map_err(|e| e.to_string())
}
