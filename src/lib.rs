//! Beanline: café self-ordering kiosk with a barista dashboard.
//!
//! Guests browse the drink menu, walk a short wizard, and land in a shared
//! order queue stored in local SQLite. Baristas work the queue from the
//! dashboard (single and bulk status changes) and manage the catalog.
//! Realtime updates flow to all windows as Tauri events.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod admin;
mod auth;
mod commands;
mod config;
mod db;
mod diagnostics;
mod errors;
mod menu;
mod names;
mod orders;
mod retry;
mod wizard;

// ============================================================================
// Shared payload helpers
// ============================================================================

/// Extract a string from an invoke arg that may be a bare string or an
/// object carrying it under one of several keys.
pub(crate) fn payload_arg0_as_string(
    arg0: Option<serde_json::Value>,
    keys: &[&str],
) -> Option<String> {
    match arg0? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Object(obj) => keys
            .iter()
            .find_map(|k| obj.get(*k).and_then(|v| v.as_str()).map(|s| s.to_string())),
        _ => None,
    }
}

// ============================================================================
// App entry point
// ============================================================================

pub fn run() {
    // Structured logging: console + rolling daily file.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,beanline_lib=debug"));

    diagnostics::prune_old_logs();
    let log_dir = diagnostics::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "beanline");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // The guard flushes logs on drop; the app runs until process exit, so
    // keep it alive for the whole lifetime.
    std::mem::forget(guard);

    info!(
        "Starting Beanline v{} ({})",
        env!("CARGO_PKG_VERSION"),
        option_env!("BUILD_GIT_SHA").unwrap_or("unknown")
    );

    let app_config = config::Config::from_env();
    if app_config.telemetry_enabled {
        info!("Telemetry log events enabled");
    }

    tauri::Builder::default()
        .setup(move |app| {
            use std::sync::Arc;
            use tauri::Manager;

            let app_data_dir = app
                .path()
                .app_data_dir()
                .expect("Failed to get app data dir");

            // Main DB connection for Tauri commands
            let db_state = db::init(&app_data_dir).expect("Failed to initialize database");
            app.manage(db_state);

            // Password gates
            app.manage(auth::AuthState::from_config(&app_config));
            app.manage(app_config);

            // Second DB connection for the background queue monitor
            let db_for_monitor =
                Arc::new(db::init(&app_data_dir).expect("Failed to init queue monitor database"));
            commands::orders::start_queue_monitor(app.handle().clone(), db_for_monitor, 15);

            info!("Database, gates, and queue monitor registered");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Auth gates
            commands::auth::auth_login_guest,
            commands::auth::auth_login_admin,
            commands::auth::auth_logout,
            commands::auth::auth_get_session,
            commands::auth::auth_validate_session,
            commands::auth::auth_has_permission,
            commands::auth::auth_track_activity,
            // Menu
            commands::menu::menu_get_full,
            // Order wizard
            commands::wizard::wizard_advance,
            commands::wizard::wizard_back,
            commands::wizard::guest_name_generate,
            // Orders and queue
            commands::orders::order_submit,
            commands::orders::order_cancel,
            commands::orders::order_get_ahead,
            commands::orders::orders_get_mine,
            commands::orders::queue_get_snapshot,
            // Dashboard
            commands::admin::admin_orders_list,
            commands::admin::admin_order_update_status,
            commands::admin::admin_orders_bulk_update,
            // Catalog management
            commands::admin::admin_category_save,
            commands::admin::admin_drink_save,
            commands::admin::admin_drink_set_active,
            commands::admin::admin_option_category_save,
            commands::admin::admin_option_value_save,
            commands::admin::admin_drink_option_bind,
            commands::admin::admin_drink_option_unbind,
            // Settings and app info
            commands::settings::settings_get,
            commands::settings::settings_set,
            commands::settings::config_get,
            commands::settings::app_get_info,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
