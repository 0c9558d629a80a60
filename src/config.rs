//! Environment-driven startup configuration.
//!
//! All knobs are read once in `run()` and held as immutable Tauri managed
//! state. Gate passwords are kept in `Zeroizing` wrappers so they are wiped
//! when the process tears the config down.

use zeroize::Zeroizing;

/// Env var names.
const ENV_GUEST_PASSWORD: &str = "BEANLINE_GUEST_PASSWORD";
const ENV_ADMIN_PASSWORD: &str = "BEANLINE_ADMIN_PASSWORD";
const ENV_WAIT_MINUTES: &str = "BEANLINE_WAIT_MINUTES";
const ENV_GUEST_BYPASS: &str = "BEANLINE_GUEST_BYPASS";
const ENV_TELEMETRY: &str = "BEANLINE_TELEMETRY";

/// Default per-order wait multiplier (minutes) when the env var is unset
/// or unparseable.
pub const DEFAULT_WAIT_MINUTES: u32 = 4;

/// Process-wide immutable configuration.
pub struct Config {
    pub guest_password: Zeroizing<String>,
    pub admin_password: Zeroizing<String>,
    /// Minutes of estimated wait contributed by each pending order.
    pub wait_minutes_per_order: u32,
    /// When set, the guest password gate is skipped entirely.
    pub guest_bypass: bool,
    /// Enables telemetry log events (no-op spans when disabled).
    pub telemetry_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            guest_password: Zeroizing::new(env_string(ENV_GUEST_PASSWORD)),
            admin_password: Zeroizing::new(env_string(ENV_ADMIN_PASSWORD)),
            wait_minutes_per_order: std::env::var(ENV_WAIT_MINUTES)
                .ok()
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_WAIT_MINUTES),
            guest_bypass: env_flag(ENV_GUEST_BYPASS).unwrap_or(false),
            telemetry_enabled: env_flag(ENV_TELEMETRY).unwrap_or(false),
        }
    }
}

fn env_string(key: &str) -> String {
    std::env::var(key)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Normalize a boolean-ish env value. Accepts the same spellings the
/// frontend settings bridge historically produced.
fn env_flag(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    let lower = raw.trim().to_ascii_lowercase();
    if lower == "true" || lower == "1" || lower == "yes" || lower == "on" {
        Some(true)
    } else if lower == "false" || lower == "0" || lower == "no" || lower == "off" {
        Some(false)
    } else {
        None
    }
}
