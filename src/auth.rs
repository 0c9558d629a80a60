//! Password gates for the guest ordering flow and the admin dashboard.
//!
//! Passwords arrive through the environment (`Config`) and are bcrypt-
//! hashed once at startup; only the hashes live in `AuthState`. Sessions
//! are in-memory. Failed attempts feed a lockout counter persisted in
//! `local_settings` (category "gate") so restarting the app does not
//! reset it.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::errors::OrderError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAX_FAILED_ATTEMPTS: u32 = 5;
const LOCKOUT_MINUTES: i64 = 15;
const SESSION_INACTIVITY_MINUTES: i64 = 60;
const SESSION_MAX_DURATION_HOURS: i64 = 12;
const LOCKOUT_ATTEMPTS_KEY: &str = "lockout_attempts";
const LOCKOUT_LAST_ATTEMPT_KEY: &str = "lockout_last_attempt";

const ADMIN_PERMISSIONS: &[&str] = &[
    "place_order",
    "cancel_own_order",
    "view_queue",
    "view_all_orders",
    "update_order_status",
    "bulk_update_orders",
    "manage_menu",
];

const GUEST_PERMISSIONS: &[&str] = &["place_order", "cancel_own_order", "view_queue"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct GateSession {
    session_id: String,
    role: String,
    permissions: Vec<String>,
    login_time: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl GateSession {
    fn is_expired(&self) -> bool {
        let now = Utc::now();
        if now >= self.expires_at {
            return true;
        }
        now - self.last_activity > Duration::minutes(SESSION_INACTIVITY_MINUTES)
    }

    fn to_user_json(&self) -> Value {
        serde_json::json!({
            "sessionId": self.session_id,
            "role": {
                "name": self.role,
                "permissions": self.permissions,
            },
            "loginTime": self.login_time.to_rfc3339(),
            "expiresAt": self.expires_at.to_rfc3339(),
        })
    }
}

struct LockoutEntry {
    attempts: u32,
    last_attempt: DateTime<Utc>,
}

/// Tauri managed state for the password gates.
pub struct AuthState {
    guest_hash: Option<String>,
    admin_hash: Option<String>,
    guest_bypass: bool,
    sessions: Mutex<HashMap<String, GateSession>>,
    current_session_id: Mutex<Option<String>>,
    lockout: Mutex<LockoutEntry>,
}

impl AuthState {
    /// Hash the configured passwords once. An unset guest password leaves
    /// the guest gate open; an unset admin password keeps the dashboard
    /// closed entirely.
    pub fn from_config(config: &Config) -> Self {
        let hash_nonempty = |password: &str| {
            if password.is_empty() {
                None
            } else {
                bcrypt::hash(password, bcrypt::DEFAULT_COST).ok()
            }
        };
        Self {
            guest_hash: hash_nonempty(&config.guest_password),
            admin_hash: hash_nonempty(&config.admin_password),
            guest_bypass: config.guest_bypass,
            sessions: Mutex::new(HashMap::new()),
            current_session_id: Mutex::new(None),
            lockout: Mutex::new(LockoutEntry {
                attempts: 0,
                last_attempt: Utc::now(),
            }),
        }
    }

    #[cfg(test)]
    fn for_test(guest: Option<&str>, admin: Option<&str>, guest_bypass: bool) -> Self {
        // Cost 4 keeps the hashing fast in tests.
        let hash = |p: &str| bcrypt::hash(p, 4).expect("test hash");
        Self {
            guest_hash: guest.map(hash),
            admin_hash: admin.map(hash),
            guest_bypass,
            sessions: Mutex::new(HashMap::new()),
            current_session_id: Mutex::new(None),
            lockout: Mutex::new(LockoutEntry {
                attempts: 0,
                last_attempt: Utc::now(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Lockout helpers
// ---------------------------------------------------------------------------

fn check_lockout(lockout: &LockoutEntry) -> Result<(), OrderError> {
    if lockout.attempts >= MAX_FAILED_ATTEMPTS {
        let elapsed = Utc::now() - lockout.last_attempt;
        if elapsed < Duration::minutes(LOCKOUT_MINUTES) {
            let remaining = LOCKOUT_MINUTES - elapsed.num_minutes();
            return Err(OrderError::Authentication(format!(
                "Too many failed attempts. Try again in {remaining} minute(s)."
            )));
        }
    }
    Ok(())
}

fn record_failure(lockout: &mut LockoutEntry) {
    lockout.attempts += 1;
    lockout.last_attempt = Utc::now();
    warn!(attempts = lockout.attempts, "failed gate attempt");
}

fn reset_lockout(lockout: &mut LockoutEntry) {
    lockout.attempts = 0;
    lockout.last_attempt = Utc::now();
}

fn load_lockout_from_db(conn: &rusqlite::Connection) -> LockoutEntry {
    let attempts = db::get_setting(conn, "gate", LOCKOUT_ATTEMPTS_KEY)
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    let last_attempt = db::get_setting(conn, "gate", LOCKOUT_LAST_ATTEMPT_KEY)
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    LockoutEntry {
        attempts,
        last_attempt,
    }
}

fn persist_lockout_to_db(conn: &rusqlite::Connection, lockout: &LockoutEntry) {
    let _ = db::set_setting(
        conn,
        "gate",
        LOCKOUT_ATTEMPTS_KEY,
        &lockout.attempts.to_string(),
    );
    let _ = db::set_setting(
        conn,
        "gate",
        LOCKOUT_LAST_ATTEMPT_KEY,
        &lockout.last_attempt.to_rfc3339(),
    );
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

fn create_session(auth: &AuthState, role: &str) -> Result<Value, OrderError> {
    let now = Utc::now();
    let permissions: Vec<String> = if role == "admin" {
        ADMIN_PERMISSIONS.iter().map(|s| s.to_string()).collect()
    } else {
        GUEST_PERMISSIONS.iter().map(|s| s.to_string()).collect()
    };

    let session = GateSession {
        session_id: Uuid::new_v4().to_string(),
        role: role.to_string(),
        permissions,
        login_time: now,
        last_activity: now,
        expires_at: now + Duration::hours(SESSION_MAX_DURATION_HOURS),
    };

    let user_json = session.to_user_json();
    let sid = session.session_id.clone();
    auth.sessions.lock()?.insert(sid.clone(), session);
    *auth.current_session_id.lock()? = Some(sid);

    Ok(serde_json::json!({ "success": true, "user": user_json }))
}

fn get_current_session(auth: &AuthState) -> Option<GateSession> {
    let current_id = auth.current_session_id.lock().ok()?.clone()?;
    let sessions = auth.sessions.lock().ok()?;
    let session = sessions.get(&current_id)?.clone();
    if session.is_expired() {
        return None;
    }
    Some(session)
}

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

/// Guest gate. Skipped outright under the bypass flag or when no guest
/// password is configured.
pub fn login_guest(
    password: &str,
    db_state: &db::DbState,
    auth: &AuthState,
) -> Result<Value, OrderError> {
    if auth.guest_bypass || auth.guest_hash.is_none() {
        info!("guest gate open, session created without password");
        return create_session(auth, "guest");
    }
    verify_gate(password, auth.guest_hash.as_deref(), "guest", db_state, auth)
}

/// Admin gate. Refuses outright when no admin password is configured.
pub fn login_admin(
    password: &str,
    db_state: &db::DbState,
    auth: &AuthState,
) -> Result<Value, OrderError> {
    if auth.admin_hash.is_none() {
        return Err(OrderError::Authentication(
            "Admin access is not configured".to_string(),
        ));
    }
    verify_gate(password, auth.admin_hash.as_deref(), "admin", db_state, auth)
}

fn verify_gate(
    password: &str,
    hash: Option<&str>,
    role: &str,
    db_state: &db::DbState,
    auth: &AuthState,
) -> Result<Value, OrderError> {
    if password.is_empty() {
        return Err(OrderError::validation("Password is required"));
    }

    let conn = db_state.conn.lock()?;

    {
        let mut lockout = auth.lockout.lock()?;
        *lockout = load_lockout_from_db(&conn);
        check_lockout(&lockout)?;
    }

    let verified = hash
        .map(|h| bcrypt::verify(password, h).unwrap_or(false))
        .unwrap_or(false);
    if verified {
        let mut lockout = auth.lockout.lock()?;
        reset_lockout(&mut lockout);
        persist_lockout_to_db(&conn, &lockout);
        info!(role, "gate login successful");
        return create_session(auth, role);
    }

    let mut lockout = auth.lockout.lock()?;
    record_failure(&mut lockout);
    persist_lockout_to_db(&conn, &lockout);
    Err(OrderError::Authentication("Invalid password".to_string()))
}

/// Invalidate the current session.
pub fn logout(auth: &AuthState) {
    if let Ok(mut current) = auth.current_session_id.lock() {
        if let Some(sid) = current.take() {
            if let Ok(mut sessions) = auth.sessions.lock() {
                sessions.remove(&sid);
            }
            info!(session_id = %sid, "session logged out");
        }
    }
}

/// The current session as JSON, or null.
pub fn get_session_json(auth: &AuthState) -> Value {
    match get_current_session(auth) {
        Some(s) => s.to_user_json(),
        None => Value::Null,
    }
}

/// Validate (and garbage-collect) the current session.
pub fn validate_session(auth: &AuthState) -> Value {
    match get_current_session(auth) {
        Some(_) => serde_json::json!({ "valid": true }),
        None => {
            if let Ok(mut current) = auth.current_session_id.lock() {
                if let Some(sid) = current.take() {
                    if let Ok(mut sessions) = auth.sessions.lock() {
                        sessions.remove(&sid);
                    }
                }
            }
            serde_json::json!({ "valid": false, "reason": "Session expired or not found" })
        }
    }
}

pub fn has_permission(auth: &AuthState, permission: Option<&str>) -> bool {
    let perm = match permission {
        Some(p) => p,
        None => return false,
    };
    match get_current_session(auth) {
        Some(s) => s.permissions.iter().any(|p| p == perm),
        None => false,
    }
}

/// Refresh the inactivity timer.
pub fn track_activity(auth: &AuthState) {
    let current_id = match auth.current_session_id.lock() {
        Ok(guard) => guard.clone(),
        Err(_) => return,
    };
    if let Some(sid) = current_id {
        if let Ok(mut sessions) = auth.sessions.lock() {
            if let Some(session) = sessions.get_mut(&sid) {
                session.last_activity = Utc::now();
            }
        }
    }
}

/// Gate for dashboard and catalog commands.
pub fn require_admin(auth: &AuthState) -> Result<(), OrderError> {
    match get_current_session(auth) {
        Some(s) if s.role == "admin" => Ok(()),
        Some(_) => Err(OrderError::permission("Admin access required")),
        None => Err(OrderError::Authentication(
            "Sign in to access the dashboard".to_string(),
        )),
    }
}

/// Gate for ordering commands. Admin sessions may also place orders.
pub fn require_guest(auth: &AuthState) -> Result<(), OrderError> {
    if auth.guest_bypass || auth.guest_hash.is_none() {
        return Ok(());
    }
    match get_current_session(auth) {
        Some(_) => Ok(()),
        None => Err(OrderError::Authentication(
            "Enter the café password to order".to_string(),
        )),
    }
}
