//! Order workflows: submission, queue position, wait estimate, cancellation.
//!
//! `submit_order` validates everything before acquiring the connection
//! lock, inserts the order row with status `pending`, computes the queue
//! number inside the same store (the one serialization point shared by all
//! windows), then performs two best-effort writes: stamping the queue
//! number onto the row and recording the chosen option rows. Failures of
//! the best-effort steps never fail the order; they are logged and
//! reported in the confirmation's `degraded` list so the frontend can show
//! a degraded-success banner.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbState;
use crate::errors::OrderError;

/// Guests may self-cancel only this long after placing an order.
pub const CANCELLATION_WINDOW_MINUTES: i64 = 30;

const GUEST_NAME_MIN: usize = 2;
const GUEST_NAME_MAX: usize = 50;
const SPECIAL_REQUEST_MAX: usize = 500;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "ready" => Some(OrderStatus::Ready),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Submission payload accumulated by the order wizard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderRequest {
    #[serde(default, alias = "drink_id")]
    pub drink_id: String,
    #[serde(default, alias = "guest_name")]
    pub guest_name: String,
    /// option_category_id -> option_value_id
    #[serde(default)]
    pub options: HashMap<String, String>,
    #[serde(default, alias = "special_request")]
    pub special_request: Option<String>,
}

/// Result of a successful (possibly degraded) submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: String,
    pub queue_number: i64,
    pub estimated_wait: String,
    /// Best-effort steps that failed: "queue_number", "order_options".
    pub degraded: Vec<String>,
}

/// A pending order ahead of a given one, with its drink's prep time.
/// Feeds the dashboard display; the wait estimate deliberately does not
/// use it (the constant multiplier is the documented behavior).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAhead {
    pub order_id: String,
    pub drink_name: String,
    pub preparation_minutes: i64,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate and normalize a guest name: trimmed, 2..=50 chars, letters,
/// whitespace, apostrophes and hyphens only.
pub fn validate_guest_name(name: &str) -> Result<String, OrderError> {
    let trimmed = name.trim();
    if trimmed.len() < GUEST_NAME_MIN {
        return Err(OrderError::validation(format!(
            "Name must be at least {GUEST_NAME_MIN} characters"
        )));
    }
    if trimmed.len() > GUEST_NAME_MAX {
        return Err(OrderError::validation(format!(
            "Name must be at most {GUEST_NAME_MAX} characters"
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '\'' || c == '-')
    {
        return Err(OrderError::validation(
            "Name may only contain letters, spaces, apostrophes, and hyphens",
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_special_request(request: Option<&str>) -> Result<Option<String>, OrderError> {
    match request.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.len() > SPECIAL_REQUEST_MAX => Err(OrderError::validation(format!(
            "Special request must be at most {SPECIAL_REQUEST_MAX} characters"
        ))),
        Some(text) => Ok(Some(text.to_string())),
    }
}

/// Required option categories bound to the drink that have no selection.
pub(crate) fn missing_required_categories(
    conn: &Connection,
    drink_id: &str,
    selections: &HashMap<String, String>,
) -> Result<Vec<String>, OrderError> {
    let mut stmt = conn.prepare(
        "SELECT oc.id, oc.name
         FROM drink_options dopt
         JOIN option_categories oc ON oc.id = dopt.option_category_id
         WHERE dopt.drink_id = ?1 AND oc.required = 1",
    )?;
    let rows = stmt.query_map(params![drink_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut missing = Vec::new();
    for row in rows {
        let (category_id, name) = row?;
        let selected = selections
            .get(&category_id)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        if !selected {
            missing.push(name);
        }
    }
    Ok(missing)
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Submit a guest order. See module docs for the workflow shape.
pub fn submit_order(
    db: &DbState,
    wait_minutes_per_order: u32,
    request: &SubmitOrderRequest,
) -> Result<OrderConfirmation, OrderError> {
    // Input validation happens before any store access.
    if request.drink_id.trim().is_empty() {
        return Err(OrderError::validation("Please select a drink"));
    }
    let guest_name = validate_guest_name(&request.guest_name)?;
    let special_request = validate_special_request(request.special_request.as_deref())?;
    let drink_id = request.drink_id.trim().to_string();

    let conn = db.conn.lock()?;

    let drink_active: Option<bool> = conn
        .query_row(
            "SELECT active FROM drinks WHERE id = ?1",
            params![drink_id],
            |row| row.get::<_, i64>(0).map(|v| v != 0),
        )
        .optional()?;
    match drink_active {
        Some(true) => {}
        Some(false) | None => {
            return Err(OrderError::validation("Selected drink is not available"));
        }
    }

    let missing = missing_required_categories(&conn, &drink_id, &request.options)?;
    if !missing.is_empty() {
        return Err(OrderError::validation(format!(
            "Please choose: {}",
            missing.join(", ")
        )));
    }

    let order_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let mut degraded: Vec<String> = Vec::new();

    conn.execute(
        "INSERT INTO orders (id, guest_name, drink_id, status, special_request, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?5)",
        params![order_id, guest_name, drink_id, special_request, now],
    )?;

    // Queue number: position among pending orders by creation time. The
    // freshly inserted row is counted, so the position is always >= 1.
    let queue_number = match queue_position(&conn, &now) {
        Ok(position) => {
            let stamped = conn.execute(
                "UPDATE orders SET queue_number = ?1, updated_at = ?2 WHERE id = ?3",
                params![position, Utc::now().to_rfc3339(), order_id],
            );
            if let Err(e) = stamped {
                warn!(order_id = %order_id, error = %e, "queue number update failed");
                degraded.push("queue_number".to_string());
            }
            position
        }
        Err(e) => {
            warn!(order_id = %order_id, error = %e, "queue position query failed");
            degraded.push("queue_number".to_string());
            0
        }
    };

    // Option rows are best-effort: the order row is the source of truth.
    let mut any_option_failed = false;
    for (category_id, value_id) in &request.options {
        if value_id.trim().is_empty() {
            continue;
        }
        let inserted = conn.execute(
            "INSERT INTO order_options (id, order_id, option_category_id, option_value_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                Uuid::new_v4().to_string(),
                order_id,
                category_id,
                value_id.trim()
            ],
        );
        if let Err(e) = inserted {
            warn!(
                order_id = %order_id,
                option_category_id = %category_id,
                error = %e,
                "order option insert failed"
            );
            any_option_failed = true;
        }
    }
    if any_option_failed {
        degraded.push("order_options".to_string());
    }

    info!(
        order_id = %order_id,
        queue_number,
        degraded = ?degraded,
        "order submitted"
    );

    Ok(OrderConfirmation {
        order_id,
        queue_number,
        estimated_wait: estimate_wait(queue_number, wait_minutes_per_order),
        degraded,
    })
}

/// Position among pending orders ordered by creation time: the count of
/// pending rows created at or before `created_at`.
pub fn queue_position(conn: &Connection, created_at: &str) -> Result<i64, OrderError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM orders WHERE status = 'pending' AND created_at <= ?1",
        params![created_at],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Estimated wait string: `max(1, queue_number) * wait_minutes_per_order`.
pub fn estimate_wait(queue_number: i64, wait_minutes_per_order: u32) -> String {
    let minutes = queue_number.max(1) * i64::from(wait_minutes_per_order);
    format!("{minutes} minutes")
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Guest self-cancellation. Every precondition failure yields its own
/// typed message and performs no mutation.
pub fn cancel_order(db: &DbState, order_id: &str, guest_name: &str) -> Result<(), OrderError> {
    let requester = guest_name.trim();
    if requester.is_empty() {
        return Err(OrderError::validation("Name is required to cancel"));
    }

    let conn = db.conn.lock()?;

    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT guest_name, status, created_at FROM orders WHERE id = ?1",
            params![order_id.trim()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let (owner, status, created_at) = match row {
        Some(r) => r,
        None => return Err(OrderError::validation("Order not found")),
    };

    if !owner.trim().eq_ignore_ascii_case(requester) {
        return Err(OrderError::permission(
            "This order belongs to a different guest",
        ));
    }
    if status != OrderStatus::Pending.as_str() {
        return Err(OrderError::validation(
            "Only pending orders can be cancelled",
        ));
    }

    let placed_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OrderError::database(format!("order timestamp unreadable: {e}")))?;
    if Utc::now() - placed_at > Duration::minutes(CANCELLATION_WINDOW_MINUTES) {
        return Err(OrderError::validation(format!(
            "Orders can only be cancelled within {CANCELLATION_WINDOW_MINUTES} minutes of placing them"
        )));
    }

    conn.execute(
        "UPDATE orders SET status = 'cancelled', updated_at = ?1 WHERE id = ?2",
        params![Utc::now().to_rfc3339(), order_id.trim()],
    )?;

    info!(order_id = %order_id.trim(), "order cancelled by guest");
    Ok(())
}

// ---------------------------------------------------------------------------
// Queue readers
// ---------------------------------------------------------------------------

/// Pending orders ahead of `order_id` (created strictly earlier), with
/// each drink's preparation minutes.
pub fn orders_ahead(db: &DbState, order_id: &str) -> Result<Vec<OrderAhead>, OrderError> {
    let conn = db.conn.lock()?;

    let created_at: Option<String> = conn
        .query_row(
            "SELECT created_at FROM orders WHERE id = ?1",
            params![order_id.trim()],
            |row| row.get(0),
        )
        .optional()?;
    let created_at = match created_at {
        Some(ts) => ts,
        None => return Err(OrderError::validation("Order not found")),
    };

    let mut stmt = conn.prepare(
        "SELECT o.id, d.name, d.preparation_minutes, o.created_at
         FROM orders o
         JOIN drinks d ON d.id = o.drink_id
         WHERE o.status = 'pending' AND o.created_at < ?1
         ORDER BY o.created_at ASC",
    )?;
    let rows = stmt.query_map(params![created_at], |row| {
        Ok(OrderAhead {
            order_id: row.get(0)?,
            drink_name: row.get(1)?,
            preparation_minutes: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;

    let mut ahead = Vec::new();
    for row in rows {
        ahead.push(row?);
    }
    Ok(ahead)
}

/// Orders placed by a guest (case-insensitive name match), newest first,
/// as the JSON shape the frontend renders.
pub fn orders_for_guest(
    db: &DbState,
    guest_name: &str,
) -> Result<Vec<serde_json::Value>, OrderError> {
    let conn = db.conn.lock()?;
    let mut stmt = conn.prepare(
        "SELECT o.id, o.guest_name, d.name, o.status, o.queue_number, o.special_request,
                o.created_at, o.updated_at
         FROM orders o
         JOIN drinks d ON d.id = o.drink_id
         WHERE lower(trim(o.guest_name)) = lower(trim(?1))
         ORDER BY o.created_at DESC",
    )?;
    let rows = stmt.query_map(params![guest_name], order_row_json)?;

    let mut orders = Vec::new();
    for row in rows {
        orders.push(row?);
    }
    Ok(orders)
}

/// Snapshot of the pending queue for the dashboard and the queue monitor.
pub fn queue_snapshot(db: &DbState) -> Result<serde_json::Value, OrderError> {
    let conn = db.conn.lock()?;
    let mut stmt = conn.prepare(
        "SELECT o.id, o.guest_name, d.name, o.queue_number, o.created_at
         FROM orders o
         JOIN drinks d ON d.id = o.drink_id
         WHERE o.status = 'pending'
         ORDER BY o.created_at ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(serde_json::json!({
            "orderId": row.get::<_, String>(0)?,
            "guestName": row.get::<_, String>(1)?,
            "drinkName": row.get::<_, String>(2)?,
            "queueNumber": row.get::<_, Option<i64>>(3)?,
            "createdAt": row.get::<_, String>(4)?,
        }))
    })?;

    let mut pending = Vec::new();
    for row in rows {
        pending.push(row?);
    }
    Ok(serde_json::json!({
        "pendingCount": pending.len(),
        "orders": pending,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn order_row_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<serde_json::Value> {
    Ok(serde_json::json!({
        "id": row.get::<_, String>(0)?,
        "guestName": row.get::<_, String>(1)?,
        "drinkName": row.get::<_, String>(2)?,
        "status": row.get::<_, String>(3)?,
        "queueNumber": row.get::<_, Option<i64>>(4)?,
        "specialRequest": row.get::<_, Option<String>>(5)?,
        "createdAt": row.get::<_, String>(6)?,
        "updatedAt": row.get::<_, String>(7)?,
    }))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::errors::ErrorKind;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn test_db_state() -> DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;").expect("fk");
        db::run_migrations_for_test(&conn);
        conn.execute_batch(
            "INSERT INTO drink_categories (id, name, display_order) VALUES ('cat-coffee', 'Coffee', 1);
             INSERT INTO drinks (id, category_id, name, preparation_minutes, active)
                 VALUES ('drink-latte', 'cat-coffee', 'Latte', 4, 1),
                        ('drink-espresso', 'cat-coffee', 'Espresso', 2, 1),
                        ('drink-retired', 'cat-coffee', 'Pumpkin Latte', 3, 0);
             INSERT INTO option_categories (id, name, required) VALUES ('opt-milk', 'Milk', 1);
             INSERT INTO option_values (id, option_category_id, value)
                 VALUES ('val-oat', 'opt-milk', 'Oat'), ('val-whole', 'opt-milk', 'Whole');
             INSERT INTO drink_options (id, drink_id, option_category_id, default_value_id)
                 VALUES ('do-1', 'drink-latte', 'opt-milk', 'val-whole');",
        )
        .expect("seed catalog");
        DbState {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        }
    }

    fn latte_request(name: &str) -> SubmitOrderRequest {
        let mut options = HashMap::new();
        options.insert("opt-milk".to_string(), "val-oat".to_string());
        SubmitOrderRequest {
            drink_id: "drink-latte".to_string(),
            guest_name: name.to_string(),
            options,
            special_request: None,
        }
    }

    fn order_count(db: &DbState) -> i64 {
        let conn = db.conn.lock().expect("lock");
        conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .expect("count")
    }

    // -- name validation ----------------------------------------------------

    #[test]
    fn name_too_short_is_rejected() {
        let err = validate_guest_name("A").expect_err("short name");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("at least 2"));
    }

    #[test]
    fn name_too_long_is_rejected() {
        let long = "A".repeat(51);
        let err = validate_guest_name(&long).expect_err("long name");
        assert!(err.message().contains("at most 50"));
    }

    #[test]
    fn name_with_unsupported_characters_is_rejected() {
        for bad in ["Ada99", "Ada!", "Ada_Lovelace", "Ada@cafe"] {
            let err = validate_guest_name(bad).expect_err("bad chars");
            assert!(err.message().contains("may only contain"), "for {bad}");
        }
    }

    #[test]
    fn hyphenated_and_apostrophe_names_pass() {
        assert_eq!(
            validate_guest_name("  Mary-Jane O'Brien ").expect("valid"),
            "Mary-Jane O'Brien"
        );
    }

    // -- submission ---------------------------------------------------------

    #[test]
    fn submit_without_drink_never_reaches_the_store() {
        let db = test_db_state();
        let request = SubmitOrderRequest {
            drink_id: "  ".to_string(),
            guest_name: "Ada".to_string(),
            ..Default::default()
        };
        let err = submit_order(&db, 4, &request).expect_err("no drink");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "Please select a drink");
        assert_eq!(order_count(&db), 0);
    }

    #[test]
    fn submit_inactive_drink_is_rejected() {
        let db = test_db_state();
        let request = SubmitOrderRequest {
            drink_id: "drink-retired".to_string(),
            guest_name: "Ada".to_string(),
            ..Default::default()
        };
        let err = submit_order(&db, 4, &request).expect_err("inactive drink");
        assert_eq!(err.message(), "Selected drink is not available");
        assert_eq!(order_count(&db), 0);
    }

    #[test]
    fn submit_without_required_option_is_rejected() {
        let db = test_db_state();
        let request = SubmitOrderRequest {
            drink_id: "drink-latte".to_string(),
            guest_name: "Ada".to_string(),
            ..Default::default()
        };
        let err = submit_order(&db, 4, &request).expect_err("missing milk");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("Milk"));
        assert_eq!(order_count(&db), 0);
    }

    #[test]
    fn submit_happy_path_records_order_and_options() {
        let db = test_db_state();
        let confirmation = submit_order(&db, 4, &latte_request("Ada")).expect("submit");
        assert_eq!(confirmation.queue_number, 1);
        assert_eq!(confirmation.estimated_wait, "4 minutes");
        assert!(confirmation.degraded.is_empty());

        let conn = db.conn.lock().expect("lock");
        let (status, queue_number): (String, Option<i64>) = conn
            .query_row(
                "SELECT status, queue_number FROM orders WHERE id = ?1",
                params![confirmation.order_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("order row");
        assert_eq!(status, "pending");
        assert_eq!(queue_number, Some(1));

        let options: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM order_options WHERE order_id = ?1",
                params![confirmation.order_id],
                |row| row.get(0),
            )
            .expect("option count");
        assert_eq!(options, 1);
    }

    #[test]
    fn queue_numbers_increase_with_pending_orders() {
        let db = test_db_state();
        let first = submit_order(&db, 4, &latte_request("Ada")).expect("first");
        let second = submit_order(&db, 4, &latte_request("Grace")).expect("second");
        assert_eq!(first.queue_number, 1);
        assert_eq!(second.queue_number, 2);
        assert_eq!(second.estimated_wait, "8 minutes");
    }

    #[test]
    fn cancelled_orders_do_not_count_toward_queue_position() {
        let db = test_db_state();
        let first = submit_order(&db, 4, &latte_request("Ada")).expect("first");
        cancel_order(&db, &first.order_id, "Ada").expect("cancel");
        let second = submit_order(&db, 4, &latte_request("Grace")).expect("second");
        assert_eq!(second.queue_number, 1);
    }

    #[test]
    fn bad_option_reference_degrades_but_creates_order() {
        let db = test_db_state();
        let mut request = latte_request("Ada");
        request
            .options
            .insert("opt-milk".to_string(), "val-nonexistent".to_string());
        let confirmation = submit_order(&db, 4, &request).expect("degraded submit");
        assert_eq!(confirmation.degraded, vec!["order_options".to_string()]);
        assert_eq!(order_count(&db), 1);
    }

    // -- wait estimate ------------------------------------------------------

    #[test]
    fn wait_estimate_multiplies_queue_number() {
        assert_eq!(estimate_wait(3, 4), "12 minutes");
    }

    #[test]
    fn wait_estimate_floors_at_one_order() {
        assert_eq!(estimate_wait(0, 4), "4 minutes");
    }

    // -- cancellation -------------------------------------------------------

    #[test]
    fn cancel_succeeds_for_owner_within_window() {
        let db = test_db_state();
        let confirmation = submit_order(&db, 4, &latte_request("Ada")).expect("submit");
        cancel_order(&db, &confirmation.order_id, "  ada ").expect("case-insensitive cancel");

        let conn = db.conn.lock().expect("lock");
        let status: String = conn
            .query_row(
                "SELECT status FROM orders WHERE id = ?1",
                params![confirmation.order_id],
                |row| row.get(0),
            )
            .expect("status");
        assert_eq!(status, "cancelled");
    }

    #[test]
    fn cancel_unknown_order_fails() {
        let db = test_db_state();
        let err = cancel_order(&db, "nope", "Ada").expect_err("unknown order");
        assert_eq!(err.message(), "Order not found");
    }

    #[test]
    fn cancel_by_wrong_guest_is_a_permission_error() {
        let db = test_db_state();
        let confirmation = submit_order(&db, 4, &latte_request("Ada")).expect("submit");
        let err = cancel_order(&db, &confirmation.order_id, "Grace").expect_err("wrong guest");
        assert_eq!(err.kind(), ErrorKind::Permission);

        let conn = db.conn.lock().expect("lock");
        let status: String = conn
            .query_row(
                "SELECT status FROM orders WHERE id = ?1",
                params![confirmation.order_id],
                |row| row.get(0),
            )
            .expect("status");
        assert_eq!(status, "pending", "no mutation on failed cancel");
    }

    #[test]
    fn cancel_non_pending_order_fails() {
        let db = test_db_state();
        let confirmation = submit_order(&db, 4, &latte_request("Ada")).expect("submit");
        {
            let conn = db.conn.lock().expect("lock");
            conn.execute(
                "UPDATE orders SET status = 'ready' WHERE id = ?1",
                params![confirmation.order_id],
            )
            .expect("mark ready");
        }
        let err = cancel_order(&db, &confirmation.order_id, "Ada").expect_err("ready order");
        assert_eq!(err.message(), "Only pending orders can be cancelled");
    }

    #[test]
    fn cancel_outside_window_fails() {
        let db = test_db_state();
        let confirmation = submit_order(&db, 4, &latte_request("Ada")).expect("submit");
        {
            let conn = db.conn.lock().expect("lock");
            let stale = (Utc::now() - Duration::minutes(CANCELLATION_WINDOW_MINUTES + 1))
                .to_rfc3339();
            conn.execute(
                "UPDATE orders SET created_at = ?1 WHERE id = ?2",
                params![stale, confirmation.order_id],
            )
            .expect("age order");
        }
        let err = cancel_order(&db, &confirmation.order_id, "Ada").expect_err("too old");
        assert!(err.message().contains("within 30 minutes"));
    }

    // -- queue readers ------------------------------------------------------

    #[test]
    fn orders_ahead_reports_prep_minutes_of_earlier_orders() {
        let db = test_db_state();
        let first = submit_order(&db, 4, &latte_request("Ada")).expect("first");
        // Push the second order's created_at strictly later than the first.
        {
            let conn = db.conn.lock().expect("lock");
            let later = (Utc::now() + Duration::seconds(2)).to_rfc3339();
            conn.execute(
                "INSERT INTO orders (id, guest_name, drink_id, status, created_at, updated_at)
                 VALUES ('order-2', 'Grace', 'drink-espresso', 'pending', ?1, ?1)",
                params![later],
            )
            .expect("insert second");
        }

        let ahead = orders_ahead(&db, "order-2").expect("orders ahead");
        assert_eq!(ahead.len(), 1);
        assert_eq!(ahead[0].order_id, first.order_id);
        assert_eq!(ahead[0].drink_name, "Latte");
        assert_eq!(ahead[0].preparation_minutes, 4);
    }

    #[test]
    fn guest_order_listing_matches_name_case_insensitively() {
        let db = test_db_state();
        submit_order(&db, 4, &latte_request("Ada")).expect("submit");
        let mine = orders_for_guest(&db, "ADA").expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["drinkName"], "Latte");
        assert!(orders_for_guest(&db, "Grace").expect("empty").is_empty());
    }
}
