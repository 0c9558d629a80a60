//! Barista/admin operations: the dashboard order list, single and bulk
//! status changes, and catalog management.
//!
//! Bulk updates process each order id independently and report a per-id
//! tally. A missing order or a disallowed transition lands in `failed`
//! with its reason; it never aborts the rest of the batch and is never
//! swallowed.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db::DbState;
use crate::errors::OrderError;
use crate::orders::OrderStatus;

// ---------------------------------------------------------------------------
// Bulk order updates
// ---------------------------------------------------------------------------

/// Dashboard batch actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    MarkReady,
    MarkCompleted,
    Cancel,
    Delete,
}

impl BulkAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mark_ready" => Some(BulkAction::MarkReady),
            "mark_completed" => Some(BulkAction::MarkCompleted),
            "cancel" => Some(BulkAction::Cancel),
            "delete" => Some(BulkAction::Delete),
            _ => None,
        }
    }

    fn target_status(self) -> Option<OrderStatus> {
        match self {
            BulkAction::MarkReady => Some(OrderStatus::Ready),
            BulkAction::MarkCompleted => Some(OrderStatus::Completed),
            BulkAction::Cancel => Some(OrderStatus::Cancelled),
            BulkAction::Delete => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub order_id: String,
    pub reason: String,
}

/// Per-id result of a bulk update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<BulkFailure>,
}

/// Status changes a transition may start from. Completed orders are final;
/// cancelled orders can only be deleted.
fn transition_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    matches!(
        (from, to),
        (OrderStatus::Pending, OrderStatus::Ready)
            | (OrderStatus::Pending, OrderStatus::Completed)
            | (OrderStatus::Pending, OrderStatus::Cancelled)
            | (OrderStatus::Ready, OrderStatus::Completed)
            | (OrderStatus::Ready, OrderStatus::Cancelled)
    )
}

/// Apply `action` to every order id, independently.
pub fn bulk_update(
    db: &DbState,
    action: BulkAction,
    order_ids: &[String],
) -> Result<BulkOutcome, OrderError> {
    let conn = db.conn.lock()?;
    let mut outcome = BulkOutcome {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };

    for raw_id in order_ids {
        let order_id = raw_id.trim();
        if order_id.is_empty() {
            outcome.failed.push(BulkFailure {
                order_id: raw_id.clone(),
                reason: "Empty order id".to_string(),
            });
            continue;
        }
        match apply_action(&conn, action, order_id) {
            Ok(()) => outcome.succeeded.push(order_id.to_string()),
            Err(e) => outcome.failed.push(BulkFailure {
                order_id: order_id.to_string(),
                reason: e.message().to_string(),
            }),
        }
    }

    info!(
        action = ?action,
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "bulk order update"
    );
    Ok(outcome)
}

fn apply_action(conn: &Connection, action: BulkAction, order_id: &str) -> Result<(), OrderError> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM orders WHERE id = ?1",
            params![order_id],
            |row| row.get(0),
        )
        .optional()?;
    let current = match status.as_deref().and_then(OrderStatus::parse) {
        Some(s) => s,
        None => return Err(OrderError::validation("Order not found")),
    };

    match action.target_status() {
        Some(target) => {
            if !transition_allowed(current, target) {
                return Err(OrderError::validation(format!(
                    "Cannot move a {} order to {}",
                    current.as_str(),
                    target.as_str()
                )));
            }
            conn.execute(
                "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![target.as_str(), Utc::now().to_rfc3339(), order_id],
            )?;
        }
        None => {
            // Delete; order_options cascade.
            conn.execute("DELETE FROM orders WHERE id = ?1", params![order_id])?;
        }
    }
    Ok(())
}

/// Single-order status change with the same transition rules as bulk.
pub fn update_order_status(
    db: &DbState,
    order_id: &str,
    status: OrderStatus,
) -> Result<(), OrderError> {
    let action = match status {
        OrderStatus::Ready => BulkAction::MarkReady,
        OrderStatus::Completed => BulkAction::MarkCompleted,
        OrderStatus::Cancelled => BulkAction::Cancel,
        OrderStatus::Pending => {
            return Err(OrderError::validation(
                "Orders cannot be moved back to pending",
            ))
        }
    };
    let conn = db.conn.lock()?;
    apply_action(&conn, action, order_id.trim())
}

/// All orders for the dashboard, optionally filtered by status, with each
/// order's chosen options flattened to "Category: Value" strings.
pub fn list_orders(
    db: &DbState,
    status: Option<OrderStatus>,
) -> Result<Vec<serde_json::Value>, OrderError> {
    let conn = db.conn.lock()?;
    let mut stmt = conn.prepare(
        "SELECT o.id, o.guest_name, d.name, o.status, o.queue_number, o.special_request,
                o.created_at, o.updated_at
         FROM orders o
         JOIN drinks d ON d.id = o.drink_id
         WHERE (?1 IS NULL OR o.status = ?1)
         ORDER BY o.created_at ASC",
    )?;
    let rows = stmt.query_map(params![status.map(OrderStatus::as_str)], |row| {
        Ok((
            row.get::<_, String>(0)?,
            serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "guestName": row.get::<_, String>(1)?,
                "drinkName": row.get::<_, String>(2)?,
                "status": row.get::<_, String>(3)?,
                "queueNumber": row.get::<_, Option<i64>>(4)?,
                "specialRequest": row.get::<_, Option<String>>(5)?,
                "createdAt": row.get::<_, String>(6)?,
                "updatedAt": row.get::<_, String>(7)?,
            }),
        ))
    })?;

    let mut orders = Vec::new();
    for row in rows {
        let (order_id, mut order) = row?;
        order["options"] = serde_json::Value::Array(order_option_labels(&conn, &order_id)?);
        orders.push(order);
    }
    Ok(orders)
}

fn order_option_labels(
    conn: &Connection,
    order_id: &str,
) -> Result<Vec<serde_json::Value>, OrderError> {
    let mut stmt = conn.prepare(
        "SELECT oc.name, ov.value
         FROM order_options oo
         JOIN option_categories oc ON oc.id = oo.option_category_id
         JOIN option_values ov ON ov.id = oo.option_value_id
         WHERE oo.order_id = ?1
         ORDER BY oc.display_order, oc.name",
    )?;
    let rows = stmt.query_map(params![order_id], |row| {
        let category: String = row.get(0)?;
        let value: String = row.get(1)?;
        Ok(serde_json::Value::String(format!("{category}: {value}")))
    })?;
    let mut labels = Vec::new();
    for row in rows {
        labels.push(row?);
    }
    Ok(labels)
}

// ---------------------------------------------------------------------------
// Catalog management
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrinkInput {
    pub id: Option<String>,
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_prep_minutes")]
    pub preparation_minutes: i64,
    #[serde(default)]
    pub display_order: i64,
}

fn default_prep_minutes() -> i64 {
    3
}

/// Create or update a drink category. Returns the category id.
pub fn save_drink_category(
    db: &DbState,
    id: Option<&str>,
    name: &str,
    display_order: i64,
) -> Result<String, OrderError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OrderError::validation("Category name is required"));
    }
    let conn = db.conn.lock()?;
    let category_id = id
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO drink_categories (id, name, display_order)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            display_order = excluded.display_order,
            updated_at = datetime('now')",
        params![category_id, name, display_order],
    )?;
    Ok(category_id)
}

/// Create or update a drink. Returns the drink id.
pub fn save_drink(db: &DbState, input: &DrinkInput) -> Result<String, OrderError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(OrderError::validation("Drink name is required"));
    }
    if input.preparation_minutes < 1 {
        return Err(OrderError::validation(
            "Preparation minutes must be at least 1",
        ));
    }
    let conn = db.conn.lock()?;

    let category_exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM drink_categories WHERE id = ?1",
        params![input.category_id.trim()],
        |row| row.get(0),
    )?;
    if category_exists == 0 {
        return Err(OrderError::validation("Unknown drink category"));
    }

    let drink_id = input
        .id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO drinks (id, category_id, name, description, preparation_minutes, display_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            category_id = excluded.category_id,
            name = excluded.name,
            description = excluded.description,
            preparation_minutes = excluded.preparation_minutes,
            display_order = excluded.display_order,
            updated_at = datetime('now')",
        params![
            drink_id,
            input.category_id.trim(),
            name,
            input.description.as_deref().map(str::trim),
            input.preparation_minutes,
            input.display_order
        ],
    )?;
    Ok(drink_id)
}

/// Soft-hide a drink from the menu (existing orders keep referencing it).
pub fn set_drink_active(db: &DbState, drink_id: &str, active: bool) -> Result<(), OrderError> {
    let conn = db.conn.lock()?;
    let changed = conn.execute(
        "UPDATE drinks SET active = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![active as i64, drink_id.trim()],
    )?;
    if changed == 0 {
        return Err(OrderError::validation("Drink not found"));
    }
    Ok(())
}

/// Create or update an option category. Returns its id.
pub fn save_option_category(
    db: &DbState,
    id: Option<&str>,
    name: &str,
    required: bool,
    display_order: i64,
) -> Result<String, OrderError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OrderError::validation("Option category name is required"));
    }
    let conn = db.conn.lock()?;
    let category_id = id
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO option_categories (id, name, required, display_order)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            required = excluded.required,
            display_order = excluded.display_order,
            updated_at = datetime('now')",
        params![category_id, name, required as i64, display_order],
    )?;
    Ok(category_id)
}

/// Create or update an option value under a category. Returns its id.
pub fn save_option_value(
    db: &DbState,
    id: Option<&str>,
    option_category_id: &str,
    value: &str,
    display_order: i64,
) -> Result<String, OrderError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(OrderError::validation("Option value is required"));
    }
    let conn = db.conn.lock()?;
    let value_id = id
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO option_values (id, option_category_id, value, display_order)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            value = excluded.value,
            display_order = excluded.display_order,
            updated_at = datetime('now')",
        params![value_id, option_category_id.trim(), value, display_order],
    )?;
    Ok(value_id)
}

/// Bind an option category to a drink (upsert of the default value).
pub fn bind_drink_option(
    db: &DbState,
    drink_id: &str,
    option_category_id: &str,
    default_value_id: Option<&str>,
) -> Result<(), OrderError> {
    let conn = db.conn.lock()?;
    conn.execute(
        "INSERT INTO drink_options (id, drink_id, option_category_id, default_value_id)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(drink_id, option_category_id) DO UPDATE SET
            default_value_id = excluded.default_value_id",
        params![
            Uuid::new_v4().to_string(),
            drink_id.trim(),
            option_category_id.trim(),
            default_value_id.map(str::trim)
        ],
    )?;
    Ok(())
}

/// Remove an option category from a drink.
pub fn unbind_drink_option(
    db: &DbState,
    drink_id: &str,
    option_category_id: &str,
) -> Result<(), OrderError> {
    let conn = db.conn.lock()?;
    conn.execute(
        "DELETE FROM drink_options WHERE drink_id = ?1 AND option_category_id = ?2",
        params![drink_id.trim(), option_category_id.trim()],
    )?;
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::orders::{submit_order, SubmitOrderRequest};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn seeded_db() -> DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;").expect("fk");
        db::run_migrations_for_test(&conn);
        conn.execute_batch(
            "INSERT INTO drink_categories (id, name, display_order) VALUES ('cat-coffee', 'Coffee', 1);
             INSERT INTO drinks (id, category_id, name, preparation_minutes, active)
                 VALUES ('drink-latte', 'cat-coffee', 'Latte', 4, 1);
             INSERT INTO option_categories (id, name, required) VALUES ('opt-milk', 'Milk', 1);
             INSERT INTO option_values (id, option_category_id, value)
                 VALUES ('val-oat', 'opt-milk', 'Oat');
             INSERT INTO drink_options (id, drink_id, option_category_id)
                 VALUES ('do-1', 'drink-latte', 'opt-milk');",
        )
        .expect("seed catalog");
        DbState {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        }
    }

    fn place_order(db: &DbState, name: &str) -> String {
        let mut options = HashMap::new();
        options.insert("opt-milk".to_string(), "val-oat".to_string());
        let request = SubmitOrderRequest {
            drink_id: "drink-latte".to_string(),
            guest_name: name.to_string(),
            options,
            special_request: None,
        };
        submit_order(db, 4, &request).expect("submit").order_id
    }

    fn status_of(db: &DbState, order_id: &str) -> String {
        let conn = db.conn.lock().expect("lock");
        conn.query_row(
            "SELECT status FROM orders WHERE id = ?1",
            params![order_id],
            |row| row.get(0),
        )
        .expect("status")
    }

    #[test]
    fn bulk_mark_ready_reports_per_id_tally() {
        let db = seeded_db();
        let a = place_order(&db, "Ada");
        let b = place_order(&db, "Grace");
        let ids = vec![a.clone(), "missing-order".to_string(), b.clone()];

        let outcome = bulk_update(&db, BulkAction::MarkReady, &ids).expect("bulk");
        assert_eq!(outcome.succeeded, vec![a.clone(), b.clone()]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].order_id, "missing-order");
        assert_eq!(outcome.failed[0].reason, "Order not found");
        assert_eq!(status_of(&db, &a), "ready");
        assert_eq!(status_of(&db, &b), "ready");
    }

    #[test]
    fn bulk_rejects_disallowed_transitions_without_aborting() {
        let db = seeded_db();
        let done = place_order(&db, "Ada");
        let fresh = place_order(&db, "Grace");
        bulk_update(&db, BulkAction::MarkCompleted, &[done.clone()]).expect("complete");

        let outcome =
            bulk_update(&db, BulkAction::Cancel, &[done.clone(), fresh.clone()]).expect("bulk");
        assert_eq!(outcome.succeeded, vec![fresh.clone()]);
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.failed[0].reason.contains("completed"));
        assert_eq!(status_of(&db, &done), "completed");
        assert_eq!(status_of(&db, &fresh), "cancelled");
    }

    #[test]
    fn bulk_delete_removes_orders_and_their_options() {
        let db = seeded_db();
        let order_id = place_order(&db, "Ada");
        let outcome = bulk_update(&db, BulkAction::Delete, &[order_id.clone()]).expect("delete");
        assert_eq!(outcome.succeeded, vec![order_id]);

        let conn = db.conn.lock().expect("lock");
        let orders: i64 = conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .expect("orders");
        let options: i64 = conn
            .query_row("SELECT COUNT(*) FROM order_options", [], |row| row.get(0))
            .expect("options");
        assert_eq!(orders, 0);
        assert_eq!(options, 0, "options cascade with the order");
    }

    #[test]
    fn single_status_update_enforces_transitions() {
        let db = seeded_db();
        let order_id = place_order(&db, "Ada");
        update_order_status(&db, &order_id, OrderStatus::Ready).expect("ready");
        update_order_status(&db, &order_id, OrderStatus::Completed).expect("complete");
        let err = update_order_status(&db, &order_id, OrderStatus::Ready).expect_err("final");
        assert!(err.message().contains("completed"));
        assert_eq!(err.kind(), crate::errors::ErrorKind::Validation);
    }

    #[test]
    fn status_update_keeps_store_failures_out_of_the_validation_class() {
        let db = seeded_db();
        let order_id = place_order(&db, "Ada");
        {
            let conn = db.conn.lock().expect("lock");
            conn.execute_batch("DROP TABLE order_options; DROP TABLE orders;")
                .expect("break store");
        }

        let err = update_order_status(&db, &order_id, OrderStatus::Ready).expect_err("store gone");
        assert_eq!(err.kind(), crate::errors::ErrorKind::Database);

        let missing = {
            let db = seeded_db();
            update_order_status(&db, "missing-order", OrderStatus::Ready).expect_err("not found")
        };
        assert_eq!(missing.kind(), crate::errors::ErrorKind::Validation);
        assert_eq!(missing.message(), "Order not found");
    }

    #[test]
    fn bulk_action_parsing() {
        assert_eq!(BulkAction::parse(" Mark_Ready "), Some(BulkAction::MarkReady));
        assert_eq!(BulkAction::parse("delete"), Some(BulkAction::Delete));
        assert_eq!(BulkAction::parse("promote"), None);
    }

    #[test]
    fn list_orders_filters_by_status_and_flattens_options() {
        let db = seeded_db();
        let a = place_order(&db, "Ada");
        place_order(&db, "Grace");
        bulk_update(&db, BulkAction::MarkReady, &[a]).expect("ready");

        let all = list_orders(&db, None).expect("all");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["options"][0], "Milk: Oat");

        let pending = list_orders(&db, Some(OrderStatus::Pending)).expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0]["guestName"], "Grace");
    }

    #[test]
    fn drink_upsert_round_trip() {
        let db = seeded_db();
        let input = DrinkInput {
            id: None,
            category_id: "cat-coffee".to_string(),
            name: "Cortado".to_string(),
            description: Some("Equal parts".to_string()),
            preparation_minutes: 2,
            display_order: 5,
        };
        let drink_id = save_drink(&db, &input).expect("create");

        let update = DrinkInput {
            id: Some(drink_id.clone()),
            name: "Cortado Doble".to_string(),
            ..input
        };
        assert_eq!(save_drink(&db, &update).expect("update"), drink_id);

        let conn = db.conn.lock().expect("lock");
        let name: String = conn
            .query_row(
                "SELECT name FROM drinks WHERE id = ?1",
                params![drink_id],
                |row| row.get(0),
            )
            .expect("name");
        assert_eq!(name, "Cortado Doble");
    }

    #[test]
    fn save_drink_validates_inputs() {
        let db = seeded_db();
        let bad_category = DrinkInput {
            id: None,
            category_id: "cat-unknown".to_string(),
            name: "Flat White".to_string(),
            description: None,
            preparation_minutes: 3,
            display_order: 0,
        };
        assert!(save_drink(&db, &bad_category).is_err());

        let bad_prep = DrinkInput {
            category_id: "cat-coffee".to_string(),
            preparation_minutes: 0,
            ..bad_category
        };
        assert!(save_drink(&db, &bad_prep).is_err());
    }

    #[test]
    fn deactivated_drink_is_hidden_but_kept() {
        let db = seeded_db();
        set_drink_active(&db, "drink-latte", false).expect("deactivate");
        let conn = db.conn.lock().expect("lock");
        let active: i64 = conn
            .query_row("SELECT active FROM drinks WHERE id = 'drink-latte'", [], |row| {
                row.get(0)
            })
            .expect("active");
        assert_eq!(active, 0);
        drop(conn);
        assert!(set_drink_active(&db, "drink-unknown", true).is_err());
    }

    #[test]
    fn option_binding_upserts_default_value() {
        let db = seeded_db();
        bind_drink_option(&db, "drink-latte", "opt-milk", Some("val-oat")).expect("rebind");
        let conn = db.conn.lock().expect("lock");
        let default: Option<String> = conn
            .query_row(
                "SELECT default_value_id FROM drink_options
                 WHERE drink_id = 'drink-latte' AND option_category_id = 'opt-milk'",
                [],
                |row| row.get(0),
            )
            .expect("default");
        assert_eq!(default.as_deref(), Some("val-oat"));
        drop(conn);

        unbind_drink_option(&db, "drink-latte", "opt-milk").expect("unbind");
        let conn = db.conn.lock().expect("lock");
        let bindings: i64 = conn
            .query_row("SELECT COUNT(*) FROM drink_options", [], |row| row.get(0))
            .expect("count");
        assert_eq!(bindings, 0);
    }
}
