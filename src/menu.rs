//! Menu catalog readers.
//!
//! The guest-facing menu is a nested JSON tree (categories -> drinks ->
//! option categories -> values) built in one pass per level. Inactive
//! categories, drinks, and option values are filtered out here so screens
//! never have to.

use rusqlite::{params, Connection};

use crate::db::DbState;
use crate::errors::OrderError;

/// Full menu tree for the guest ordering screens.
pub fn get_menu(db: &DbState) -> Result<serde_json::Value, OrderError> {
    let conn = db.conn.lock()?;
    menu_tree(&conn)
}

fn menu_tree(conn: &Connection) -> Result<serde_json::Value, OrderError> {
    let mut categories = Vec::new();

    let mut category_stmt = conn.prepare(
        "SELECT id, name FROM drink_categories
         WHERE active = 1
         ORDER BY display_order, name",
    )?;
    let category_rows = category_stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    for category_row in category_rows {
        let (category_id, category_name) = category_row?;
        let mut drinks = Vec::new();

        let mut drink_stmt = conn.prepare(
            "SELECT id, name, description, preparation_minutes FROM drinks
             WHERE category_id = ?1 AND active = 1
             ORDER BY display_order, name",
        )?;
        let drink_rows = drink_stmt.query_map(params![category_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        for drink_row in drink_rows {
            let (drink_id, name, description, preparation_minutes) = drink_row?;
            let options = drink_option_categories(conn, &drink_id)?;
            drinks.push(serde_json::json!({
                "id": drink_id,
                "name": name,
                "description": description,
                "preparationMinutes": preparation_minutes,
                "options": options,
            }));
        }

        categories.push(serde_json::json!({
            "id": category_id,
            "name": category_name,
            "drinks": drinks,
        }));
    }

    Ok(serde_json::json!({ "categories": categories }))
}

/// Option categories bound to a drink, with their active values.
fn drink_option_categories(
    conn: &Connection,
    drink_id: &str,
) -> Result<Vec<serde_json::Value>, OrderError> {
    let mut stmt = conn.prepare(
        "SELECT oc.id, oc.name, oc.required, dopt.default_value_id
         FROM drink_options dopt
         JOIN option_categories oc ON oc.id = dopt.option_category_id
         WHERE dopt.drink_id = ?1
         ORDER BY oc.display_order, oc.name",
    )?;
    let rows = stmt.query_map(params![drink_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)? != 0,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut categories = Vec::new();
    for row in rows {
        let (category_id, name, required, default_value_id) = row?;

        let mut value_stmt = conn.prepare(
            "SELECT id, value FROM option_values
             WHERE option_category_id = ?1 AND active = 1
             ORDER BY display_order, value",
        )?;
        let value_rows = value_stmt.query_map(params![category_id], |row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "value": row.get::<_, String>(1)?,
            }))
        })?;
        let mut values = Vec::new();
        for value_row in value_rows {
            values.push(value_row?);
        }

        categories.push(serde_json::json!({
            "id": category_id,
            "name": name,
            "required": required,
            "defaultValueId": default_value_id,
            "values": values,
        }));
    }
    Ok(categories)
}

/// Whether any option category is bound to the drink. Drives the wizard's
/// customization-skip rule.
pub fn drink_has_options(conn: &Connection, drink_id: &str) -> Result<bool, OrderError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM drink_options WHERE drink_id = ?1",
        params![drink_id.trim()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
