use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Order, OrderItem, OrderSummary, User};

// Every order query is filtered by user_id in SQL. An order owned by someone
// else is indistinguishable from one that does not exist.

// ── Users ──

pub fn get_user(conn: &Connection, user_id: i64) -> anyhow::Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT user_id, first_name, email FROM users WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    user_id: row.get(0)?,
                    first_name: row.get(1)?,
                    email: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

// ── Orders ──

const ORDER_COLUMNS: &str =
    "order_id, user_id, status, date_purchase, date_shipped, date_delivered, payment_status";

pub fn get_order_for_user(
    conn: &Connection,
    user_id: i64,
    order_id: i64,
) -> anyhow::Result<Option<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 AND order_id = ?2 LIMIT 1"
    );
    let order = conn
        .query_row(&sql, params![user_id, order_id], parse_order_row)
        .optional()?;

    match order {
        Some(mut order) => {
            order.items = get_order_items(conn, user_id, order.order_id)?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

pub fn get_last_order_for_user(conn: &Connection, user_id: i64) -> anyhow::Result<Option<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 \
         ORDER BY date_purchase DESC, order_id DESC LIMIT 1"
    );
    let order = conn
        .query_row(&sql, params![user_id], parse_order_row)
        .optional()?;

    match order {
        Some(mut order) => {
            order.items = get_order_items(conn, user_id, order.order_id)?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

/// Most recent first.
pub fn list_recent_orders(
    conn: &Connection,
    user_id: i64,
    limit: usize,
) -> anyhow::Result<Vec<OrderSummary>> {
    let mut stmt = conn.prepare(
        "SELECT order_id, status, date_purchase FROM orders WHERE user_id = ?1 \
         ORDER BY date_purchase DESC, order_id DESC LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![user_id, limit as i64], |row| {
        Ok(OrderSummary {
            order_id: row.get(0)?,
            status: row.get(1)?,
            date_purchase: row.get(2)?,
        })
    })?;

    let mut orders = vec![];
    for row in rows {
        orders.push(row?);
    }
    Ok(orders)
}

fn get_order_items(conn: &Connection, user_id: i64, order_id: i64) -> anyhow::Result<Vec<OrderItem>> {
    let mut stmt = conn.prepare(
        "SELECT i.product_name, i.quantity FROM order_items i \
         JOIN orders o ON o.order_id = i.order_id \
         WHERE o.user_id = ?1 AND i.order_id = ?2 ORDER BY i.item_id ASC",
    )?;

    let rows = stmt.query_map(params![user_id, order_id], |row| {
        Ok(OrderItem {
            product_name: row.get(0)?,
            quantity: row.get(1)?,
        })
    })?;

    let mut items = vec![];
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn parse_order_row(row: &rusqlite::Row) -> rusqlite::Result<Order> {
    Ok(Order {
        order_id: row.get(0)?,
        user_id: row.get(1)?,
        status: row.get(2)?,
        date_purchase: row.get(3)?,
        date_shipped: row.get(4)?,
        date_delivered: row.get(5)?,
        payment_status: row.get(6)?,
        items: vec![],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn seeded() -> Connection {
        let conn = init_db(":memory:").unwrap();
        conn.execute_batch(
            "INSERT INTO users (user_id, first_name, email) VALUES
                (42, 'Ella', 'ella@example.com'),
                (7, 'Noah', 'noah@example.com');
             INSERT INTO orders (order_id, user_id, status, date_purchase, date_shipped, date_delivered, payment_status) VALUES
                (1001, 42, 'shipped', '2024-05-17 11:01:51', '2024-05-18 09:00:00', NULL, 'paid'),
                (1002, 42, 'invoiced', '2024-06-01 08:30:00', NULL, NULL, 'pending'),
                (9999, 7, 'delivered', '2024-07-01 10:00:00', '2024-07-02 10:00:00', '2024-07-05 10:00:00', 'paid');
             INSERT INTO order_items (order_id, product_name, quantity) VALUES
                (1001, 'Desk lamp', 1),
                (1001, 'Bulb', 2),
                (9999, 'Headphones', 1);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_get_user() {
        let conn = seeded();
        let user = get_user(&conn, 42).unwrap().unwrap();
        assert_eq!(user.first_name, "Ella");
        assert!(get_user(&conn, 1).unwrap().is_none());
    }

    #[test]
    fn test_get_order_for_owner_includes_items() {
        let conn = seeded();
        let order = get_order_for_user(&conn, 42, 1001).unwrap().unwrap();
        assert_eq!(order.status, "shipped");
        assert_eq!(order.payment_status, "paid");
        assert_eq!(order.date_shipped.as_deref(), Some("2024-05-18 09:00:00"));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[1].quantity, 2);
    }

    #[test]
    fn test_foreign_order_is_not_found() {
        let conn = seeded();
        assert!(get_order_for_user(&conn, 42, 9999).unwrap().is_none());
        assert!(get_order_for_user(&conn, 42, 123456).unwrap().is_none());
    }

    #[test]
    fn test_last_order_is_scoped_to_user() {
        let conn = seeded();
        let last = get_last_order_for_user(&conn, 42).unwrap().unwrap();
        assert_eq!(last.order_id, 1002);
        assert!(get_last_order_for_user(&conn, 5).unwrap().is_none());
    }

    #[test]
    fn test_recent_orders_most_recent_first() {
        let conn = seeded();
        let orders = list_recent_orders(&conn, 42, 5).unwrap();
        let ids: Vec<i64> = orders.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![1002, 1001]);

        let limited = list_recent_orders(&conn, 42, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }
}
