//! Notification dispatch engine.
//!
//! Resolves an audience specification into a concrete recipient set, writes
//! one send record plus one delivery row per recipient as a single
//! transaction, and reports read/unread aggregates on demand. An audience
//! that resolves to nobody rolls the whole dispatch back.

use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    AudienceType, DispatchReceipt, DispatchRequest, InboxEntry, Priority, Role, SendSummary,
};

/// The dispatch subsystem. Owns its pool handle; every operation acquires a
/// connection scoped to the call.
#[derive(Clone)]
pub struct DispatchEngine {
    pool: SqlitePool,
}

impl DispatchEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Dispatch a broadcast: persist the send, resolve its recipients, and
    /// materialize one delivery row per recipient.
    ///
    /// Send insert, resolution, and the delivery batch share one
    /// transaction, so a mid-dispatch failure never leaves a send visible
    /// with a partial audience.
    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReceipt, AppError> {
        if request.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if request.message.trim().is_empty() {
            return Err(AppError::Validation("Message is required".to_string()));
        }

        let send_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let route_filter = encode_filter(&request.routes)?;
        let driver_filter = encode_filter(&request.drivers)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO notification_sends (
                id, sender_role, sender_id, audience_type, title, message,
                priority, route_filter, driver_filter, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&send_id)
        .bind(request.sender_role.as_str())
        .bind(&request.sender_id)
        .bind(request.audience_type.as_str())
        .bind(&request.title)
        .bind(&request.message)
        .bind(request.priority.as_str())
        .bind(&route_filter)
        .bind(&driver_filter)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let recipients = resolve_recipients(
            &mut tx,
            request.audience_type,
            &request.routes,
            &request.drivers,
        )
        .await?;

        if recipients.is_empty() {
            // Dropping the transaction rolls the send back: no ghost
            // "sent to nobody" record survives.
            return Err(AppError::NoRecipients);
        }

        for profile_id in &recipients {
            sqlx::query(
                r#"INSERT INTO notification_deliveries (
                    id, send_id, profile_id, title, message, kind, read, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, 0, ?)"#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&send_id)
            .bind(profile_id)
            .bind(&request.title)
            .bind(&request.message)
            .bind(&request.kind)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            send_id = %send_id,
            audience = request.audience_type.as_str(),
            recipients = recipients.len(),
            "dispatched notification"
        );

        Ok(DispatchReceipt {
            send_id,
            recipient_count: recipients.len(),
        })
    }

    /// A profile's inbox, newest first.
    ///
    /// Every send is left-joined against this profile's delivery row, so a
    /// send stays listable even when the delivery row has not materialized
    /// yet; `kind` and `read` default in that case.
    pub async fn list_inbox(&self, profile_id: &str) -> Result<Vec<InboxEntry>, AppError> {
        let rows = sqlx::query(
            r#"SELECT ns.id AS send_id, ns.title, ns.message, ns.sender_role,
                      ns.audience_type, ns.priority, ns.created_at,
                      d.id AS delivery_id,
                      COALESCE(d.kind, 'notice') AS kind,
                      COALESCE(d.read, 0) AS read
               FROM notification_sends ns
               LEFT JOIN notification_deliveries d
                 ON d.send_id = ns.id AND d.profile_id = ?
               ORDER BY ns.created_at DESC, ns.rowid DESC"#,
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let sender_role: String = row.get("sender_role");
                let audience_type: String = row.get("audience_type");
                let priority: String = row.get("priority");
                let read: i32 = row.get("read");
                InboxEntry {
                    delivery_id: row.get("delivery_id"),
                    send_id: row.get("send_id"),
                    title: row.get("title"),
                    message: row.get("message"),
                    sender_role: Role::from_str(&sender_role).unwrap_or(Role::Admin),
                    audience_type: AudienceType::from_str(&audience_type)
                        .unwrap_or(AudienceType::All),
                    priority: Priority::from_str(&priority).unwrap_or_default(),
                    kind: row.get("kind"),
                    read: read != 0,
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }

    /// Flip a delivery to read. Idempotent; 404 only when the id is unknown.
    pub async fn mark_read(&self, delivery_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE notification_deliveries SET read = 1 WHERE id = ?")
            .bind(delivery_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Delivery {} not found",
                delivery_id
            )));
        }

        Ok(())
    }

    /// Send history, newest first, annotated with delivery aggregates and
    /// decoded route/driver filters.
    pub async fn history(&self, limit: i64) -> Result<Vec<SendSummary>, AppError> {
        let rows = sqlx::query(
            r#"SELECT ns.id, ns.sender_role, ns.sender_id, ns.audience_type,
                      ns.title, ns.message, ns.priority, ns.route_filter,
                      ns.driver_filter, ns.created_at,
                      COUNT(d.id) AS total_recipients,
                      COALESCE(SUM(d.read), 0) AS read_count
               FROM notification_sends ns
               LEFT JOIN notification_deliveries d ON d.send_id = ns.id
               GROUP BY ns.id
               ORDER BY ns.created_at DESC, ns.rowid DESC
               LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let sender_role: String = row.get("sender_role");
                let audience_type: String = row.get("audience_type");
                let priority: String = row.get("priority");
                let route_filter: Option<String> = row.get("route_filter");
                let driver_filter: Option<String> = row.get("driver_filter");
                SendSummary {
                    id: row.get("id"),
                    sender_role: Role::from_str(&sender_role).unwrap_or(Role::Admin),
                    sender_id: row.get("sender_id"),
                    audience_type: AudienceType::from_str(&audience_type)
                        .unwrap_or(AudienceType::All),
                    title: row.get("title"),
                    message: row.get("message"),
                    priority: Priority::from_str(&priority).unwrap_or_default(),
                    routes: decode_filter(route_filter.as_deref()),
                    drivers: decode_filter(driver_filter.as_deref()),
                    total_recipients: row.get("total_recipients"),
                    read_count: row.get("read_count"),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }

    /// Delete a send and all its deliveries as one transaction. Succeeds
    /// even when the send does not exist.
    pub async fn delete_send(&self, send_id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM notification_deliveries WHERE send_id = ?")
            .bind(send_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM notification_sends WHERE id = ?")
            .bind(send_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Resolve the recipient profile-id set for an audience. Runs inside the
/// dispatch transaction so the reads and the send insert are one unit.
async fn resolve_recipients(
    conn: &mut SqliteConnection,
    audience: AudienceType,
    routes: &[String],
    drivers: &[String],
) -> Result<BTreeSet<String>, AppError> {
    let mut recipients = BTreeSet::new();

    match audience {
        AudienceType::All => {
            let rows = sqlx::query(
                "SELECT id FROM profiles WHERE role IN ('student', 'driver') AND active = 1",
            )
            .fetch_all(&mut *conn)
            .await?;
            collect_ids(&mut recipients, rows, "id");
        }
        AudienceType::Students => {
            if !routes.is_empty() {
                let sql = format!(
                    r#"SELECT DISTINCT s.profile_id
                       FROM subscriptions sub
                       JOIN students s ON s.id = sub.student_id
                       JOIN profiles p ON p.id = s.profile_id AND p.active = 1
                       WHERE sub.status = 'active' AND sub.route_id IN ({})"#,
                    placeholders(routes.len())
                );
                let mut query = sqlx::query(&sql);
                for route_id in routes {
                    query = query.bind(route_id);
                }
                let rows = query.fetch_all(&mut *conn).await?;
                collect_ids(&mut recipients, rows, "profile_id");
            } else {
                let rows = sqlx::query(
                    r#"SELECT s.profile_id FROM students s
                       JOIN profiles p ON p.id = s.profile_id AND p.active = 1"#,
                )
                .fetch_all(&mut *conn)
                .await?;
                collect_ids(&mut recipients, rows, "profile_id");
            }
        }
        AudienceType::Drivers => {
            if !drivers.is_empty() {
                let sql = format!(
                    r#"SELECT d.profile_id FROM drivers d
                       JOIN profiles p ON p.id = d.profile_id AND p.active = 1
                       WHERE d.id IN ({})"#,
                    placeholders(drivers.len())
                );
                let mut query = sqlx::query(&sql);
                for driver_id in drivers {
                    query = query.bind(driver_id);
                }
                let rows = query.fetch_all(&mut *conn).await?;
                collect_ids(&mut recipients, rows, "profile_id");
            } else if !routes.is_empty() {
                // Drivers are tied to routes by route *name*, a weak
                // textual reference carried in drivers.route_ref.
                let sql = format!(
                    "SELECT name FROM routes WHERE id IN ({})",
                    placeholders(routes.len())
                );
                let mut query = sqlx::query(&sql);
                for route_id in routes {
                    query = query.bind(route_id);
                }
                let route_names: Vec<String> = query
                    .fetch_all(&mut *conn)
                    .await?
                    .into_iter()
                    .map(|row| row.get("name"))
                    .collect();

                if route_names.is_empty() {
                    // Unknown route ids widen back to every active driver.
                    let rows = sqlx::query(
                        "SELECT id FROM profiles WHERE role = 'driver' AND active = 1",
                    )
                    .fetch_all(&mut *conn)
                    .await?;
                    collect_ids(&mut recipients, rows, "id");
                } else {
                    let sql = format!(
                        r#"SELECT d.profile_id FROM drivers d
                           JOIN profiles p ON p.id = d.profile_id AND p.active = 1
                           WHERE d.route_ref IN ({})"#,
                        placeholders(route_names.len())
                    );
                    let mut query = sqlx::query(&sql);
                    for name in &route_names {
                        query = query.bind(name);
                    }
                    let rows = query.fetch_all(&mut *conn).await?;
                    collect_ids(&mut recipients, rows, "profile_id");
                }
            } else {
                let rows =
                    sqlx::query("SELECT id FROM profiles WHERE role = 'driver' AND active = 1")
                        .fetch_all(&mut *conn)
                        .await?;
                collect_ids(&mut recipients, rows, "id");
            }
        }
    }

    Ok(recipients)
}

/// Add non-null, non-blank profile ids to the set; duplicates collapse.
fn collect_ids(set: &mut BTreeSet<String>, rows: Vec<sqlx::sqlite::SqliteRow>, column: &str) {
    for row in rows {
        let id: Option<String> = row.get(column);
        if let Some(id) = id {
            if !id.is_empty() {
                set.insert(id);
            }
        }
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn encode_filter(ids: &[String]) -> Result<Option<String>, AppError> {
    if ids.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(ids)?))
    }
}

fn decode_filter(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}
