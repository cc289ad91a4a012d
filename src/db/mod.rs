//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        // Delivery rows cascade with their parent send
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS routes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            bus_number TEXT,
            plate TEXT,
            shift TEXT,
            driver_name TEXT,
            driver_phone TEXT,
            depart_home TEXT,
            arrive_school TEXT,
            depart_school TEXT,
            arrive_home TEXT,
            stops TEXT,
            notes TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            school TEXT NOT NULL,
            class_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            enrollment_number TEXT NOT NULL UNIQUE,
            guardian_name TEXT NOT NULL,
            guardian_phone TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            profile_id TEXT NOT NULL REFERENCES profiles(id),
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS drivers (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            password_hash TEXT NOT NULL,
            license_number TEXT,
            license_expiry TEXT,
            bus_plate TEXT,
            bus_model TEXT,
            route_ref TEXT,
            profile_id TEXT NOT NULL REFERENCES profiles(id),
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            id TEXT PRIMARY KEY,
            school_name TEXT NOT NULL,
            address TEXT,
            latitude REAL,
            longitude REAL,
            school_contact TEXT,
            manager_name TEXT NOT NULL,
            position TEXT,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            password_hash TEXT NOT NULL,
            profile_id TEXT NOT NULL REFERENCES profiles(id),
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL REFERENCES students(id),
            route_id TEXT NOT NULL REFERENCES routes(id),
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // The authoritative guard against the enroll check-then-act race:
    // at most one active subscription per (student, route)
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_subscriptions_active
            ON subscriptions(student_id, route_id) WHERE status = 'active';
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_sends (
            id TEXT PRIMARY KEY,
            sender_role TEXT NOT NULL,
            sender_id TEXT,
            audience_type TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            priority TEXT NOT NULL DEFAULT 'low',
            route_filter TEXT,
            driver_filter TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_deliveries (
            id TEXT PRIMARY KEY,
            send_id TEXT NOT NULL REFERENCES notification_sends(id) ON DELETE CASCADE,
            profile_id TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'notice',
            read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_profiles_role_active ON profiles(role, active);
        CREATE INDEX IF NOT EXISTS idx_drivers_route_ref ON drivers(route_ref);
        CREATE INDEX IF NOT EXISTS idx_subscriptions_route ON subscriptions(route_id);
        CREATE INDEX IF NOT EXISTS idx_subscriptions_student ON subscriptions(student_id);
        CREATE INDEX IF NOT EXISTS idx_deliveries_send ON notification_deliveries(send_id);
        CREATE INDEX IF NOT EXISTS idx_deliveries_profile ON notification_deliveries(profile_id);
        CREATE INDEX IF NOT EXISTS idx_sends_created_at ON notification_sends(created_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
