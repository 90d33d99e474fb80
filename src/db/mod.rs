//! Database module for SQLite persistence.
//!
//! SQLite is the record store for members and renewals.

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
        CREATE TABLE IF NOT EXISTS members (
            id TEXT PRIMARY KEY,
            timestamp TEXT,
            town_name TEXT NOT NULL DEFAULT '',
            member_name TEXT NOT NULL,
            trade_union_number TEXT NOT NULL UNIQUE,
            age INTEGER NOT NULL,
            father_husband_name TEXT NOT NULL DEFAULT '',
            caste TEXT NOT NULL DEFAULT '',
            permanent_address TEXT NOT NULL DEFAULT '',
            temporary_address TEXT,
            contact_no TEXT NOT NULL DEFAULT '',
            monthly_salary REAL NOT NULL DEFAULT 0,
            type_of_work TEXT NOT NULL DEFAULT '',
            housing_situation TEXT NOT NULL DEFAULT '',
            weekly_off TEXT NOT NULL DEFAULT '',
            children_studying INTEGER NOT NULL DEFAULT 0,
            children_domestic_work INTEGER NOT NULL DEFAULT 0,
            children_other_work INTEGER NOT NULL DEFAULT 0,
            any_disability TEXT,
            employer_names TEXT NOT NULL DEFAULT '',
            employer_address TEXT NOT NULL DEFAULT '',
            employer_contact TEXT NOT NULL DEFAULT '',
            years_domestic_work REAL NOT NULL DEFAULT 0,
            hours_work REAL NOT NULL DEFAULT 0,
            aadhaar_number TEXT NOT NULL DEFAULT '',
            id_proof_upload TEXT,
            nominee TEXT NOT NULL DEFAULT '',
            date_joining TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT '',
            coordinator_name TEXT NOT NULL DEFAULT '',
            receipt_number TEXT NOT NULL DEFAULT '',
            photo TEXT,
            number_of_houses INTEGER NOT NULL DEFAULT 0,
            nominee_contact TEXT NOT NULL DEFAULT '',
            joining_month TEXT NOT NULL DEFAULT '',
            search_text TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1,
            last_renewal TEXT,
            next_renewal_due TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS renewals (
            id TEXT PRIMARY KEY,
            trade_union_number TEXT NOT NULL,
            renewal_date TEXT NOT NULL,
            receipt_number TEXT NOT NULL,
            coordinator_name TEXT NOT NULL,
            amount REAL,
            payment_method TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_members_member_name ON members(member_name);
        CREATE INDEX IF NOT EXISTS idx_members_state ON members(state);
        CREATE INDEX IF NOT EXISTS idx_members_is_active ON members(is_active);
        CREATE INDEX IF NOT EXISTS idx_renewals_trade_union_number ON renewals(trade_union_number);
        CREATE INDEX IF NOT EXISTS idx_renewals_renewal_date ON renewals(renewal_date);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
