use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

/// Table bootstrap DDL, applied only when the table does not exist yet
const TABLES: &[(&str, &str)] = &[
    (
        "a001_network",
        r#"
        CREATE TABLE a001_network (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            slug TEXT NOT NULL,
            base_url TEXT,
            capabilities TEXT NOT NULL DEFAULT '{}',
            is_enabled INTEGER NOT NULL DEFAULT 1,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a002_network_connection",
        r#"
        CREATE TABLE a002_network_connection (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            user_id TEXT NOT NULL,
            network_id TEXT NOT NULL,
            email TEXT NOT NULL,
            password TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_test_at TEXT,
            last_test_success INTEGER,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a003_campaign",
        r#"
        CREATE TABLE a003_campaign (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            connection_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            network_id TEXT NOT NULL,
            external_id TEXT NOT NULL,
            name TEXT NOT NULL,
            status TEXT,
            tracking_url TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a004_coupon",
        r#"
        CREATE TABLE a004_coupon (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            connection_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            network_id TEXT NOT NULL,
            campaign_external_id TEXT NOT NULL,
            coupon_code TEXT NOT NULL,
            status TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a005_purchase",
        r#"
        CREATE TABLE a005_purchase (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            connection_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            network_id TEXT NOT NULL,
            campaign_external_id TEXT NOT NULL,
            coupon_code TEXT NOT NULL,
            external_order_id TEXT NOT NULL,
            order_date TEXT NOT NULL,
            affiliate_amount REAL NOT NULL DEFAULT 0,
            order_amount REAL NOT NULL DEFAULT 0,
            currency TEXT NOT NULL DEFAULT '',
            quantity INTEGER NOT NULL DEFAULT 1,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a006_plan",
        r#"
        CREATE TABLE a006_plan (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            max_networks INTEGER NOT NULL DEFAULT -1,
            daily_sync_limit INTEGER NOT NULL DEFAULT -1,
            monthly_sync_limit INTEGER NOT NULL DEFAULT -1,
            revenue_cap INTEGER NOT NULL DEFAULT -1,
            orders_cap INTEGER NOT NULL DEFAULT -1,
            sync_window_unit TEXT,
            sync_window_size INTEGER,
            sync_allowed_from TEXT,
            sync_allowed_to TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a007_subscription",
        r#"
        CREATE TABLE a007_subscription (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            user_id TEXT NOT NULL,
            plan_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'expired',
            trial_ends_at TEXT,
            ends_at TEXT,
            cancelled_at TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a008_usage_window",
        r#"
        CREATE TABLE a008_usage_window (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            user_id TEXT NOT NULL,
            period TEXT NOT NULL,
            window_start TEXT NOT NULL,
            window_end TEXT NOT NULL,
            sync_count INTEGER NOT NULL DEFAULT 0,
            revenue_sum REAL NOT NULL DEFAULT 0,
            orders_count INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a009_sync_schedule",
        r#"
        CREATE TABLE a009_sync_schedule (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            user_id TEXT NOT NULL,
            network_ids TEXT NOT NULL DEFAULT '[]',
            sync_type TEXT NOT NULL DEFAULT 'full',
            frequency TEXT NOT NULL,
            next_run_at TEXT,
            runs_today INTEGER NOT NULL DEFAULT 0,
            daily_run_limit INTEGER NOT NULL DEFAULT 0,
            is_enabled INTEGER NOT NULL DEFAULT 1,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a010_sync_log",
        r#"
        CREATE TABLE a010_sync_log (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            sync_schedule_id TEXT,
            user_id TEXT NOT NULL,
            network_id TEXT NOT NULL,
            sync_type TEXT NOT NULL DEFAULT 'full',
            status TEXT NOT NULL DEFAULT 'pending',
            started_at TEXT,
            finished_at TEXT,
            error_message TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
];

/// Unique indexes backing the sync upsert keys
const INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_a003_campaign_key ON a003_campaign (connection_id, external_id);",
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_a004_coupon_key ON a004_coupon (connection_id, campaign_external_id, coupon_code);",
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_a005_purchase_key ON a005_purchase (connection_id, external_order_id, coupon_code);",
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_a008_usage_window_key ON a008_usage_window (user_id, period);",
];

pub async fn initialize_database(db_path: Option<&str>) -> anyhow::Result<()> {
    let db_file = db_path.unwrap_or("target/db/app.db");
    if let Some(parent) = std::path::Path::new(db_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_file).is_absolute() {
        std::path::PathBuf::from(db_file)
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    let conn = Database::connect(&db_url).await?;

    for (table, create_sql) in TABLES {
        let check = format!(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='{}';",
            table
        );
        let exists = conn
            .query_all(Statement::from_string(DatabaseBackend::Sqlite, check))
            .await?;
        if exists.is_empty() {
            tracing::info!("Creating {} table", table);
            conn.execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                create_sql.to_string(),
            ))
            .await?;
        }
    }

    for index_sql in INDEXES {
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            index_sql.to_string(),
        ))
        .await?;
    }

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Failed to set DB_CONN"))?;
    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}
