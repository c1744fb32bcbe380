use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tracing initialization.
///
/// Logs go to:
/// - stdout (with colors)
/// - logs/backend.log next to the executable (without colors)
pub fn initialize() -> anyhow::Result<()> {
    let log_dir = if let Ok(exe_path) = std::env::current_exe() {
        match exe_path.parent() {
            Some(exe_dir) => exe_dir.join("logs"),
            None => std::path::Path::new("target").join("logs"),
        }
    } else {
        std::path::Path::new("target").join("logs")
    };

    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow::anyhow!("Cannot create log directory: {}", e))?;

    let log_file_path = log_dir.join("backend.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .map_err(|e| anyhow::anyhow!("Cannot open log file {}: {}", log_file_path.display(), e))?;

    let log_level =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sqlx=warn,sea_orm=warn".into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_level))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Arc::new(log_file))
                .with_ansi(false),
        )
        .init();

    tracing::info!("Logging to {}", log_file_path.display());
    Ok(())
}
