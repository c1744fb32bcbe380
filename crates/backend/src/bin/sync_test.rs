use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use uuid::Uuid;

use backend::domain::a001_network;
use backend::shared::config::{get_database_path, load_config};
use backend::shared::data::db::initialize_database;
use backend::sync::networks::build_registry;
use contracts::sync::{Credentials, SyncConfig, SyncResult};

/// Exercise one network's protocol client with real credentials,
/// without touching schedules or plan limits.
#[derive(Parser, Debug)]
#[command(name = "sync_test")]
struct Args {
    /// Network slug, e.g. omolaat or marketeers
    network: String,
    email: String,
    password: String,

    /// Start of the date range (YYYY-MM-DD), defaults to the 1st of this month
    #[arg(long)]
    from: Option<NaiveDate>,
    /// End of the date range (YYYY-MM-DD), defaults to today
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    page_size: Option<u32>,

    /// Stop after the login handshake
    #[arg(long)]
    login_only: bool,
    #[arg(long)]
    debug: bool,

    /// Persist the fetched records; requires --user-id and a seeded database
    #[arg(long)]
    store: bool,
    #[arg(long)]
    user_id: Option<Uuid>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(3)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    if args.debug {
        std::env::set_var("RUST_LOG", "debug");
    }
    backend::system::tracing::initialize()?;

    let config = load_config()?;
    let registry =
        build_registry(&config).map_err(|e| anyhow::anyhow!("network registry: {}", e))?;
    let service = registry
        .get(&args.network)
        .ok_or_else(|| anyhow::anyhow!("no protocol client for network '{}'", args.network))?;

    let mut sync_config = SyncConfig {
        date_from: args.from,
        date_to: args.to,
        page_size: args.page_size,
        debug: args.debug,
        ..Default::default()
    };

    if args.store {
        let user_id = args
            .user_id
            .ok_or_else(|| anyhow::anyhow!("--store requires --user-id"))?;
        let db_path = get_database_path(&config)?;
        initialize_database(db_path.to_str()).await?;
        a001_network::service::seed_catalog().await?;
        let network = a001_network::service::get_by_slug(&args.network)
            .await?
            .ok_or_else(|| anyhow::anyhow!("network '{}' not in the catalog", args.network))?;
        sync_config.store = true;
        sync_config.user_id = Some(user_id);
        sync_config.network_id = Some(network.base.id.value());
    }

    let credentials = Credentials::new(args.email, args.password);
    let result = if args.login_only {
        service.test_connection(&credentials).await
    } else {
        service.sync_data(&credentials, &sync_config).await
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(exit_code_for(&result))
}

/// 0 success, 2 credential/login trouble, 3 anything else
fn exit_code_for(result: &SyncResult) -> ExitCode {
    if result.success {
        return ExitCode::SUCCESS;
    }
    let credential_failure = result.message.starts_with("credentials_missing")
        || result.message.starts_with("login_failed")
        || result.message.starts_with("session_expired");
    if credential_failure {
        ExitCode::from(2)
    } else {
        ExitCode::from(3)
    }
}
