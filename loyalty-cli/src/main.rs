use std::time::Duration;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use loyalty_core::db::{self, DatabaseSettings};
use loyalty_core::{EngineSettings, LoyaltyEngine};

mod commands;
use commands::Command;

#[derive(Parser, Debug, Clone)]
#[command(name = "loyalty")]
#[command(author, version, about = "Loyalty points ledger: scans, redemptions and account reads")]
struct Args {
    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://loyalty@localhost:5432/loyalty")]
    database_url: String,

    #[arg(long, env = "LOYALTY_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// How long to wait for a pooled connection, in milliseconds.
    #[arg(long, env = "LOYALTY_ACQUIRE_TIMEOUT_MS", default_value_t = 5_000)]
    acquire_timeout_ms: u64,

    /// How long a transaction waits on a row lock, in milliseconds.
    #[arg(long, env = "LOYALTY_LOCK_TIMEOUT_MS", default_value_t = 3_000)]
    lock_timeout_ms: u64,

    /// Deadline for a whole operation, in milliseconds.
    #[arg(long, env = "LOYALTY_OP_TIMEOUT_MS", default_value_t = 10_000)]
    op_timeout_ms: u64,

    /// Progress target as a multiple of one scan's points.
    #[arg(long, env = "LOYALTY_TARGET_MULTIPLIER", default_value_t = 10)]
    target_multiplier: i64,

    /// Days a progress record stays open.
    #[arg(long, env = "LOYALTY_PROGRESS_DAYS", default_value_t = 30)]
    progress_days: i64,

    /// Apply pending migrations before running the command.
    #[arg(long, default_value = "false")]
    migrate: bool,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn database_settings(&self) -> DatabaseSettings {
        DatabaseSettings {
            url: self.database_url.clone(),
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
    }

    fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            operation_timeout: Duration::from_millis(self.op_timeout_ms),
            target_multiplier: self.target_multiplier,
            progress_horizon_days: self.progress_days,
        }
    }
}

fn init_tracing() {
    // Route `log` records from sqlx through tracing.
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("loyalty=info,loyalty_core=info,sqlx=warn"));
    let sub = fmt().with_env_filter(filter).with_writer(std::io::stderr).finish();
    if tracing::subscriber::set_global_default(sub).is_err() {
        eprintln!("tracing subscriber was already installed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();

    let engine_settings = args.engine_settings();
    engine_settings.validate()?;

    let db = db::init_global(&args.database_settings()).await?;
    if args.migrate || matches!(args.command, Command::Migrate) {
        db.migrate().await?;
    }

    let engine = LoyaltyEngine::new(db.clone(), engine_settings)?;
    match commands::run(&engine, args.command).await {
        Ok(()) => {
            info!("done");
            Ok(())
        }
        Err(e) => {
            error!("command failed: {e:#}");
            Err(e)
        }
    }
}
