use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use keysmith::config::Config;
use keysmith::db::{self, AppState, queries};
use keysmith::keygen::RandomKeyGenerator;
use keysmith::lifecycle;
use keysmith::models::CreatePlan;

#[derive(Parser)]
#[command(name = "keysmith", version, about = "License key issuing and activation service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Manage the plan catalog
    Plans {
        #[command(subcommand)]
        command: PlanCommand,
    },
}

#[derive(Subcommand)]
enum PlanCommand {
    /// Create a plan
    Add {
        /// Duration such as "30 days" or "1 years"
        #[arg(long)]
        duration: String,
        #[arg(long)]
        alias: Option<String>,
    },
    /// List all plans
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .init();

    let pool = db::create_pool(&config.database_path)
        .with_context(|| format!("failed to open database at {}", config.database_path))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::Plans { command } => {
            let conn = pool.get()?;
            match command {
                PlanCommand::Add { duration, alias } => {
                    let input = CreatePlan { alias, duration };
                    let duration = input.validate()?;
                    let plan = queries::create_plan(
                        &conn,
                        input.alias.as_deref(),
                        duration,
                        lifecycle::now(),
                    )?;
                    println!("{}", serde_json::to_string_pretty(&plan)?);
                }
                PlanCommand::List => {
                    let plans = queries::list_plans(&conn)?;
                    println!("{}", serde_json::to_string_pretty(&plans)?);
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: Config, pool: db::DbPool) -> anyhow::Result<()> {
    let state = AppState {
        db: pool,
        keys: Arc::new(RandomKeyGenerator),
        key_generation_attempts: config.key_generation_attempts,
    };

    let mut app = keysmith::app(state);
    if config.dev_mode {
        tracing::warn!("Dev mode: CORS is permissive");
        app = app.layer(CorsLayer::permissive());
    }

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("keysmith listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
