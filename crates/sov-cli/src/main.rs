mod run;
mod volume;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "sov-cli")]
#[command(about = "Brand share-of-voice analysis for search result pages")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Analyze a market keyword for 1 to 10 brands and wait for the result.
    Run {
        keyword: String,
        #[arg(long = "brand", required = true)]
        brands: Vec<String>,
        #[arg(long, default_value = "cli")]
        user: String,
    },
    /// Show the progress of a run.
    Status { run_id: Uuid },
    /// Show the aggregates and exposures of a finished run.
    Result { run_id: Uuid },
    /// Search volume, trend, and channel document counts for a keyword.
    Volume { keyword: String },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("sov-cli: no command given, see --help");
        return Ok(());
    };

    let config = sov_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            let pool = connect(&config).await?;
            sov_db::ping(&pool).await?;
            println!("database: ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let pool = connect(&config).await?;
            let applied = sov_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Run {
            keyword,
            brands,
            user,
        } => {
            let pool = connect(&config).await?;
            run::run_analysis(pool, &config, &user, &keyword, &brands).await?;
        }
        Commands::Status { run_id } => {
            run::show_status(connect(&config).await?, run_id).await?;
        }
        Commands::Result { run_id } => {
            run::show_result(connect(&config).await?, run_id).await?;
        }
        Commands::Volume { keyword } => volume::run_volume(&config, &keyword).await?,
    }

    Ok(())
}

async fn connect(config: &sov_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = sov_db::PoolConfig::from_app_config(config);
    Ok(sov_db::connect_pool(&config.database_url, pool_config).await?)
}
