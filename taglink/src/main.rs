use clap::Parser;
use sqlx::SqlitePool;
use taglink::SqliteRepositoryProvider;
use taglink_core::RepositoryProvider;

/// Command line interface for Taglink database administration
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "TAGLINK_DATABASE_URL")]
    db_url: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            println!("Running migrations...");
            let pool = SqlitePool::connect(&cli.db_url).await?;
            let provider = SqliteRepositoryProvider::new(pool);
            provider.migrate().await?;
            println!("Migrations complete");
        }
        Commands::Version => {
            println!("Taglink v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
