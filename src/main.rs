use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subdeck::app::AppContext;
use subdeck::cli::{commands, Cli, Commands};
use subdeck::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(&config)?;

    match cli.command {
        Commands::Add {
            subreddit,
            sort,
            timeframe,
        } => {
            commands::add_column(&ctx, &subreddit, &sort, timeframe.as_deref()).await?;
        }
        Commands::Remove { id } => {
            commands::remove_column(&ctx, &id)?;
        }
        Commands::List => {
            commands::list_columns(&ctx)?;
        }
        Commands::Show { id, force } => {
            commands::show_column(&ctx, &id, force).await?;
        }
        Commands::Sort {
            id,
            sort,
            timeframe,
        } => {
            commands::change_sort(&ctx, &id, &sort, timeframe.as_deref())?;
        }
        Commands::MarkRead { id, item } => {
            commands::mark_read(&ctx, &id, item.as_deref())?;
        }
        Commands::Move { id, position } => {
            commands::move_column(&ctx, &id, position)?;
        }
        Commands::Refresh { id } => {
            commands::refresh(&ctx, id.as_deref(), cli.workers).await?;
        }
        Commands::Usage => {
            commands::usage(&ctx)?;
        }
    }

    Ok(())
}
