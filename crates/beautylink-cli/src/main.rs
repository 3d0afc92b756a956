mod beta;
mod db;
mod local;
mod marketplace;

use beautylink_core::bookings::BookingTab;
use beautylink_core::providers::{ProviderFilter, ProviderKind};
use beautylink_db::RequestScope;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::beta::BetaCommands;
use crate::db::DbCommands;
use crate::local::PromptCommands;

#[derive(Debug, Parser)]
#[command(name = "beautylink")]
#[command(about = "BeautyLink marketplace command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// List providers offering a service near a location
    Providers {
        /// Service id
        #[arg(long)]
        service: Uuid,
        /// Latitude of the search origin (requires --lon)
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude of the search origin (requires --lat)
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Free-text location, e.g. "Akwa, Douala"
        #[arg(long)]
        location: Option<String>,
        /// Result tab: all, salon or individual
        #[arg(long, default_value = "all")]
        filter: ProviderFilter,
    },
    /// Show a client's bookings
    Bookings {
        /// Client user id
        #[arg(long)]
        client: Uuid,
        /// upcoming or past
        #[arg(long, default_value = "upcoming")]
        tab: BookingTab,
    },
    /// Beta test tracker
    Beta {
        #[command(subcommand)]
        command: BetaCommands,
    },
    /// Admin dashboard summary
    Dashboard {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search addresses in Cameroon
    Geocode {
        /// Address, quarter or city to look up
        query: String,
        /// Remember the first result as the default search location
        #[arg(long)]
        save: bool,
    },
    /// Open (or reuse) a direct chat between a client and a provider
    Chat {
        #[arg(long)]
        client: Uuid,
        #[arg(long)]
        provider: Uuid,
        /// salon or therapist
        #[arg(long)]
        provider_type: ProviderKind,
        /// Session token for the marketplace API
        #[arg(long, env = "BEAUTYLINK_API_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Install-app prompt state
    Prompt {
        #[command(subcommand)]
        command: PromptCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("beautylink: run with --help to list commands");
        return Ok(());
    };

    let config = beautylink_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Db { command } => db::run_db(&config, command).await,
        Commands::Providers {
            service,
            lat,
            lon,
            location,
            filter,
        } => {
            let pool = db::connect(&config).await?;
            let input = beautylink_core::providers::LocationInput { lat, lon, location };
            marketplace::run_providers(&pool, &config, service, input, filter, &cancel_on_ctrl_c())
                .await
        }
        Commands::Bookings { client, tab } => {
            let pool = db::connect(&config).await?;
            marketplace::run_bookings(&pool, client, tab, &cancel_on_ctrl_c()).await
        }
        Commands::Beta { command } => beta::run_beta(&config, command).await,
        Commands::Dashboard { json } => {
            let pool = db::connect(&config).await?;
            marketplace::run_dashboard(&pool, json, &cancel_on_ctrl_c()).await
        }
        Commands::Geocode { query, save } => local::run_geocode(&config, &query, save).await,
        Commands::Chat {
            client,
            provider,
            provider_type,
            token,
        } => {
            let request = beautylink_remote::DirectChatRequest {
                client_id: client,
                provider_id: provider,
                provider_type,
            };
            marketplace::run_chat(&config, &request, token).await
        }
        Commands::Prompt { command } => local::run_prompt(&config, command),
    }
}

/// A scope that is cancelled when the user presses Ctrl-C.
fn cancel_on_ctrl_c() -> RequestScope {
    let scope = RequestScope::new();
    let handle = scope.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted; abandoning pending queries");
            handle.cancel();
        }
    });
    scope
}
