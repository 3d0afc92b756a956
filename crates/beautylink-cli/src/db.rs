//! `db` sub-commands: connectivity, migrations and catalog seeding.

use beautylink_core::AppConfig;
use clap::Subcommand;
use sqlx::PgPool;

/// Sub-commands available under `db`.
#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert the service catalog from the services file
    Seed,
}

/// Connects with the pool settings from `config`.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool_config = beautylink_db::PoolConfig::from_app_config(config);
    let pool = beautylink_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

pub(crate) async fn run_db(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    match command {
        DbCommands::Ping => {
            beautylink_db::ping(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = beautylink_db::run_migrations(&pool).await?;
            println!("applied {applied} new migration(s)");
        }
        DbCommands::Seed => run_seed(&pool, config).await?,
    }
    Ok(())
}

/// Loads the services file and upserts every entry.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or if the
/// seeding transaction fails.
async fn run_seed(pool: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let file = beautylink_core::load_services(&config.services_path)?;
    if file.services.is_empty() {
        println!(
            "no services in {}; nothing to seed",
            config.services_path.display()
        );
        return Ok(());
    }

    let seeded = beautylink_db::seed_services(pool, &file.services).await?;
    tracing::info!(seeded, path = %config.services_path.display(), "service catalog seeded");
    println!("seeded {seeded} services");
    Ok(())
}
