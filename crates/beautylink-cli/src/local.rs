//! Commands backed by the local state file: address lookup with a remembered
//! search location, and the install-app prompt.

use beautylink_core::providers::LocationQuery;
use beautylink_core::{AppConfig, LocalStore};
use beautylink_remote::GeocodeClient;
use chrono::{DateTime, Utc};
use clap::Subcommand;

/// Sub-commands available under `prompt`.
#[derive(Debug, Subcommand)]
pub enum PromptCommands {
    /// Show whether the install prompt is due, and record it as shown if so
    Status,
    /// Never show the install prompt again
    Dismiss,
}

/// Looks up `query` and prints the suggestions. With `save`, the first
/// suggestion becomes the default provider search location.
///
/// # Errors
///
/// Returns an error if the geocoder call fails or the state file cannot be
/// written.
pub(crate) async fn run_geocode(config: &AppConfig, query: &str, save: bool) -> anyhow::Result<()> {
    let geocoder = GeocodeClient::new(
        &config.geocoder_base_url,
        config.http_timeout_secs,
        &config.user_agent,
    )?;
    let results = geocoder.search(query).await?;

    if results.is_empty() {
        println!("no places found for '{query}'");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. {:<28}{:>9.4} {:>9.4}  {}",
            i + 1,
            result.location_label(),
            result.coords.lat,
            result.coords.lon,
            result.display_name
        );
    }

    if save {
        let first = &results[0];
        let mut store = LocalStore::open(&config.state_path)?;
        store.set_user_location(LocationQuery {
            query: first.location_label(),
            coords: Some(first.coords),
        })?;
        println!("saved '{}' as your search location", first.location_label());
    }
    Ok(())
}

/// Text shown for the prompt state at `now`; records the prompt as shown when
/// it is due.
pub(crate) fn prompt_status(store: &mut LocalStore, now: DateTime<Utc>) -> anyhow::Result<String> {
    if store.install_prompt_dismissed() {
        return Ok("install prompt dismissed; it will not be shown again".to_string());
    }
    if store.should_show_install_prompt(now) {
        store.record_install_prompt_shown(now)?;
        return Ok("Install the BeautyLink app for faster booking and notifications.".to_string());
    }

    let last = store
        .install_prompt_last_shown()
        .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
    Ok(format!("install prompt not due (last shown {last})"))
}

pub(crate) fn run_prompt(config: &AppConfig, command: PromptCommands) -> anyhow::Result<()> {
    let mut store = LocalStore::open(&config.state_path)?;
    match command {
        PromptCommands::Status => println!("{}", prompt_status(&mut store, Utc::now())?),
        PromptCommands::Dismiss => {
            store.dismiss_install_prompt()?;
            println!("install prompt dismissed");
        }
    }
    Ok(())
}
