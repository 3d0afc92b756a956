//! Beta test tracker commands.
//!
//! `catalog` reads the embedded checklist only; every other sub-command
//! talks to the database.

use beautylink_core::beta::{
    broken_reports, embedded_catalog, overview, summarize_testers, BetaCatalog, TestAction,
    TestRole, TestStatus, TrackerState,
};
use beautylink_core::AppConfig;
use chrono::Utc;
use clap::Subcommand;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;

/// Sub-commands available under `beta`.
#[derive(Debug, Subcommand)]
pub enum BetaCommands {
    /// List the tests of a role
    Catalog {
        /// client or provider
        #[arg(long)]
        role: TestRole,
    },
    /// Show a tester's checklist
    Status {
        #[arg(long)]
        role: TestRole,
        #[arg(long)]
        user: Uuid,
    },
    /// Record a test result
    Mark {
        #[arg(long)]
        role: TestRole,
        #[arg(long)]
        user: Uuid,
        /// Test id, e.g. client_signup
        #[arg(long)]
        test: String,
        /// working or broken
        #[arg(long)]
        status: TestStatus,
        /// What went wrong (broken only)
        #[arg(long)]
        comment: Option<String>,
        /// Device the test ran on
        #[arg(long)]
        device: Option<String>,
    },
    /// Put every test of a tester back to pending
    Reset {
        #[arg(long)]
        role: TestRole,
        #[arg(long)]
        user: Uuid,
    },
    /// Progress of every tester plus all broken reports
    Report,
}

fn status_marker(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Pending => "[ ]",
        TestStatus::Working => "[x]",
        TestStatus::Broken => "[!]",
    }
}

pub(crate) fn action_for(status: TestStatus, comment: Option<String>) -> anyhow::Result<TestAction> {
    match status {
        TestStatus::Working => {
            if comment.is_some() {
                tracing::debug!("comment ignored when marking a test working");
            }
            Ok(TestAction::MarkWorking)
        }
        TestStatus::Broken => Ok(TestAction::MarkBroken {
            comment: comment.unwrap_or_default(),
        }),
        TestStatus::Pending => {
            anyhow::bail!("a test cannot be marked pending; use `beta reset` instead")
        }
    }
}

pub(crate) async fn run_beta(config: &AppConfig, command: BetaCommands) -> anyhow::Result<()> {
    let catalog = embedded_catalog()?;

    if let BetaCommands::Catalog { role } = command {
        print_catalog(catalog, role);
        return Ok(());
    }

    let pool = db::connect(config).await?;
    match command {
        BetaCommands::Catalog { .. } => {}
        BetaCommands::Status { role, user } => run_status(&pool, catalog, role, user).await?,
        BetaCommands::Mark {
            role,
            user,
            test,
            status,
            comment,
            device,
        } => {
            let action = action_for(status, comment)?;
            run_mark(&pool, catalog, role, user, &test, action, device).await?;
        }
        BetaCommands::Reset { role, user } => run_reset(&pool, catalog, role, user).await?,
        BetaCommands::Report => run_report(&pool, catalog).await?,
    }
    Ok(())
}

fn print_catalog(catalog: &BetaCatalog, role: TestRole) {
    let mut category = "";
    for def in catalog.for_role(role) {
        if def.category != category {
            category = &def.category;
            println!("{category}");
        }
        println!("  {:<28}{}", def.id, def.name);
    }
}

async fn run_status(
    pool: &PgPool,
    catalog: &BetaCatalog,
    role: TestRole,
    user: Uuid,
) -> anyhow::Result<()> {
    let rows = beautylink_db::list_beta_results_for_user(pool, user, role).await?;
    let tracker = TrackerState::new(user, role, rows);
    let counts = tracker.counts(catalog);

    println!(
        "{role} tester {user}: {}% complete ({} working, {} broken, {} pending)",
        counts.completion_rate, counts.working, counts.broken, counts.pending
    );
    for def in catalog.for_role(role) {
        let status = tracker.status(&def.id);
        print!("{} {:<28}{}", status_marker(status), def.id, def.name);
        match tracker.result(&def.id).and_then(|r| r.comment.as_deref()) {
            Some(comment) if status == TestStatus::Broken && !comment.is_empty() => {
                println!(" \u{2014} {comment}");
            }
            _ => println!(),
        }
    }
    Ok(())
}

async fn run_mark(
    pool: &PgPool,
    catalog: &BetaCatalog,
    role: TestRole,
    user: Uuid,
    test_id: &str,
    action: TestAction,
    device: Option<String>,
) -> anyhow::Result<()> {
    let rows = beautylink_db::list_beta_results_for_user(pool, user, role).await?;
    let mut tracker = TrackerState::new(user, role, rows);
    let result = tracker.apply(catalog, test_id, action, Utc::now(), device)?;
    let stored = beautylink_db::upsert_beta_result(pool, &result).await?;

    println!("{} marked {}", stored.test_id, stored.status);
    Ok(())
}

async fn run_reset(
    pool: &PgPool,
    catalog: &BetaCatalog,
    role: TestRole,
    user: Uuid,
) -> anyhow::Result<()> {
    let rows = beautylink_db::list_beta_results_for_user(pool, user, role).await?;
    let mut tracker = TrackerState::new(user, role, rows);
    let cleared = beautylink_db::reset_beta_results(pool, user, role).await?;
    tracker.reset();

    let counts = tracker.counts(catalog);
    println!(
        "reset {cleared} result(s) for {role} tester {user}; {} test(s) pending",
        counts.pending
    );
    Ok(())
}

async fn run_report(pool: &PgPool, catalog: &BetaCatalog) -> anyhow::Result<()> {
    let rows = beautylink_db::list_all_beta_results(pool).await?;
    if rows.is_empty() {
        println!("no beta test results recorded yet");
        return Ok(());
    }

    let testers = summarize_testers(&rows, catalog);
    let totals = overview(&testers);
    println!(
        "{} tester(s), {}% complete overall ({} working, {} broken)",
        totals.testers,
        totals.counts.completion_rate,
        totals.counts.working,
        totals.counts.broken
    );

    println!();
    println!("{:<38}{:<18}{:<10}LAST TESTED", "TESTER", "ROLES", "DONE");
    for t in &testers {
        let roles = t
            .roles
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join("+");
        let last = t.last_tested_at.map_or_else(
            || "\u{2014}".to_string(),
            |at| at.format("%Y-%m-%d %H:%M").to_string(),
        );
        let tester = t.user_id.to_string();
        let done = format!("{}%", t.counts.completion_rate);
        println!("{tester:<38}{roles:<18}{done:<10}{last}");
    }

    let broken = broken_reports(&rows, catalog);
    if !broken.is_empty() {
        println!();
        println!("broken reports");
        for report in &broken {
            println!(
                "  {} {} ({}) by {}",
                report.tested_at.format("%Y-%m-%d %H:%M"),
                report.test_name.as_deref().unwrap_or(&report.test_id),
                report.role,
                report.user_id
            );
            if let Some(comment) = report.comment.as_deref().filter(|c| !c.is_empty()) {
                println!("      {comment}");
            }
            if let Some(device) = report.device_info.as_deref() {
                println!("      device: {device}");
            }
        }
    }
    Ok(())
}
