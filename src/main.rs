//! tagrelay - Entry point for the mail relay

use anyhow::Context;

use tagrelay::config::Settings;
use tagrelay::providers::{ImapMailbox, SmtpOutbox};
use tagrelay::services::ForwardService;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("Run aborted: {:#}", e);
        println!("{:#}", e);
        std::process::exit(1);
    }

    println!("done");
}

async fn run() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());

    let settings = Settings::load(&config_path)?;

    let mailbox = ImapMailbox::new(settings.source.clone());
    let outbox = SmtpOutbox::new(&settings.target);
    let service = ForwardService::new(mailbox, outbox, &settings)?;

    let report = match settings.time_budget() {
        Some(budget) => tokio::time::timeout(budget, service.run())
            .await
            .with_context(|| {
                format!("run exceeded time budget of {}s", budget.as_secs())
            })??,
        None => service.run().await?,
    };

    tracing::info!(
        forwarded = report.forwarded,
        skipped = report.skipped,
        rejected = report.rejected,
        "run complete"
    );
    Ok(())
}
