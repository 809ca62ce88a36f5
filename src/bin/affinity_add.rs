//! Runs one extension message through the reconciliation engine from the
//! command line and prints the JSON response.
//!
//! Usage: `affinity_add <message.json>` where the file holds
//! `{"action": "addToAffinity" | "checkDuplicate", "data": {...}}`.

use affinity_stealth_adder::config::{AffinitySettings, Config};
use affinity_stealth_adder::models::{AddToAffinityResponse, ClientMessage};
use affinity_stealth_adder::pipeline::ReconciliationEngine;
use anyhow::Context;
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "affinity_stealth_adder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let path = env::args()
        .nth(1)
        .context("usage: affinity_add <message.json>")?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path))?;
    let message: ClientMessage =
        serde_json::from_str(&raw).with_context(|| format!("invalid message in {}", path))?;

    let config = Config::from_env()?;
    let engine = ReconciliationEngine::from_config(&config, AffinitySettings::from_env())?;

    let response = match message {
        ClientMessage::AddToAffinity(record) => serde_json::to_string_pretty(
            &AddToAffinityResponse::from(engine.add_to_affinity(&record).await),
        )?,
        ClientMessage::CheckDuplicate(record) => {
            serde_json::to_string_pretty(&engine.check_duplicate(&record).await)?
        }
    };

    println!("{}", response);
    Ok(())
}
