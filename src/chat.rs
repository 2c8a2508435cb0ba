// Interactive terminal session. One process is one session, so the rate
// window lives as long as the prompt does.

use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::client::DecisionClient;
use crate::error::DecisionError;

/// Split a comma separated line into raw options. Blank entries are kept,
/// the client filters them.
pub fn parse_option_line(line: &str) -> Vec<String> {
    line.split(',').map(str::to_string).collect()
}

/// Text printed for one submitted line at `now` (ms since epoch).
///
/// A rate-limited line only reports the wait; the next line is checked
/// against the window again.
pub async fn respond_at(client: &DecisionClient, now: i64, line: &str) -> String {
    match client.decide_at(now, &parse_option_line(line)).await {
        Ok(result) => format!("The best option is... {}\n{}", result.best_option, result.reasoning),
        Err(DecisionError::RateLimited { retry_after_seconds }) => {
            format!("Slow down! You can ask again in {}s.", retry_after_seconds)
        }
        Err(err) => format!("{}: {}", err.title(), err),
    }
}

pub async fn run_decision_chat(client: &DecisionClient) -> Result<()> {
    info!("Starting decision chat...");
    println!("Enter your options separated by commas (empty line to quit):");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };
        if line.trim().is_empty() {
            break;
        }

        let now = chrono::Utc::now().timestamp_millis();
        println!("{}", respond_at(client, now, &line).await);
    }

    info!("Decision chat finished.");
    Ok(())
}
