//! Pipeline Console
//!
//! Runs one pipeline in-process and plays the remote client on the terminal:
//! prints every notification and answers input prompts from stdin.
//!
//! Usage: `pipeline-console [data_size]`

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use interactive_pipeline::config::ConfigManager;
use interactive_pipeline::control::ControlSurface;
use interactive_pipeline::events::{Notification, NotificationStatus};
use interactive_pipeline::gate::InputRequest;
use interactive_pipeline::logging::init_structured_logging;

const SESSION_ID: &str = "console";

#[tokio::main]
async fn main() -> Result<()> {
    init_structured_logging();

    let data_size = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<u64>())
        .transpose()
        .context("data_size must be a non-negative integer")?;

    let config_manager = ConfigManager::load().context("failed to load pipeline configuration")?;
    let surface = ControlSurface::bootstrap(config_manager);
    let mut notifications = surface.subscribe();
    surface.connect(SESSION_ID);

    let run = surface.launch(data_size).await.context("failed to launch pipeline")?;
    info!(run_id = %run.run_id(), "Pipeline launched");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut chain_ended = false;

    loop {
        let notification = tokio::select! {
            received = notifications.recv() => match received {
                Ok(notification) => notification,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Console fell behind - notifications dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            _ = signal::ctrl_c() => {
                info!("Interrupted - cancelling pending input");
                break;
            }
        };

        print_notification(&notification);

        match notification.status {
            NotificationStatus::InputRequired => {
                if let Some(request) = notification.request_input {
                    surface.bind_active_task(SESSION_ID, &request.task_id)?;
                    print_prompt(&request);
                    let line = stdin.next_line().await?.unwrap_or_default();
                    let answer = resolve_answer(&request, line.trim());
                    surface
                        .submit_response(&request.task_id, request.sequence, &answer)
                        .await?;
                }
            }
            NotificationStatus::Completed | NotificationStatus::Error => {
                chain_ended = true;
                break;
            }
            _ => {}
        }
    }

    surface.disconnect(SESSION_ID).await?;
    if chain_ended {
        let result = run.wait().await.context("pipeline run failed")?;
        println!(
            "\n{}",
            serde_json::to_string_pretty(&result).context("failed to render final result")?
        );
    }
    Ok(())
}

fn print_notification(notification: &Notification) {
    let body = match &notification.result {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    match &notification.progress_info {
        Some(progress) => println!(
            "[{:>5.1}%] {} | {}",
            progress.overall_progress_percent, notification.task_name, body
        ),
        None => println!(
            "[{}] {} | {}",
            notification.status, notification.task_name, body
        ),
    }
}

fn print_prompt(request: &InputRequest) {
    println!("\n? {}", request.prompt);
    for (i, option) in request.options.iter().enumerate() {
        println!("  {}) {}", i + 1, option);
    }
    println!("  (timeout: {}s)", request.timeout_seconds);
}

/// A bare number picks the matching option of a select prompt
fn resolve_answer(request: &InputRequest, line: &str) -> Value {
    if !request.options.is_empty() {
        if let Some(option) = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| request.options.get(i))
        {
            return Value::String(option.clone());
        }
    }
    Value::String(line.to_string())
}
