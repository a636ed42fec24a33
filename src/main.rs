// This is the entry point of the AI moderator.
//
// **Architecture Overview:**
// - `core/` = Moderation pipeline (host-agnostic)
// - `infra/` = Implementations of core traits (classifier HTTP client, config file)
// - `server/` = Console game-server host (event adapters, operator commands)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the governing loop: host input in, resolved content out

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "server/server_layer.rs"]
mod server;

use crate::core::moderation::{
    ActionDispatcher, Actor, ContentGate, GateReport, ModerationService, ModerationSnapshot,
    Resolution,
};
use crate::infra::config::FileConfigSource;
use crate::server::commands::{aimreload, aimstatus};
use crate::server::events::{ChatMessage, GameServer, SignEdit, SignedBook};
use crate::server::{ConsoleInput, ConsoleServer};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// How long shutdown waits for in-flight analyses.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

enum Flow {
    Continue,
    Stop,
}

/// Handle one console line on the governing loop.
async fn handle_input(
    line: &str,
    server: &Arc<ConsoleServer>,
    gate: &mut ContentGate<Arc<ConsoleServer>>,
    moderation: &ModerationService,
    config: &FileConfigSource,
) -> Flow {
    let input = match ConsoleInput::parse(line) {
        Ok(input) => input,
        Err(e) => {
            server.emit(format!("[Console] {}", e));
            return Flow::Continue;
        }
    };

    let world: Arc<dyn GameServer> = server.clone();

    match input {
        ConsoleInput::Stop => return Flow::Stop,
        ConsoleInput::Reload => server.emit(aimreload(moderation, config).await),
        ConsoleInput::Status => server.emit(aimstatus(moderation, gate).await),
        ConsoleInput::Chat { player, .. }
        | ConsoleInput::Book { player, .. }
        | ConsoleInput::Sign { player, .. }
            if server.is_banned(&player) =>
        {
            server.emit(format!("[Server] {} is banned from this server", player));
        }
        ConsoleInput::Chat { player, message } => {
            gate.intercept(Box::new(ChatMessage::new(world, Actor::new(player), message)))
                .await;
        }
        ConsoleInput::Book {
            player,
            title,
            pages,
            signing: true,
        } => {
            gate.intercept(Box::new(SignedBook::new(
                world,
                Actor::new(player),
                title,
                pages,
            )))
            .await;
        }
        ConsoleInput::Book {
            player,
            title,
            pages,
            signing: false,
        } => {
            world.write_book(&Actor::new(player), &title, &pages, false);
        }
        ConsoleInput::Sign { player, pos, lines } => {
            gate.intercept(Box::new(SignEdit::new(world, Actor::new(player), pos, lines)))
                .await;
        }
    }

    Flow::Continue
}

/// Operator line for a blocked event; accepted content speaks for itself.
fn blocked_notice(report: &GateReport) -> Option<String> {
    if report.resolution != Resolution::Blocked {
        return None;
    }

    let rule = report.rule.as_deref().unwrap_or("-");
    let action = match &report.dispatched {
        Some(outcome) => format!("{:?}", outcome),
        None => "nothing dispatched".to_string(),
    };
    Some(format!(
        "[AIModerator] Blocked {} from {}: {} ({})",
        report.kind, report.actor, rule, action
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ai_moderator=info")),
        )
        .init();

    // Initialize config source and load the first snapshot
    let config = FileConfigSource::from_env();
    if let Err(e) = config.ensure_default_file().await {
        tracing::warn!(path = %config.path().display(), error = %e, "Could not write default config");
    }

    let moderation = Arc::new(ModerationService::new(ModerationSnapshot::unconfigured()));
    if let Err(e) = moderation.reload(&config).await {
        tracing::warn!(
            error = %e,
            "Starting without a classifier, run aimreload once the config is fixed"
        );
    }

    let server = Arc::new(ConsoleServer::new());
    let mut gate = ContentGate::new(moderation.clone(), ActionDispatcher::new(server.clone()));

    server.emit("[AIModerator] Ready. Type chat/book/draft/sign events, aimreload, aimstatus or stop.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                match handle_input(&line, &server, &mut gate, &moderation, &config).await {
                    Flow::Continue => {}
                    Flow::Stop => break,
                }
            }
            Some(completed) = gate.next_completed() => {
                let report = gate.resolve(completed);
                if let Some(notice) = blocked_notice(&report) {
                    server.emit(notice);
                }
            }
        }
    }

    tracing::info!(in_flight = gate.in_flight(), "Shutting down");
    let abandoned = gate.drain(SHUTDOWN_GRACE).await;
    if abandoned > 0 {
        tracing::warn!(abandoned, "Exited with analyses still pending");
    }

    Ok(())
}
