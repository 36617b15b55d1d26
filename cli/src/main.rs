//! Waypoint CLI - line-oriented REPL over the intent engine.
//!
//! ```text
//! stdin line -> repl::parse -> Engine::handle_turn -> reply + [kind tier resolution]
//!                    |
//!                    v
//!              :ui / :focus / :options edit the simulated host screen
//! ```
//!
//! The Claude bridge is used when an API key is configured (config file or
//! `ANTHROPIC_API_KEY`); otherwise every bridge call fails fast and only the
//! deterministic tiers answer.

mod repl;

use std::{
    env,
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::SystemTime,
};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use waypoint_engine::config::{BridgeProvider, Tuning, WaypointConfig};
use waypoint_engine::context::InMemoryTranscript;
use waypoint_engine::providers::{LlmBridge, claude::ClaudeBridge, offline::OfflineBridge};
use waypoint_engine::types::{ChatMessage, ConversationId, NonEmptyString, UserScope, VisiblePanel};
use waypoint_engine::{
    Engine, FileSessionStore, InMemoryDataSource, InMemorySessionStore, RecordingExecutor,
    RetrievalExecutor, SessionStore, TurnInput, TurnOutcome,
};

use repl::{Line, Screen};

const CONVERSATION: &str = "repl";
const USER_ENV: &str = "WAYPOINT_USER";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Replies go to stdout; no log file means no logs.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!("Failed to create log dir {}: {e}", parent.display()));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!("Failed to open log file {}: {e}", candidate.display()));
            }
        }
    }

    (None, warnings)
}

fn waypoint_dir() -> Option<PathBuf> {
    WaypointConfig::path().and_then(|path| path.parent().map(PathBuf::from))
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.waypoint/logs/waypoint.log
    if let Some(dir) = waypoint_dir() {
        candidates.push(dir.join("logs").join("waypoint.log"));
    }

    // Fallback: ./.waypoint/logs/waypoint.log
    candidates.push(PathBuf::from(".waypoint").join("logs").join("waypoint.log"));

    candidates
}

fn select_bridge(tuning: &Tuning) -> Arc<dyn LlmBridge> {
    if tuning.bridge.provider == BridgeProvider::Offline || tuning.bridge.api_key.is_none() {
        tracing::info!("No bridge API key configured; running offline");
        return Arc::new(OfflineBridge);
    }
    match ClaudeBridge::new(&tuning.bridge) {
        Ok(bridge) => Arc::new(bridge),
        Err(err) => {
            tracing::warn!(error = %err, "Claude bridge unavailable; running offline");
            Arc::new(OfflineBridge)
        }
    }
}

/// `--persist` keeps session state under `~/.waypoint/sessions`.
fn select_store() -> Arc<dyn SessionStore> {
    if env::args().any(|arg| arg == "--persist")
        && let Some(dir) = waypoint_dir()
    {
        match FileSessionStore::new(dir.join("sessions")) {
            Ok(store) => return Arc::new(store),
            Err(err) => {
                tracing::warn!(error = %err, "Session dir unavailable; keeping state in memory");
            }
        }
    }
    Arc::new(InMemorySessionStore::new())
}

fn default_panels() -> Vec<VisiblePanel> {
    ["Panel D", "Panel E", "Calendar"]
        .into_iter()
        .map(|title| VisiblePanel::new(format!("panel-{}", repl::slug(title)), title))
        .collect()
}

fn describe(outcome: &TurnOutcome) -> String {
    let resolution = outcome.resolution.as_ref().map_or("none", |r| r.tag());
    format!("[{:?} {} {resolution}]", outcome.kind, outcome.tier)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = WaypointConfig::load().ok().flatten();
    let tuning = Tuning::from_config(config.as_ref());
    let user = UserScope::new(env::var(USER_ENV).unwrap_or_else(|_| "local".to_string()));

    let transcript = Arc::new(InMemoryTranscript::new());
    let executor = Arc::new(RetrievalExecutor::new(
        Arc::new(RecordingExecutor::new()),
        Arc::new(InMemoryDataSource::default()),
    ));
    let engine = Engine::builder()
        .bridge(select_bridge(&tuning))
        .source(transcript.clone())
        .executor(executor)
        .store(select_store())
        .tuning(tuning)
        .build();

    let conversation = ConversationId::new(CONVERSATION);
    let panels = default_panels();
    let mut screen = Screen::default();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout.write_all(b"waypoint ready (:help for commands)\n> ").await?;
    stdout.flush().await?;

    while let Some(raw) = lines.next_line().await? {
        let now = SystemTime::now();
        let output = match repl::parse(&raw) {
            Line::Quit => break,
            Line::Empty => String::new(),
            Line::Help => repl::HELP.to_string(),
            Line::Unknown(command) => format!("Unknown command :{command}"),
            Line::Ui(specs) => {
                screen.set_widgets(&specs);
                if screen.snapshot.focused_widget.is_none() {
                    engine.release_focus(&conversation, now).await;
                }
                format!("{} widget(s) visible", screen.snapshot.widgets.len())
            }
            Line::Focus(title) => match screen.focus(&title) {
                Some((id, title)) => {
                    engine.focus_widget(&conversation, id, title.clone(), now).await;
                    format!("Focused {title}")
                }
                None => format!("No visible widget called {title}"),
            },
            Line::Unfocus => {
                screen.unfocus();
                engine.release_focus(&conversation, now).await;
                "Focus released".to_string()
            }
            Line::Options(labels) => {
                let candidates: Vec<_> = labels.iter().map(|l| repl::candidate(l)).collect();
                let id = transcript.next_message_id(&conversation);
                let message = ChatMessage::assistant(id.value(), "Which one?", now)
                    .with_options(candidates.clone());
                transcript.append(&conversation, message);
                engine.register_options(&conversation, candidates, Some(id), now).await;
                format!("Showing {} option(s)", labels.len())
            }
            Line::State => {
                let state = engine.snapshot(&conversation).await;
                serde_json::to_string_pretty(&state)?
            }
            Line::Chat(text) => {
                let Ok(text) = NonEmptyString::new(text) else {
                    continue;
                };
                let user_id = transcript.next_message_id(&conversation);
                transcript.append(
                    &conversation,
                    ChatMessage::user(user_id.value(), text.as_str(), now),
                );

                let input = TurnInput::new(conversation.clone(), text, user.clone(), now)
                    .with_ui(screen.snapshot.clone())
                    .with_panels(panels.clone());
                let outcome = engine.handle_turn(input).await;

                if !outcome.is_cancelled() {
                    let reply_id = transcript.next_message_id(&conversation);
                    transcript.append(
                        &conversation,
                        outcome.to_assistant_message(reply_id, SystemTime::now()),
                    );
                }
                format!("{}\n{}", outcome.reply, describe(&outcome))
            }
        };

        if !output.is_empty() {
            stdout.write_all(output.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}
