//! Application entry point — SoulTalk terminal client.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the session (falls back to the local placeholder on failure).
//! 4. Open the audio output and spawn the capture worker.
//! 5. Spawn the pipeline orchestrator as a tokio task.
//! 6. Run the terminal loop: every Enter press is the primary control;
//!    notices from the orchestrator are printed as they arrive.
//!
//! The primary control is disabled at this intake layer while the pipeline
//! is `Thinking`; the state machine enforces the same rule internally.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use soultalk::{
    api::{ApiExchange, TurnExchange, LOCAL_SESSION_ID},
    audio::MicCapture,
    config::AppConfig,
    pipeline::{new_shared_state, Notice, PipelineEvent, PipelineOrchestrator, Role},
    playback::SpeakerPlayback,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().context("failed to load settings.toml")?;
    log::info!("soultalk starting, server = {}", config.server.base_url);

    let exchange: Arc<dyn TurnExchange> = Arc::new(ApiExchange::from_config(&config.server));

    // One session per interaction lifetime; a failure degrades to the local
    // placeholder rather than blocking the flow.
    let session_id = match exchange.create_session().await {
        Ok(id) => id,
        Err(e) => {
            log::warn!("session creation failed ({e}), using local placeholder");
            LOCAL_SESSION_ID.to_string()
        }
    };

    let (events_tx, events_rx) = mpsc::channel::<PipelineEvent>(16);
    let (notices_tx, mut notices_rx) = mpsc::channel::<Notice>(16);

    let capture = Box::new(MicCapture::new());
    // `_output_stream` must outlive playback; it stays on the main thread.
    let (playback, _output_stream) =
        SpeakerPlayback::new(events_tx.clone()).context("failed to open audio output")?;

    let state = new_shared_state(session_id);
    let orchestrator = PipelineOrchestrator::new(
        Arc::clone(&state),
        capture,
        Box::new(playback),
        exchange,
        notices_tx,
        Duration::from_millis(config.chat.pacing_delay_ms),
    );
    tokio::spawn(orchestrator.run(events_rx));

    println!("I'm here. Whenever you're ready.");
    println!("(press Enter to talk, Enter again to stop; Ctrl-D quits)\n");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(_) => {
                        // Intake-layer guard: the control is inert while the
                        // exchange is in flight.
                        let busy = state.lock().unwrap().state.is_busy();
                        if busy {
                            log::debug!("primary control disabled while thinking");
                        } else {
                            let _ = events_tx.send(PipelineEvent::PrimaryPressed).await;
                        }
                    }
                    None => break, // stdin closed
                }
            }

            notice = notices_rx.recv() => {
                match notice {
                    Some(Notice::StateChanged(new_state)) => {
                        println!("[{}]", new_state.label());
                    }
                    Some(Notice::MessageAppended(message)) => {
                        let who = match message.role {
                            Role::User => "you",
                            Role::Assistant => "assistant",
                        };
                        println!("{who}: {}", message.text);
                        if let Some(emotion) = &message.emotion {
                            println!(
                                "  ({} {:.0}% — {})",
                                emotion.emotion,
                                emotion.intensity * 100.0,
                                emotion.summary
                            );
                        }
                    }
                    None => break, // orchestrator gone
                }
            }
        }
    }

    log::info!("soultalk shutting down");
    Ok(())
}
