//! Terminal surface for the feedback coordinator.
//!
//! Stands in for the mobile screens: announcements print instead of being
//! synthesized, haptic patterns print instead of buzzing. Single-letter
//! commands drive the three sessions; ctrl-c exits.

use anyhow::Context;
use pathsense_core::{
    FeedbackConfig, FeedbackCoordinator, FeedbackEvent, HapticMotor, NavigationStep, Route,
    Speaker, SpeechOptions, QUICK_DESTINATIONS,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints utterances the way a TTS engine would speak them.
struct ConsoleSpeaker;

impl Speaker for ConsoleSpeaker {
    fn speak(&self, text: &str, options: &SpeechOptions) -> pathsense_core::FeedbackResult<()> {
        println!("🔊 [{} r{:.1}] {}", options.language, options.rate, text);
        Ok(())
    }
}

/// Prints vibration patterns the way a motor would play them.
struct ConsoleMotor;

impl HapticMotor for ConsoleMotor {
    fn vibrate(&self, pattern: &[u64]) -> pathsense_core::FeedbackResult<()> {
        println!("📳 {:?}", pattern);
        Ok(())
    }
}

fn load_config() -> anyhow::Result<FeedbackConfig> {
    match std::env::var("PATHSENSE_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("read config {}", path))?;
            let config: FeedbackConfig =
                toml::from_str(&raw).with_context(|| format!("parse config {}", path))?;
            Ok(config)
        }
        Err(_) => Ok(FeedbackConfig::default()),
    }
}

fn load_route() -> anyhow::Result<Route> {
    match std::env::var("PATHSENSE_ROUTE") {
        Ok(path) => {
            let raw =
                std::fs::read_to_string(&path).with_context(|| format!("read route {}", path))?;
            let steps: Vec<NavigationStep> =
                serde_json::from_str(&raw).with_context(|| format!("parse route {}", path))?;
            Ok(Route::new(steps)?)
        }
        Err(_) => Ok(Route::default_indoor()),
    }
}

fn print_help() {
    println!("commands:");
    println!("  d            start object detection");
    println!("  D            stop object detection");
    println!("  v            describe current view");
    println!("  n <dest>     start navigation (bare `n` lists quick destinations)");
    println!("  a            advance to the next step");
    println!("  r            repeat current instruction");
    println!("  x            stop navigation");
    println!("  l            listen for a voice command (simulated)");
    println!("  L            stop listening");
    println!("  s <phrase>   dispatch a spoken phrase directly");
    println!("  c            list voice commands");
    println!("  h            this help");
    println!("  q            quit");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    let route = load_route()?;
    let (mut coordinator, mut events) = FeedbackCoordinator::new(
        config.clone(),
        Arc::new(ConsoleSpeaker),
        Arc::new(ConsoleMotor),
        Arc::new(pathsense_core::SimulatedDetector::new(
            Arc::new(pathsense_core::SystemEntropy),
            config.detection.clone(),
        )),
        Arc::new(pathsense_core::SimulatedRecognizer::new(
            Arc::new(pathsense_core::SystemEntropy),
            config.voice.recognition_delay_ms,
        )),
        route,
        pathsense_core::CommandTable::builtin(),
    )?;

    println!("pathsense console - type h for help");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                let (cmd, arg) = match line.split_once(' ') {
                    Some((c, a)) => (c, a.trim()),
                    None => (line, ""),
                };
                match cmd {
                    "" => {}
                    "d" => coordinator.detection.start(),
                    "D" => coordinator.detection.stop(),
                    "v" => coordinator.detection.describe_view(),
                    "n" => {
                        if arg.is_empty() {
                            for dest in QUICK_DESTINATIONS {
                                println!("  {:<12} {}", dest.id, dest.name);
                            }
                        } else {
                            let name = QUICK_DESTINATIONS
                                .iter()
                                .find(|d| d.id.eq_ignore_ascii_case(arg))
                                .map(|d| d.name.to_string())
                                .unwrap_or_else(|| arg.to_string());
                            coordinator.navigation.start(name);
                        }
                    }
                    "a" => coordinator.navigation.advance(),
                    "r" => coordinator.navigation.repeat(),
                    "x" => coordinator.navigation.stop(),
                    "l" => coordinator.voice.start_listening(),
                    "L" => coordinator.voice.stop_listening(),
                    "s" => {
                        if arg.is_empty() {
                            println!("usage: s <phrase>");
                        } else {
                            coordinator.voice.dispatch(arg);
                        }
                    }
                    "c" => {
                        for command in coordinator.voice.table().commands() {
                            println!("  \"{}\" - {} [{}]", command.phrase, command.description, command.category);
                        }
                    }
                    "h" => print_help(),
                    "q" => break,
                    other => println!("unknown command: {} (h for help)", other),
                }
            }
            event = events.recv() => {
                if let Some(event) = event {
                    handle_event(&coordinator, event);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down");
                break;
            }
        }
    }

    coordinator.detection.stop();
    coordinator.navigation.stop();
    coordinator.voice.stop_listening();
    Ok(())
}

fn handle_event(coordinator: &FeedbackCoordinator, event: FeedbackEvent) {
    match event {
        FeedbackEvent::ObjectDetected { object, .. } => {
            tracing::info!(
                category = %object.category,
                proximity = %object.proximity,
                confidence = %format!("{:.0}%", object.confidence * 100.0),
                "sighting"
            );
        }
        FeedbackEvent::StepAdvanced { ordinal, .. } => {
            let (current, total) = coordinator.navigation.progress();
            tracing::info!(
                ordinal,
                steps_walked = coordinator.navigation.step_count(),
                "step {current} of {total}"
            );
        }
        FeedbackEvent::Arrived { destination, .. } => {
            tracing::info!(%destination, "arrived");
        }
        FeedbackEvent::UtteranceRecognized { phrase, .. } => {
            tracing::info!(%phrase, "recognized");
        }
        _ => {}
    }
}
