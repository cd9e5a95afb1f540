use anyhow::{bail, Result};
use rakat_counter::config::Config;
use rakat_counter::prayer::{Prayer, PrayerDefinition};
use rakat_counter::recording::load_recording;
use rakat_counter::tracker::{RakatTracker, TrackerEvent};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("usage: {} <recording.jsonl> [prayer]", args[0]);
    }
    let recording_path = &args[1];

    let config = Config::load_or_default(CONFIG_PATH);
    let preset = match args.get(2) {
        Some(name) => Some(name.parse::<Prayer>()?),
        None if config.session.components.is_empty() => Some(config.session.prayer.parse::<Prayer>()?),
        None => None,
    };
    let definition = match preset {
        Some(prayer) => PrayerDefinition::from_preset(prayer),
        None => PrayerDefinition::from_config(&config.session)?,
    };

    println!("Rakat Counter ({})", env!("GIT_VERSION"));
    println!("Recording: {}", recording_path);
    if let Some(prayer) = preset {
        println!("Prayer: {} ({})", prayer.name(), prayer.arabic());
    }
    println!(
        "Sensitivity: {}, stability frames: {}",
        config.tuning.sensitivity, config.tuning.stability_frames
    );
    for (i, c) in definition.components().iter().enumerate() {
        println!("  [{}] {}: {} rakats", i, c.label, c.target_rakats);
    }
    println!();

    let frames = load_recording(recording_path)?;
    println!("Frames: {}", frames.len());

    let mut tracker = RakatTracker::new(&config);
    tracker.start_component(definition, 0)?;

    let base = Instant::now();
    for recorded in frames {
        let now = recorded.instant(base);
        let ms = recorded.timestamp_ms;
        let frame = recorded.into_frame();
        let mut completed = false;

        for event in tracker.process_frame(&frame, now) {
            completed |= matches!(event, TrackerEvent::ComponentCompleted { .. });
            print_event(ms, &event);
        }

        if completed && !tracker.advance_to_next_component() {
            break;
        }
    }

    println!();
    match tracker.stop() {
        Some(session) => {
            println!(
                "Component {} ({}): rakat {}/{}, sujood {}, {}",
                session.component_index(),
                session.component().label,
                session.current_rakat(),
                session.total_rakats(),
                session.sujood_in_rakat(),
                if session.is_completed() { "completed" } else { "incomplete" }
            );
            println!("Progress: {}/{}", session.progress(), session.total_rakats() * 2);
        }
        None => println!("No session"),
    }
    println!("Auto-corrections: {}", tracker.auto_corrections());

    Ok(())
}

fn print_event(ms: u64, event: &TrackerEvent) {
    let t = ms as f32 / 1000.0;
    match event {
        TrackerEvent::PostureChanged { posture, confidence } => {
            println!("{:8.2}s  posture   {} ({}%)", t, posture, confidence)
        }
        TrackerEvent::SujoodRecorded { count } => println!("{:8.2}s  sujood    {}/2", t, count),
        TrackerEvent::RakatAdvanced { rakat } => println!("{:8.2}s  rakat     {}", t, rakat),
        TrackerEvent::ComponentCompleted { component_index } => {
            println!("{:8.2}s  completed component {}", t, component_index)
        }
        TrackerEvent::CorrectionApplied { reason, count } => {
            println!("{:8.2}s  corrected x{}: {}", t, count, reason.description())
        }
        TrackerEvent::InferenceLogged { message, .. } => println!("{:8.2}s  note      {}", t, message),
    }
}
