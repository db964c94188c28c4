//! FitWise Coach CLI
//!
//! Counts exercise repetitions and gives form feedback from pose keypoints.

use chrono::Utc;
use clap::{Parser, Subcommand};
use fitwise_coach::{
    config::Config,
    core::{RepEngine, Session, SummaryBuilder, WorkoutSummary},
    pose::{FrameSize, ReplayCollector},
    stats::create_shared_log_with_persistence,
    COACHING_NOTES, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fitwise-coach")]
#[command(author = "FitWise")]
#[command(version = VERSION)]
#[command(about = "Exercise rep counting and form feedback from pose keypoints", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track an exercise from a stream of JSON Lines pose frames
    Run {
        /// Exercise id or name (defaults to the configured exercise)
        #[arg(long, short)]
        exercise: Option<String>,

        /// Frame file to replay ("-" or omitted reads stdin)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Frame width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Frame height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Stop once this many reps are counted
        #[arg(long)]
        target_reps: Option<u32>,
    },

    /// List available exercises
    Exercises,

    /// Show cumulative statistics
    Status,

    /// Explain how feedback is chosen
    About,

    /// Combine saved workout summaries into one file
    Export {
        /// Output directory for the combined export
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Show configuration
    Config,

    /// Serve per-frame evaluation over HTTP
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            exercise,
            input,
            width,
            height,
            target_reps,
        } => {
            cmd_run(exercise, input, width, height, target_reps);
        }
        Commands::Exercises => {
            cmd_exercises();
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::About => {
            cmd_about();
        }
        Commands::Export { output, format } => {
            cmd_export(output, &format);
        }
        Commands::Config => {
            cmd_config();
        }
        #[cfg(feature = "server")]
        Commands::Serve { port } => {
            cmd_serve(port);
        }
    }
}

/// Log to stderr so frame-by-frame output on stdout stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(
    exercise: Option<String>,
    input: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    target_reps: Option<u32>,
) {
    println!("FitWise Coach v{VERSION}");
    println!();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let exercise = exercise.unwrap_or_else(|| config.default_exercise.clone());
    let profile = match registry.resolve(&exercise) {
        Ok(profile) => profile.clone(),
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Run 'fitwise-coach exercises' to list available exercises.");
            std::process::exit(1);
        }
    };

    let frame = FrameSize::new(
        width.unwrap_or(config.frame.width),
        height.unwrap_or(config.frame.height),
    );
    if frame.width == 0 || frame.height == 0 {
        eprintln!("Error: Frame size must be non-zero");
        std::process::exit(1);
    }

    let mut collector = match input {
        Some(ref path) if path.as_os_str() != "-" => match ReplayCollector::from_path(path) {
            Ok(collector) => collector,
            Err(e) => {
                eprintln!("Error opening {path:?}: {e}");
                std::process::exit(1);
            }
        },
        _ => ReplayCollector::stdin(),
    };

    println!("Tracking {} (id {})", profile.name, profile.id);
    println!("  Frame size: {}x{}", frame.width, frame.height);
    println!(
        "  Thresholds: down <= {:.0}°, up >= {:.0}°",
        profile.down_threshold, profile.up_threshold
    );
    if let Some(target) = target_reps {
        println!("  Target: {target} reps");
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stats_log = create_shared_log_with_persistence(config.data_path.join("stats.json"));
    let engine = RepEngine::new(registry, config.coaching.clone());
    let mut session = Session::new();

    let mut builder = SummaryBuilder::new();
    if let Some(target) = target_reps {
        builder = builder.with_target_reps(target);
    }
    tracing::info!("Instance ID: {}", builder.instance_id());

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    if let Err(e) = collector.start() {
        eprintln!("Error starting frame reader: {e}");
        std::process::exit(1);
    }

    let receiver = collector.receiver().clone();
    let mut last_shown: (u32, Option<String>) = (0, None);

    while running.load(Ordering::SeqCst) {
        let pose = match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(pose) => pose,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        };

        let evaluation = match engine.evaluate_frame(&mut session, &profile.id, &pose, frame) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                tracing::warn!("Skipping frame at {}ms: {}", pose.timestamp_ms, e);
                stats_log.record_skipped_frame();
                continue;
            }
        };

        stats_log.record_evaluation(&evaluation, true);
        builder.record(&evaluation, pose.timestamp());

        let shown = (evaluation.count, evaluation.message().map(str::to_string));
        if shown != last_shown {
            println!(
                "[{:>8.2}s] reps: {:<3} {}",
                pose.timestamp().as_secs_f64(),
                shown.0,
                shown.1.as_deref().unwrap_or("")
            );
            last_shown = shown;
        }

        if target_reps.map_or(false, |t| evaluation.count >= t) {
            println!();
            println!("Target reached!");
            break;
        }
    }

    println!();
    println!("Stopping...");
    collector.stop();
    stats_log.record_skipped_frames(collector.skipped_lines());

    if builder.frames() > 0 {
        let summary = builder.build(&profile);
        println!(
            "Completed {} {} rep(s) in {:.1}s",
            summary.completed_reps, summary.exercise_name, summary.duration_secs
        );
        export_summary(&config.export_path, &summary);
    } else {
        println!("No frames were evaluated.");
    }

    if let Err(e) = stats_log.save() {
        eprintln!("Warning: Could not save session stats: {e}");
    }

    println!();
    println!("{}", stats_log.summary());
}

fn export_summary(export_dir: &Path, summary: &WorkoutSummary) {
    let export_path = export_dir.join(format!(
        "summary_{}.json",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));

    if let Some(parent) = export_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match serde_json::to_string_pretty(summary) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&export_path, json) {
                eprintln!("Error writing summary: {e}");
            } else {
                println!("Exported summary to {export_path:?}");
            }
        }
        Err(e) => {
            eprintln!("Error serializing summary: {e}");
        }
    }
}

fn cmd_exercises() {
    let config = Config::load().unwrap_or_default();
    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("Available Exercises");
    println!("===================");
    println!();
    for profile in registry.profiles() {
        let marker = if profile.id == config.default_exercise {
            " (default)"
        } else {
            ""
        };
        println!("{:>4}  {}{}", profile.id, profile.name, marker);
        println!(
            "      joints {:?}, down <= {:.0}°, up >= {:.0}°, cooldown {:.1}s",
            profile.triplet.indices(),
            profile.down_threshold,
            profile.up_threshold,
            profile.cooldown.as_secs_f64()
        );
        println!("      depth check: {:?}", profile.depth_policy);
    }
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("FitWise Coach Status");
    println!("====================");
    println!();

    println!("Configuration:");
    println!("  Default exercise: {}", config.default_exercise);
    println!("  Frame size: {}x{}", config.frame.width, config.frame.height);
    println!("  Smoothing window: {}", config.coaching.smoothing_window);
    println!(
        "  Depth check period: {:.1}s",
        config.coaching.depth_check_period.as_secs_f64()
    );
    println!(
        "  Posture tolerance: {:.0}°",
        config.coaching.posture_tolerance_deg
    );
    println!("  Custom profiles: {}", config.custom_profiles.len());
    println!();

    // Load and show cumulative stats if available
    let stats_path = config.data_path.join("stats.json");
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                if let Some(frames) = stats.get("frames_evaluated") {
                    println!("  Frames evaluated: {frames}");
                }
                if let Some(skipped) = stats.get("frames_skipped") {
                    println!("  Frames skipped: {skipped}");
                }
                if let Some(reps) = stats.get("reps_counted") {
                    println!("  Reps counted: {reps}");
                }
                if let Some(depth) = stats.get("depth_warnings") {
                    println!("  Depth warnings: {depth}");
                }
                if let Some(posture) = stats.get("posture_warnings") {
                    println!("  Posture warnings: {posture}");
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_about() {
    println!("{COACHING_NOTES}");
}

fn cmd_export(output: Option<PathBuf>, format: &str) {
    let config = Config::load().unwrap_or_default();
    let export_dir = output.unwrap_or(config.export_path.clone());

    // Summaries are always read from the configured export path
    let summary_files: Vec<PathBuf> = std::fs::read_dir(&config.export_path)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.extension().map(|e| e == "json").unwrap_or(false)
                        && p.file_name()
                            .and_then(|n| n.to_str())
                            .map(|n| n.starts_with("summary_"))
                            .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();

    if summary_files.is_empty() {
        println!("No workout summaries found in {:?}", config.export_path);
        println!("Run 'fitwise-coach run' to record a workout.");
        return;
    }

    println!(
        "Found {} summary file(s) in {:?}",
        summary_files.len(),
        config.export_path
    );

    let mut summaries: Vec<WorkoutSummary> = Vec::new();
    for file in &summary_files {
        match std::fs::read_to_string(file)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<WorkoutSummary>(&content).map_err(|e| e.to_string())
            }) {
            Ok(summary) => summaries.push(summary),
            Err(e) => eprintln!("Warning: Skipping {file:?}: {e}"),
        }
    }
    summaries.sort_by(|a, b| a.started_at_utc.cmp(&b.started_at_utc));

    println!("Total workouts: {}", summaries.len());

    if let Err(e) = std::fs::create_dir_all(&export_dir) {
        eprintln!("Error creating {export_dir:?}: {e}");
        return;
    }

    let output_path = export_dir.join(format!(
        "export_{}.{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        if format == "jsonl" { "jsonl" } else { "json" }
    ));

    let result = if format == "jsonl" {
        // JSON Lines format
        let lines: Vec<String> = summaries
            .iter()
            .filter_map(|s| serde_json::to_string(s).ok())
            .collect();
        std::fs::write(&output_path, lines.join("\n"))
    } else {
        // Pretty JSON format
        match serde_json::to_string_pretty(&summaries) {
            Ok(json) => std::fs::write(&output_path, json),
            Err(e) => {
                eprintln!("Error serializing: {e}");
                return;
            }
        }
    };

    match result {
        Ok(_) => println!("Exported to {output_path:?}"),
        Err(e) => eprintln!("Error writing export: {e}"),
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

#[cfg(feature = "server")]
fn cmd_serve(port: Option<u16>) {
    use fitwise_coach::server::{run, ServerConfig};

    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let server_config = match ServerConfig::from_config(&config, port.unwrap_or(config.server_port))
    {
        Ok(server_config) => server_config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting async runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async move {
        let (addr, shutdown_tx, server_task) = match run(server_config).await {
            Ok(bound) => bound,
            Err(e) => {
                eprintln!("Error starting server: {e}");
                std::process::exit(1);
            }
        };

        println!("FitWise Coach v{VERSION} listening on http://{addr}");
        println!("Press Ctrl+C to stop");

        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Error waiting for Ctrl+C: {e}");
        }

        println!();
        println!("Stopping server...");
        let _ = shutdown_tx.send(());
        if let Err(e) = server_task.await {
            eprintln!("Server task failed: {e}");
        }
    });
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
