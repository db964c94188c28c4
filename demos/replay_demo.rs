//! Demonstration of FitWise Coach on synthetic squat frames.
//!
//! This example shows how to:
//! 1. Produce JSON Lines pose frames (here, a generated side-on squatter)
//! 2. Replay them through a collector
//! 3. Evaluate each frame and print count/message changes
//! 4. Build a workout summary
//!
//! Run with: cargo run --example replay_demo

use std::io::Cursor;

use fitwise_coach::{
    core::profile::SQUAT_ID,
    pose::types::{LANDMARK_COUNT, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER},
    stats::SessionLog,
    FrameSize, Keypoint, PoseFrame, RepEngine, ReplayCollector, Session, SummaryBuilder,
    COACHING_NOTES,
};

const FPS: u64 = 10;

/// A side-on squatter whose knee angle follows a 4 second cycle.
///
/// The first cycles only reach 130°, the later ones go down to 70°, and the
/// back leans forward halfway through.
fn synthetic_frame(i: u64) -> PoseFrame {
    let t = i as f64 / FPS as f64;
    let depth = if t < 8.0 { 25.0 } else { 55.0 };
    let knee = 180.0 - depth + depth * (std::f64::consts::PI * t / 2.0).cos();
    let back: f64 = if (12.0..14.0).contains(&t) { 130.0 } else { 180.0 };

    let mut keypoints = vec![Keypoint::new(0.5, 0.5).with_visibility(0.9); LANDMARK_COUNT];
    let hip = Keypoint::new(0.5, 0.5);
    let knee_dir = (-90.0 + back).to_radians();
    let knee_pt = Keypoint::new(hip.x + 0.2 * knee_dir.cos(), hip.y + 0.2 * knee_dir.sin());
    let ankle_dir = knee_dir + std::f64::consts::PI + knee.to_radians();

    keypoints[LEFT_SHOULDER] = Keypoint::new(0.5, 0.2);
    keypoints[LEFT_HIP] = hip;
    keypoints[LEFT_KNEE] = knee_pt;
    keypoints[LEFT_ANKLE] = Keypoint::new(
        knee_pt.x + 0.2 * ankle_dir.cos(),
        knee_pt.y + 0.2 * ankle_dir.sin(),
    );

    PoseFrame::new(i * 1000 / FPS, keypoints)
}

fn main() {
    println!("FitWise Coach - Replay Demo");
    println!("===========================");
    println!("{COACHING_NOTES}");

    // 24 seconds of frames as JSON Lines
    let mut input = String::new();
    for i in 0..=24 * FPS {
        match serde_json::to_string(&synthetic_frame(i)) {
            Ok(line) => {
                input.push_str(&line);
                input.push('\n');
            }
            Err(e) => {
                eprintln!("Error serializing frame: {e}");
                return;
            }
        }
    }

    let mut replay = ReplayCollector::new(Cursor::new(input));
    if let Err(e) = replay.start() {
        eprintln!("Error starting replay: {e}");
        return;
    }

    let engine = RepEngine::with_defaults();
    let mut session = Session::new();
    let log = SessionLog::new();
    let mut builder = SummaryBuilder::new().with_target_reps(3);
    // Square frame keeps the generated angles undistorted.
    let frame = FrameSize::new(480, 480);

    println!("Instance ID: {}", builder.instance_id());
    println!();

    let mut last_message: Option<String> = None;
    for pose in replay.receiver().iter() {
        let evaluation = match engine.evaluate_frame(&mut session, SQUAT_ID, &pose, frame) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                eprintln!("Skipping frame: {e}");
                log.record_skipped_frame();
                continue;
            }
        };

        log.record_evaluation(&evaluation, true);
        builder.record(&evaluation, pose.timestamp());

        let message = evaluation.message().map(str::to_string);
        if message.is_some() && message != last_message {
            println!(
                "[{:>5.1}s] reps: {} | {}",
                pose.timestamp().as_secs_f64(),
                evaluation.count,
                message.as_deref().unwrap_or("")
            );
        }
        last_message = message;
    }

    let Some(profile) = engine.registry().resolve(SQUAT_ID).ok() else {
        eprintln!("Squat profile missing");
        return;
    };
    let summary = builder.build(profile);

    println!();
    println!("{}", log.summary());
    println!();
    println!("Workout summary:");
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing summary: {e}"),
    }
}
