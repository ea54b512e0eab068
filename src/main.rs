// src/main.rs - Plans the configured job and runs it on the simulated stepper
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;

use bluemarlin::config;
use bluemarlin::motion::{MotionError, MotionPlanner, shared_motion_buffer};
use bluemarlin::print_job::PrintJob;
use bluemarlin::scheduler::{SleepIdle, StopHandle};
use bluemarlin::simulator::StepperSimulator;

#[derive(Parser, Debug)]
#[command(name = "bluemarlin", version, about = "Motion planner host")]
struct Args {
    /// Configuration file
    #[arg(default_value = "printer.toml")]
    config: String,

    /// Simulated execution speed, 2.0 runs twice as fast as the real machine
    #[arg(long, default_value_t = 1.0)]
    time_scale: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    tracing::info!("Starting BlueMarlin motion host");
    tracing::info!("Loading configuration from: {}", args.config);

    let config = config::load_config(&args.config)?;
    let parameter = Arc::new(config.parameter()?);
    tracing::info!(
        "Printer: {} ({:?})",
        if config.printer.printer_name.is_empty() { "Unknown" } else { config.printer.printer_name.as_str() },
        config.printer.kinematics
    );
    tracing::info!("Max jerk: {} mm/s, acceleration: {} mm/s²", parameter.max_jerk, parameter.acceleration);

    let motion_buffer = shared_motion_buffer();
    let stop = StopHandle::new();
    let mut planner: MotionPlanner = MotionPlanner::new(
        parameter,
        config.kinematics(),
        Arc::clone(&motion_buffer),
        Box::new(SleepIdle::default()),
        stop.clone(),
    )?;
    let mut simulator = StepperSimulator::new(Arc::clone(&motion_buffer)).with_position(&planner.axis_position());

    let mut job = PrintJob::new(config.job.moves.clone(), config.job.default_feedrate);
    tracing::info!("Job has {} moves", job.len());

    let mut producer = tokio::task::spawn_blocking(move || job.run(&mut planner));

    let time_scale = if args.time_scale > 0.0 { args.time_scale } else { 1.0 };
    let producer_done = Arc::new(AtomicBool::new(false));
    let consumer_done = Arc::clone(&producer_done);
    let consumer_stop = stop.clone();
    let consumer = tokio::spawn(async move {
        let mut poll = tokio::time::interval(Duration::from_millis(5));
        while !consumer_stop.is_stop_requested() {
            let done = consumer_done.load(Ordering::SeqCst);
            match simulator.step()? {
                Some(block) => {
                    let seconds = block.duration() / time_scale;
                    if seconds.is_finite() && seconds > 0.0 {
                        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
                    }
                }
                // Producer finished and the buffer ran dry
                None if done => break,
                None => {
                    poll.tick().await;
                }
            }
        }
        Ok::<_, MotionError>(simulator)
    });

    let finished = tokio::select! {
        result = &mut producer => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let summary = match finished {
        Some(result) => result?,
        None => {
            tracing::warn!("Interrupted, requesting emergency stop");
            stop.request_stop();
            producer.await?
        }
    };
    producer_done.store(true, Ordering::SeqCst);

    let simulator = consumer.await??;
    match summary {
        Ok(summary) => tracing::info!(
            "Planned {} of {} moves ({} too small)",
            summary.enqueued,
            summary.requested,
            summary.rejected
        ),
        Err(MotionError::Aborted) => tracing::warn!("Job aborted"),
        Err(e) => {
            tracing::error!("Job failed: {}", e);
            return Err(e.into());
        }
    }
    tracing::info!(
        "Executed {} blocks, {} step events, {:.2}s machine time, final position {:?}",
        simulator.executed_blocks(),
        simulator.step_events(),
        simulator.elapsed().as_secs_f64(),
        simulator.position()
    );
    Ok(())
}
