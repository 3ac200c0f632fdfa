use crate::infra::trace::{DecodeSampleDetails, MotorFrameDetails, TraceKind, TraceWriter};
use crate::runtime::config::{ConfigError, RuntimeConfig};
use crate::runtime::logging::init_tracing;
use pmsm_core::{
    decode_run, step24, FrameDriver, GeometryError, Motor, PhaseDecoder, PhaseReading, RunStats,
    Simulation,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Frames between motor progress log lines.
const MOTOR_LOG_EVERY: u64 = 60;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Trace output failed: {0}")]
    Trace(#[from] std::io::Error),

    #[error("Stator update rejected: {0}")]
    Geometry(#[from] GeometryError),
}

#[derive(Debug, Default, Serialize)]
struct MotorSummary {
    frames: u64,
    frames_late: u64,
    max_lag_us: u64,
    final_theta: f64,
    final_frequency: f64,
    mean_back_emf: Vec<f64>,
}

#[derive(Debug, Default, Serialize)]
struct PhaseSummary {
    samples: usize,
    final_phase: u8,
    final_velocity: i32,
    max_velocity: i32,
}

#[derive(Debug, Default, Serialize)]
struct RunSummary {
    motor: Option<MotorSummary>,
    phase: Option<PhaseSummary>,
}

pub fn run_from_args() {
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("Run with --help for usage.");
            std::process::exit(2);
        }
    };
    if config.show_help {
        RuntimeConfig::print_help();
        return;
    }

    if let Err(err) = init_tracing(config.log_format) {
        eprintln!("warning: logging not initialized: {err}");
    }

    if let Err(err) = run(config) {
        error!(error = %err, "Simulation failed");
        std::process::exit(1);
    }
}

pub fn run(config: RuntimeConfig) -> Result<(), RunError> {
    config.validate()?;

    let trace = match config.trace_path.as_ref() {
        Some(path) => {
            info!(path = %path.display(), "Trace output enabled");
            Some(TraceWriter::new(path)?)
        }
        None => None,
    };

    if let Some(ref trace) = trace {
        trace.log_event(
            0,
            TraceKind::RunStart,
            &serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "mode": config.mode,
                "motor": config.motor_params(),
                "decoder": config.decoder_params(),
                "synth": config.synth_params(),
                "drive_amplitude": config.drive_amplitude,
            }),
        )?;
    }

    let mut summary = RunSummary::default();

    if config.mode.runs_motor() {
        summary.motor = Some(run_motor(&config, trace.as_ref())?);
    }
    if config.mode.runs_phase() {
        summary.phase = Some(run_phase(&config, trace.as_ref())?);
    }

    if let Some(ref trace) = trace {
        trace.log_event(0, TraceKind::RunEnd, &summary)?;
        trace.flush()?;
    }

    info!("Run complete");
    Ok(())
}

fn run_motor(config: &RuntimeConfig, trace: Option<&TraceWriter>) -> Result<MotorSummary, RunError> {
    let params = config.motor_params();
    let motor = Motor::new(&params);

    info!(
        rotor_poles = params.rotor_poles,
        stator_slots = motor.slots().len(),
        samples_per_slot = motor.slots().first().map_or(0, |slot| slot.len()),
        rotor_dipoles = motor.rotor().dipoles().len(),
        target_rpm = config.target_rpm,
        frames = config.frames,
        realtime = config.realtime,
        "Starting motor simulation"
    );

    let mut driver = FrameDriver::new(motor, config.driver_config());
    let stop = AtomicBool::new(false);
    let mut failure: Option<RunError> = None;
    let mut air_gap = params.air_gap;

    driver.run(Some(config.frames), &stop, |frame, motor| {
        let snapshot = motor.snapshot();

        if frame % MOTOR_LOG_EVERY == 0 {
            debug!(
                frame,
                theta = snapshot.theta,
                frequency = snapshot.frequency,
                u = snapshot.voltages.u,
                v = snapshot.voltages.v,
                w = snapshot.voltages.w,
                "Motor frame"
            );
        }

        if let Some(trace) = trace {
            let details = MotorFrameDetails { snapshot, air_gap };
            if let Err(err) = trace.log_event(frame, TraceKind::MotorFrame, &details) {
                failure = Some(err.into());
                stop.store(true, Ordering::Relaxed);
                return;
            }
        }

        if let Some(target) = config.air_gap_to {
            let progress = (frame + 1) as f64 / config.frames as f64;
            air_gap = params.air_gap + (target - params.air_gap) * progress;
            let diameter = params.rotor_diameter + air_gap;
            if let Err(err) =
                motor.reshape_stator(diameter, params.stator_poles, params.stator_gap)
            {
                failure = Some(err.into());
                stop.store(true, Ordering::Relaxed);
            }
        }
    });

    if let Some(err) = failure {
        return Err(err);
    }

    let stats: RunStats = driver.stats().clone();
    if stats.frames_late > 0 {
        warn!(
            frames_late = stats.frames_late,
            max_lag_us = stats.max_lag_us,
            "Motor simulation fell behind the frame clock"
        );
    }

    let motor = driver.into_inner();
    let mean_back_emf: Vec<f64> = motor.slots().iter().map(|slot| slot.mean_back_emf()).collect();

    info!(
        frames = stats.frames_executed,
        theta = motor.theta(),
        frequency = motor.frequency(),
        "Motor simulation finished"
    );

    Ok(MotorSummary {
        frames: stats.frames_executed,
        frames_late: stats.frames_late,
        max_lag_us: stats.max_lag_us,
        final_theta: motor.theta(),
        final_frequency: motor.frequency(),
        mean_back_emf,
    })
}

fn run_phase(config: &RuntimeConfig, trace: Option<&TraceWriter>) -> Result<PhaseSummary, RunError> {
    let synth = config.synth_params();
    let mut decoder = PhaseDecoder::new(config.decoder_params());

    info!(
        amplitude = synth.amplitude,
        frequency = synth.frequency,
        samples = synth.sample_count,
        sweep = synth.sweep,
        noise = synth.noise_ratio,
        interval = config.interval,
        "Starting phase decoder run"
    );

    let samples = decode_run(&mut decoder, &synth);

    if let Some(trace) = trace {
        for (index, sample) in samples.iter().enumerate() {
            let details = DecodeSampleDetails {
                adc_u: sample.sample.adc_u(),
                adc_v: sample.sample.adc_v(),
                reading: sample.reading,
                drive: step24::duty(config.drive_amplitude, sample.reading.phase),
            };
            trace.log_event(index as u64, TraceKind::DecodeSample, &details)?;
        }
    }

    let last = samples.last().map_or(PhaseReading::default(), |s| s.reading);
    let max_velocity = samples
        .iter()
        .map(|s| s.reading.velocity)
        .max()
        .unwrap_or_default();

    info!(
        samples = samples.len(),
        phase = last.phase,
        velocity = last.velocity,
        max_velocity,
        "Phase decoder run finished"
    );

    Ok(PhaseSummary {
        samples: samples.len(),
        final_phase: last.phase,
        final_velocity: last.velocity,
        max_velocity,
    })
}
