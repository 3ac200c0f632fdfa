use super::logging::LogFormat;
use pmsm_core::phase::DEFAULT_NEUTRAL;
use pmsm_core::step24::MAX_AMPLITUDE;
use pmsm_core::{DecoderParams, DriverConfig, MotorParams, SynthParams};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const STATOR_POLES: [usize; 4] = [1, 2, 3, 4];
pub const ROTOR_POLES: [usize; 6] = [2, 4, 6, 8, 12, 16];
/// Stator gap slider resolution.
pub const STATOR_GAP_STEPS: u32 = 24;
/// Magnet gap slider resolution.
pub const MAGNET_GAP_STEPS: u32 = 16;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing value for {0}")]
    MissingValue(String),

    #[error("Invalid value {value:?} for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("Unknown mode {0:?} (expected motor, phase or both)")]
    UnknownMode(String),

    #[error("Unsupported stator pole count {0} (expected 1-4)")]
    StatorPoles(usize),

    #[error("Unsupported rotor pole count {0} (expected 2, 4, 6, 8, 12 or 16)")]
    RotorPoles(usize),

    #[error("Stator gap {0}/24 out of range (expected 0-23)")]
    StatorGap(u32),

    #[error("Magnet gap {0}/16 out of range (expected 0-15)")]
    MagnetGap(u32),

    #[error("Frame rate must be positive, got {0}")]
    FrameRate(f64),

    #[error("Decoder amplitude {0} out of range (expected 1-127)")]
    Amplitude(f64),

    #[error("Drive amplitude {0} out of range (expected 0-61)")]
    DriveAmplitude(u8),

    #[error("Sample count must be positive")]
    SampleCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Motor,
    Phase,
    Both,
}

impl Mode {
    pub fn runs_motor(self) -> bool {
        matches!(self, Mode::Motor | Mode::Both)
    }

    pub fn runs_phase(self) -> bool {
        matches!(self, Mode::Phase | Mode::Both)
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "motor" => Ok(Mode::Motor),
            "phase" => Ok(Mode::Phase),
            "both" => Ok(Mode::Both),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub mode: Mode,
    pub log_format: LogFormat,
    pub trace_path: Option<PathBuf>,
    // Motor
    pub frames: u64,
    pub frame_rate: f64,
    pub realtime: bool,
    pub stator_poles: usize,
    pub rotor_poles: usize,
    pub stator_gap: u32,
    pub magnet_gap: u32,
    pub air_gap: f64,
    /// Air gap to reach by the last frame, moving the stator in place.
    pub air_gap_to: Option<f64>,
    pub target_rpm: f64,
    pub acceleration: f64,
    pub wave_scale: f64,
    // Phase decoder
    pub amplitude: f64,
    pub frequency: f64,
    pub samples: usize,
    pub sweep: bool,
    pub noise: f64,
    pub seed: u64,
    pub interval: u32,
    pub drive_amplitude: u8,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let motor = MotorParams::default();
        let synth = SynthParams::default();
        let decoder = DecoderParams::default();
        Self {
            show_help: false,
            mode: Mode::Both,
            log_format: LogFormat::Pretty,
            trace_path: None,
            frames: 600,
            frame_rate: DriverConfig::default().frame_rate,
            realtime: false,
            stator_poles: motor.stator_poles,
            rotor_poles: motor.rotor_poles,
            stator_gap: 0,
            magnet_gap: 0,
            air_gap: motor.air_gap,
            air_gap_to: None,
            target_rpm: 30.0,
            acceleration: motor.acceleration_time,
            wave_scale: motor.wave_scale,
            amplitude: synth.amplitude,
            frequency: synth.frequency,
            samples: synth.sample_count,
            sweep: synth.sweep,
            noise: synth.noise_ratio,
            seed: synth.seed,
            interval: decoder.sampling_interval,
            drive_amplitude: MAX_AMPLITUDE,
        }
    }
}

fn raw_value(args: &[String], i: usize) -> Result<&str, ConfigError> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingValue(args[i].clone()))
}

fn value<T: FromStr>(args: &[String], i: usize) -> Result<T, ConfigError> {
    let raw = raw_value(args, i)?;
    raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        flag: args[i].clone(),
        value: raw.to_string(),
    })
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--mode" => {
                    cfg.mode = raw_value(args, i)?.parse()?;
                    i += 1;
                }
                "--json-logs" => {
                    cfg.log_format = LogFormat::Json;
                }
                "--trace" => {
                    cfg.trace_path = Some(value(args, i)?);
                    i += 1;
                }
                "--frames" => {
                    cfg.frames = value(args, i)?;
                    i += 1;
                }
                "--frame-rate" => {
                    cfg.frame_rate = value(args, i)?;
                    i += 1;
                }
                "--realtime" => {
                    cfg.realtime = true;
                }
                "--stator-poles" => {
                    cfg.stator_poles = value(args, i)?;
                    i += 1;
                }
                "--rotor-poles" => {
                    cfg.rotor_poles = value(args, i)?;
                    i += 1;
                }
                "--stator-gap" => {
                    cfg.stator_gap = value(args, i)?;
                    i += 1;
                }
                "--magnet-gap" => {
                    cfg.magnet_gap = value(args, i)?;
                    i += 1;
                }
                "--air-gap" => {
                    cfg.air_gap = value(args, i)?;
                    i += 1;
                }
                "--air-gap-to" => {
                    cfg.air_gap_to = Some(value(args, i)?);
                    i += 1;
                }
                "--rpm" => {
                    cfg.target_rpm = value(args, i)?;
                    i += 1;
                }
                "--acc" => {
                    cfg.acceleration = value(args, i)?;
                    i += 1;
                }
                "--wave-scale" => {
                    cfg.wave_scale = value(args, i)?;
                    i += 1;
                }
                "--amp" => {
                    cfg.amplitude = value(args, i)?;
                    i += 1;
                }
                "--freq" => {
                    cfg.frequency = value(args, i)?;
                    i += 1;
                }
                "--samples" => {
                    cfg.samples = value(args, i)?;
                    i += 1;
                }
                "--sweep" => {
                    cfg.sweep = true;
                }
                "--noise" => {
                    cfg.noise = value(args, i)?;
                    i += 1;
                }
                "--seed" => {
                    cfg.seed = value(args, i)?;
                    i += 1;
                }
                "--interval" => {
                    cfg.interval = value(args, i)?;
                    i += 1;
                }
                "--drive-amp" => {
                    cfg.drive_amplitude = value(args, i)?;
                    i += 1;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        Ok(cfg)
    }

    /// Rejects settings outside what the simulator exposes interactively.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !STATOR_POLES.contains(&self.stator_poles) {
            return Err(ConfigError::StatorPoles(self.stator_poles));
        }
        if !ROTOR_POLES.contains(&self.rotor_poles) {
            return Err(ConfigError::RotorPoles(self.rotor_poles));
        }
        if self.stator_gap >= STATOR_GAP_STEPS {
            return Err(ConfigError::StatorGap(self.stator_gap));
        }
        if self.magnet_gap >= MAGNET_GAP_STEPS {
            return Err(ConfigError::MagnetGap(self.magnet_gap));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(ConfigError::FrameRate(self.frame_rate));
        }
        if !(1.0..=127.0).contains(&self.amplitude) {
            return Err(ConfigError::Amplitude(self.amplitude));
        }
        if self.drive_amplitude > MAX_AMPLITUDE {
            return Err(ConfigError::DriveAmplitude(self.drive_amplitude));
        }
        if self.samples == 0 {
            return Err(ConfigError::SampleCount);
        }
        Ok(())
    }

    pub fn motor_params(&self) -> MotorParams {
        MotorParams {
            air_gap: self.air_gap,
            rotor_poles: self.rotor_poles,
            magnet_gap: f64::from(self.magnet_gap) / f64::from(MAGNET_GAP_STEPS),
            stator_poles: self.stator_poles,
            stator_gap: f64::from(self.stator_gap) / f64::from(STATOR_GAP_STEPS),
            target_frequency: self.target_rpm / 60.0,
            acceleration_time: self.acceleration,
            wave_scale: self.wave_scale,
            ..Default::default()
        }
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            frame_rate: self.frame_rate,
            realtime: self.realtime,
        }
    }

    pub fn decoder_params(&self) -> DecoderParams {
        DecoderParams {
            neutral: DEFAULT_NEUTRAL,
            sampling_interval: self.interval,
        }
    }

    pub fn synth_params(&self) -> SynthParams {
        SynthParams {
            amplitude: self.amplitude,
            frequency: self.frequency,
            sample_count: self.samples,
            sweep: self.sweep,
            noise_ratio: self.noise,
            seed: self.seed,
        }
    }

    pub fn print_help() {
        println!(
            r#"pmsm-sim - Permanent-magnet synchronous motor field and phase-decoder simulator

USAGE:
    pmsm-sim [OPTIONS]

OPTIONS:
    --mode <MODE>           What to run: motor, phase or both [default: both]
    --trace <PATH>          Append a JSONL trace of every frame and decode sample
    --json-logs             Output logs in JSON format

  Motor:
    --frames <N>            Frames to simulate [default: 600]
    --frame-rate <FPS>      Simulation frames per second [default: 60]
    --realtime              Pace frames at the frame rate
    --stator-poles <N>      Stator poles, 3 slots each (1-4) [default: 4]
    --rotor-poles <N>       Rotor poles (2, 4, 6, 8, 12, 16) [default: 16]
    --stator-gap <N>        Slot gap in 24ths of the slot pitch [default: 0]
    --magnet-gap <N>        Magnet gap in 16ths of the pole pitch [default: 0]
    --air-gap <X>           Air gap added to the rotor diameter [default: 5]
    --air-gap-to <X>        Move the stator in place to this air gap over the run
    --rpm <RPM>             Target speed [default: 30]
    --acc <FRAMES>          Frequency lag time constant; 0 snaps [default: 1]
    --wave-scale <X>        Gain of the per-phase EMF readout [default: 0.2]

  Phase decoder:
    --amp <COUNTS>          Synthetic waveform amplitude (1-127) [default: 127]
    --freq <CYCLES>         Waveform frequency [default: 1]
    --samples <N>           Samples per run [default: 6000]
    --sweep                 Ramp the frequency up from zero across the run
    --noise <RATIO>         Uniform noise as a fraction of amplitude [default: 0.05]
    --seed <N>              Noise seed [default: 0]
    --interval <N>          Velocity publishes every N+1 decode calls [default: 100]
    --drive-amp <N>         24-step drive amplitude (0-61) [default: 61]

    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,pmsm_core=trace)

EXAMPLES:
    # Spin an 8-pole rotor for ten seconds and record the EMF trace
    pmsm-sim --mode motor --rotor-poles 8 --rpm 60 --frames 600 --trace run.jsonl

    # Decode a noisy swept waveform
    pmsm-sim --mode phase --sweep --noise 0.1
"#
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("pmsm-sim")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = RuntimeConfig::from_args(&args(&[])).unwrap();
        assert_eq!(cfg.mode, Mode::Both);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn json_logs_flag_selects_json_format() {
        let cfg = RuntimeConfig::from_args(&args(&["--json-logs", "--frames", "5"])).unwrap();
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.frames, 5);
    }

    #[test]
    fn parses_motor_flags() {
        let cfg = RuntimeConfig::from_args(&args(&[
            "--mode", "motor", "--rotor-poles", "8", "--stator-gap", "6", "--rpm", "120",
        ]))
        .unwrap();
        let params = cfg.motor_params();
        assert_eq!(cfg.mode, Mode::Motor);
        assert_eq!(params.rotor_poles, 8);
        assert_eq!(params.stator_gap, 0.25);
        assert_eq!(params.target_frequency, 2.0);
    }

    #[test]
    fn rejects_unparsable_value() {
        let err = RuntimeConfig::from_args(&args(&["--frames", "many"])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                flag: "--frames".to_string(),
                value: "many".to_string()
            }
        );
    }

    #[test]
    fn rejects_missing_value() {
        let err = RuntimeConfig::from_args(&args(&["--trace"])).unwrap_err();
        assert_eq!(err, ConfigError::MissingValue("--trace".to_string()));
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = RuntimeConfig::from_args(&args(&["--mode", "sideways"])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownMode("sideways".to_string()));
    }

    #[test]
    fn validate_rejects_unsupported_poles_and_gaps() {
        let mut cfg = RuntimeConfig::default();
        cfg.rotor_poles = 5;
        assert_eq!(cfg.validate(), Err(ConfigError::RotorPoles(5)));

        let mut cfg = RuntimeConfig::default();
        cfg.stator_poles = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::StatorPoles(0)));

        let mut cfg = RuntimeConfig::default();
        cfg.magnet_gap = 16;
        assert_eq!(cfg.validate(), Err(ConfigError::MagnetGap(16)));
    }

    #[test]
    fn validate_rejects_bad_decoder_settings() {
        let mut cfg = RuntimeConfig::default();
        cfg.amplitude = 200.0;
        assert_eq!(cfg.validate(), Err(ConfigError::Amplitude(200.0)));

        let mut cfg = RuntimeConfig::default();
        cfg.samples = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::SampleCount));
    }

    #[test]
    fn help_stops_parsing() {
        let cfg = RuntimeConfig::from_args(&args(&["-h", "--frames", "nope"])).unwrap();
        assert!(cfg.show_help);
    }
}
