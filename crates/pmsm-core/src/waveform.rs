//! Synthetic three-phase test waveform for the phase decoder.

use std::f64::consts::{PI, TAU};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::phase::{PhaseDecoder, PhaseReading};

/// Phase separation between windings.
const PHI: f64 = 2.0 * PI / 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthParams {
    /// Peak deviation from mid-scale (128), in ADC counts.
    pub amplitude: f64,
    /// Electrical cycles across the run (half-cycles of `2·frequency`).
    pub frequency: f64,
    pub sample_count: usize,
    /// Ramp the frequency from 0 up across the run instead of holding it.
    pub sweep: bool,
    /// Uniform noise peak as a fraction of `amplitude`.
    pub noise_ratio: f64,
    pub seed: u64,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            amplitude: 127.0,
            frequency: 1.0,
            sample_count: 6000,
            sweep: false,
            noise_ratio: 0.05,
            seed: 0,
        }
    }
}

/// One synthesized sample of all three phases, before ADC clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreePhaseSample {
    pub u: i32,
    pub v: i32,
    pub w: i32,
}

impl ThreePhaseSample {
    pub fn adc_u(&self) -> u8 {
        self.u.clamp(0, 255) as u8
    }

    pub fn adc_v(&self) -> u8 {
        self.v.clamp(0, 255) as u8
    }
}

/// Iterator over `sample_count` samples of a (possibly swept) sine triple.
#[derive(Debug, Clone)]
pub struct WaveformSynthesizer {
    params: SynthParams,
    rng: StdRng,
    index: usize,
    delta: f64,
}

impl WaveformSynthesizer {
    pub fn new(params: SynthParams) -> Self {
        let cycles = params.frequency * 2.0;
        Self {
            params,
            rng: StdRng::seed_from_u64(params.seed),
            index: 0,
            delta: if params.sweep { 0.0 } else { cycles },
        }
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }
}

impl Iterator for WaveformSynthesizer {
    type Item = ThreePhaseSample;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.params.sample_count;
        if self.index >= n {
            return None;
        }

        let len = n as f64;
        let theta = TAU * (self.index as f64 - len / 2.0) / len * self.delta;
        if self.params.sweep {
            self.delta += self.params.frequency * 2.0 / len;
        }
        self.index += 1;

        let amp = self.params.amplitude;
        let noise = self.rng.gen_range(-1.0..1.0) * amp * self.params.noise_ratio;
        let level = |shift: f64| 128 + (noise + amp * (theta + shift).sin()).trunc() as i32;
        Some(ThreePhaseSample {
            u: level(0.0),
            v: level(PHI),
            w: level(-PHI),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.params.sample_count.saturating_sub(self.index);
        (left, Some(left))
    }
}

impl ExactSizeIterator for WaveformSynthesizer {}

/// One decoded point of a synthetic run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeSample {
    pub sample: ThreePhaseSample,
    pub reading: PhaseReading,
}

/// Resets `decoder` and feeds it one full synthetic run.
pub fn decode_run(decoder: &mut PhaseDecoder, params: &SynthParams) -> Vec<DecodeSample> {
    decoder.reset();
    WaveformSynthesizer::new(*params)
        .map(|sample| DecodeSample {
            sample,
            reading: decoder.decode(sample.adc_u(), sample.adc_v()),
        })
        .collect()
}
