use pmsm_core::phase::{DecoderParams, PhaseDecoder, PHASE_STEPS};
use pmsm_core::waveform::{decode_run, SynthParams};
use std::f64::consts::{PI, TAU};

/// ADC pair for a clean sine triple at electrical angle `theta`.
fn sine_pair(amplitude: f64, theta: f64) -> (u8, u8) {
    let level = |shift: f64| {
        (128.0 + (amplitude * (theta + shift).sin()).trunc()).clamp(0.0, 255.0) as u8
    };
    (level(0.0), level(2.0 * PI / 3.0))
}

#[test]
fn slow_sine_steps_through_every_code_in_order() {
    let mut decoder = PhaseDecoder::new(DecoderParams::default());
    let steps_per_cycle = 2400;
    let mut phases = Vec::new();
    for i in 0..=2 * steps_per_cycle {
        let theta = TAU * i as f64 / steps_per_cycle as f64;
        let (u, v) = sine_pair(127.0, theta);
        phases.push(decoder.decode(u, v).phase);
    }

    assert_eq!(phases[0], 0);
    for pair in phases.windows(2) {
        let step = (pair[1] + PHASE_STEPS - pair[0]) % PHASE_STEPS;
        assert!(step <= 1, "phase jumped {} -> {}", pair[0], pair[1]);
    }

    let mut seen = [false; PHASE_STEPS as usize];
    for p in &phases {
        seen[usize::from(*p)] = true;
    }
    assert!(seen.iter().all(|s| *s));

    // Two full cycles, no step discarded: 48 steps accumulated.
    let transitions = phases.windows(2).filter(|w| w[0] != w[1]).count();
    assert_eq!(transitions, 2 * PHASE_STEPS as usize);
}

#[test]
fn each_code_spans_about_a_twenty_fourth_of_a_cycle() {
    let mut decoder = PhaseDecoder::new(DecoderParams::default());
    let steps_per_cycle = 2400;
    let mut run_lengths = Vec::new();
    let mut current = None;
    let mut length = 0;
    for i in 0..steps_per_cycle {
        let (u, v) = sine_pair(127.0, TAU * i as f64 / steps_per_cycle as f64);
        let phase = decoder.decode(u, v).phase;
        if current == Some(phase) {
            length += 1;
        } else {
            if current.is_some() {
                run_lengths.push(length);
            }
            current = Some(phase);
            length = 1;
        }
    }
    // Interior codes only; the first and last are cut by the window.
    let nominal = steps_per_cycle / PHASE_STEPS as usize;
    for len in &run_lengths[1..] {
        assert!(*len > nominal / 2 && *len < nominal * 3 / 2, "run of {len}");
    }
}

#[test]
fn velocity_is_published_every_window_and_sums_steps() {
    // A window spans `interval + 1` calls.
    let interval = 49u32;
    let window = interval as usize + 1;
    let mut decoder = PhaseDecoder::new(DecoderParams {
        sampling_interval: interval,
        ..Default::default()
    });
    let steps_per_cycle = 600;
    let mut previous_velocity = 0;
    let mut previous_phase = 0u8;
    let mut expected_sum = 0i32;

    for call in 1..=3 * steps_per_cycle {
        let (u, v) = sine_pair(127.0, TAU * call as f64 / steps_per_cycle as f64);
        let reading = decoder.decode(u, v);
        expected_sum += i32::from((reading.phase + PHASE_STEPS - previous_phase) % PHASE_STEPS);
        previous_phase = reading.phase;

        if call % window == 0 {
            assert_eq!(reading.velocity, expected_sum, "call {call}");
            expected_sum = 0;
        } else {
            assert_eq!(reading.velocity, previous_velocity, "call {call}");
        }
        previous_velocity = reading.velocity;
    }
    // 24 steps per 600 calls: 2 steps per 50-call window.
    assert_eq!(previous_velocity, 2);
}

#[test]
fn clean_synthetic_run_reports_forward_velocity() {
    let mut decoder = PhaseDecoder::new(DecoderParams::default());
    let params = SynthParams {
        noise_ratio: 0.0,
        ..Default::default()
    };
    let trace = decode_run(&mut decoder, &params);
    assert_eq!(trace.len(), params.sample_count);
    // Two electrical cycles over 6000 samples: 48 steps, 0.8 per 100 calls.
    let published: Vec<i32> = trace.iter().map(|s| s.reading.velocity).collect();
    assert!(published.iter().all(|v| (0..=2).contains(v)));
    assert!(published.iter().any(|v| *v > 0));
}
