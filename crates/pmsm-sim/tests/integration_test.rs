use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn run_sim(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pmsm-sim"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to start pmsm-sim")
}

fn read_trace(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .expect("trace file missing")
        .lines()
        .map(|line| serde_json::from_str(line).expect("trace line is not JSON"))
        .collect()
}

fn count_kind(entries: &[Value], kind: &str) -> usize {
    entries.iter().filter(|e| e["kind"] == kind).count()
}

#[test]
fn both_modes_write_a_complete_trace() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.jsonl");
    let path_arg = path.to_str().unwrap();

    let output = run_sim(&[
        "--frames", "30", "--samples", "600", "--rpm", "60", "--trace", path_arg,
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let entries = read_trace(&path);
    assert_eq!(entries.first().unwrap()["kind"], "run_start");
    assert_eq!(entries.last().unwrap()["kind"], "run_end");
    assert_eq!(count_kind(&entries, "motor_frame"), 30);
    assert_eq!(count_kind(&entries, "decode_sample"), 600);

    let start = &entries[0]["details"];
    assert_eq!(start["mode"], "both");
    assert_eq!(start["motor"]["rotor_poles"], 16);

    let end = &entries.last().unwrap()["details"];
    assert_eq!(end["motor"]["frames"], 30);
    assert_eq!(end["motor"]["mean_back_emf"].as_array().unwrap().len(), 12);
    assert_eq!(end["phase"]["samples"], 600);
}

#[test]
fn motor_frames_carry_bounded_voltages() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("motor.jsonl");

    let output = run_sim(&[
        "--mode", "motor", "--frames", "20", "--rotor-poles", "4", "--stator-poles", "2",
        "--rpm", "120", "--acc", "0", "--trace", path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let entries = read_trace(&path);
    assert_eq!(count_kind(&entries, "decode_sample"), 0);

    let frames: Vec<&Value> = entries.iter().filter(|e| e["kind"] == "motor_frame").collect();
    assert_eq!(frames.len(), 20);
    for (index, frame) in frames.iter().enumerate() {
        assert_eq!(frame["frame"], index as u64);
        let details = &frame["details"];
        assert_eq!(details["frequency"], 2.0);
        for phase in ["u", "v", "w"] {
            let value = details["voltages"][phase].as_f64().unwrap();
            assert!((-1.0..=1.0).contains(&value));
        }
    }
}

#[test]
fn air_gap_moves_across_the_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gap.jsonl");

    let output = run_sim(&[
        "--mode", "motor", "--frames", "10", "--air-gap", "5", "--air-gap-to", "15",
        "--trace", path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let entries = read_trace(&path);
    let gaps: Vec<f64> = entries
        .iter()
        .filter(|e| e["kind"] == "motor_frame")
        .map(|e| e["details"]["air_gap"].as_f64().unwrap())
        .collect();
    assert_eq!(gaps.first(), Some(&5.0));
    assert!(gaps.windows(2).all(|w| w[1] > w[0]));
    assert!(gaps.last().unwrap() < &15.0);
}

#[test]
fn decode_samples_pair_phase_with_drive_duty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("phase.jsonl");

    let output = run_sim(&[
        "--mode", "phase", "--samples", "240", "--noise", "0", "--trace",
        path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let entries = read_trace(&path);
    assert_eq!(count_kind(&entries, "motor_frame"), 0);
    for entry in entries.iter().filter(|e| e["kind"] == "decode_sample") {
        let details = &entry["details"];
        assert!(details["phase"].as_u64().unwrap() < 24);
        let drive = &details["drive"];
        for phase in ["u", "v", "w"] {
            let duty = drive[phase].as_u64().unwrap();
            assert!((1..=255).contains(&duty));
        }
    }
}

#[test]
fn unsupported_rotor_poles_fail_the_run() {
    let output = run_sim(&["--rotor-poles", "5", "--frames", "1"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn malformed_flag_value_is_a_usage_error() {
    let output = run_sim(&["--frames", "lots"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--frames"));
}

#[test]
fn unknown_mode_names_the_mode() {
    let output = run_sim(&["--mode", "sideways"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown mode \"sideways\""));
}

#[test]
fn help_exits_cleanly() {
    let output = run_sim(&["--help"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("USAGE"));
}
