use super::defaults::{MAX_CLASSIFIER_ARGS, MAX_LABELS};
use super::validation::{load_profile, sanitize_binary, validate_label_names};
use super::{AppConfig, LabelConfig, PipelineConfig};
use crate::audio::{FilterProfile, ResampleMethod};
use clap::Parser;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let path = env::temp_dir().join(format!(
        "pageturner_{name}_{}_{nanos}.yaml",
        std::process::id()
    ));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn defaults_validate() {
    let mut cfg = AppConfig::parse_from(["test-app"]);
    assert!(cfg.validate().is_ok());
    let pipeline = cfg.pipeline_config();
    assert_eq!(pipeline, PipelineConfig::default());
    assert_eq!(pipeline.raw_samples(), 44_100);
    assert_eq!(pipeline.window_samples(), 16_000);
}

#[test]
fn queue_depth_covers_hold_window() {
    let cfg = PipelineConfig::default();
    assert!(cfg.queue_depth_ms() > cfg.hold_ms);
}

#[test]
fn rejects_lowpass_above_nyquist() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--input-rate",
        "8000",
        "--lowpass-hz",
        "4000",
    ]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--input-rate",
        "8000",
        "--lowpass-hz",
        "3400",
    ]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_inverted_band() {
    let mut cfg = AppConfig::parse_from(["test-app", "--highpass-hz", "3500"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--highpass-hz", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_band_that_designs_unstable_sections() {
    let cfg = PipelineConfig {
        highpass_hz: 0.001,
        lowpass_hz: 0.002,
        filter_q: 20.0,
        ..PipelineConfig::default()
    };
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("unstable"), "{err}");

    let cfg = PipelineConfig {
        highpass_hz: 20.0,
        lowpass_hz: 3_400.0,
        ..PipelineConfig::default()
    };
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_input_rate_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--input-rate", "1000"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--input-rate", "384000"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_window_that_overflows_packet_limit() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--output-rate",
        "48000",
        "--window-ms",
        "2000",
    ]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--window-ms", "4000"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_bad_vote_settings() {
    let mut cfg = AppConfig::parse_from(["test-app", "--run-length", "0"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--silence-threshold", "1.5"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--refractory-ms", "0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn hold_must_exceed_debounce() {
    let mut cfg = AppConfig::parse_from(["test-app", "--debounce-ms", "100", "--hold-ms", "100"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--debounce-ms", "100", "--hold-ms", "101"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn custom_label_aliases_replace_defaults() {
    let cfg = AppConfig::parse_from([
        "test-app",
        "--next-label",
        "vor",
        "--next-label",
        "forward",
        "--silence-label",
        "_silence",
    ]);
    let labels = cfg.pipeline_config().labels;
    assert_eq!(labels.next, vec!["vor".to_string(), "forward".to_string()]);
    assert_eq!(labels.prev, LabelConfig::default().prev);
    assert_eq!(labels.silence, "_silence");
}

#[test]
fn rejects_label_meaning_both_directions() {
    let mut cfg = AppConfig::parse_from(["test-app", "--next-label", "back"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn classifier_requires_labels() {
    let mut cfg = AppConfig::parse_from(["test-app", "--classifier-cmd", "python3"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--classifier-cmd",
        "PYTHON3",
        "--labels",
        "silence,weiter,zurück",
    ]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.classifier_cmd.as_deref(), Some("python3"));
    assert_eq!(cfg.labels.len(), 3);
}

#[test]
fn rejects_too_many_classifier_args() {
    let mut args = vec!["test-app".to_string()];
    for i in 0..=MAX_CLASSIFIER_ARGS {
        args.push(format!("--classifier-arg=a{i}"));
    }
    let mut cfg = AppConfig::parse_from(args);
    assert!(cfg.validate().is_err());
}

#[test]
fn label_names_must_be_unique_and_non_empty() {
    let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    assert!(validate_label_names(&names(&["a", "b"])).is_ok());
    assert!(validate_label_names(&names(&["a", " "])).is_err());
    assert!(validate_label_names(&names(&["Next", "next"])).is_err());
    let many: Vec<String> = (0..=MAX_LABELS).map(|i| format!("l{i}")).collect();
    assert!(validate_label_names(&many).is_err());
}

#[test]
fn sanitize_binary_accepts_allowlist_and_executables() {
    assert_eq!(
        sanitize_binary("python", "--classifier-cmd", &["python3", "python"]).unwrap(),
        "python"
    );
    assert!(sanitize_binary("", "--classifier-cmd", &["python3"]).is_err());
    assert!(sanitize_binary("ruby", "--classifier-cmd", &["python3"]).is_err());
    assert!(sanitize_binary("/definitely/missing/bin", "--classifier-cmd", &["python3"]).is_err());
}

#[cfg(unix)]
#[test]
fn sanitize_binary_rejects_non_executable_file() {
    let path = temp_file("not_exec", "plain text");
    let result = sanitize_binary(path.to_str().unwrap(), "--classifier-cmd", &["python3"]);
    assert!(result.is_err());
    let _ = fs::remove_file(&path);
}

#[test]
fn profile_overrides_flags_and_keeps_defaults() {
    let path = temp_file(
        "profile",
        "input_rate: 16000\nfilter_profile: speech-band-steep\nresampler: linear-fixed\nrequired_run_length: 4\nlabels:\n  next: [vor]\n",
    );
    let profile = load_profile(&path).unwrap();
    assert_eq!(profile.input_rate, 16_000);
    assert_eq!(profile.filter_profile, FilterProfile::SpeechBandSteep);
    assert_eq!(profile.resampler, ResampleMethod::LinearFixed);
    assert_eq!(profile.required_run_length, 4);
    assert_eq!(profile.labels.next, vec!["vor".to_string()]);
    assert_eq!(profile.labels.prev, LabelConfig::default().prev);
    assert_eq!(profile.window_ms, PipelineConfig::default().window_ms);

    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--profile",
        path.to_str().unwrap(),
        "--run-length",
        "9",
    ]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.pipeline_config().required_run_length, 4);
    let _ = fs::remove_file(&path);
}

#[test]
fn invalid_profile_is_rejected() {
    let path = temp_file("bad_profile", "highpass_hz: 5000\n");
    let mut cfg = AppConfig::parse_from(["test-app", "--profile", path.to_str().unwrap()]);
    assert!(cfg.validate().is_err());
    let _ = fs::remove_file(&path);

    let mut cfg = AppConfig::parse_from(["test-app", "--profile", "/definitely/missing.yaml"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn host_output_cannot_be_directory() {
    let dir = env::temp_dir();
    let mut cfg = AppConfig::parse_from(["test-app", "--host-output", dir.to_str().unwrap()]);
    assert!(cfg.validate().is_err());
}

#[test]
fn standalone_profile_carries_packet_commands() {
    let path = temp_file(
        "commands",
        "commands:\n  audio_window: 177\n  scores: 178\n  stream: 179\n",
    );
    let cfg = PipelineConfig::from_profile(&path).unwrap();
    assert_eq!(cfg.commands.audio_window, 0xB1);
    assert_eq!(cfg.commands.scores, 0xB2);
    assert_eq!(cfg.commands.stream, 0xB3);
    let _ = fs::remove_file(&path);

    let path = temp_file("commands_bad", "lowpass_hz: 30000\n");
    assert!(PipelineConfig::from_profile(&path).is_err());
    let _ = fs::remove_file(&path);
}
