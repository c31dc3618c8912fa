use std::io::Write;
use std::process::{Command, Stdio};

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn pageturner_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_pageturner").expect("pageturner test binary not built")
}

#[test]
fn pageturner_help_mentions_name() {
    let output = Command::new(pageturner_bin())
        .arg("--help")
        .output()
        .expect("run pageturner --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Pageturner"));
}

#[test]
fn pageturner_list_input_devices_prints_message() {
    let output = Command::new(pageturner_bin())
        .arg("--list-input-devices")
        .output()
        .expect("run pageturner --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(
        combined.contains("audio input devices")
            || combined.contains("Failed to list audio input devices")
    );
}

#[test]
fn pageturner_lists_overridden_devices() {
    let output = Command::new(pageturner_bin())
        .arg("--list-input-devices")
        .env("PAGETURNER_TEST_DEVICES", "Shield Mic,USB Headset")
        .output()
        .expect("run pageturner with test devices");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Available audio input devices:"));
    assert!(stdout.contains("  - Shield Mic"));
    assert!(stdout.contains("  - USB Headset"));
}

#[test]
fn pageturner_rejects_invalid_band() {
    let output = Command::new(pageturner_bin())
        .args(["--highpass-hz", "5000"])
        .output()
        .expect("run pageturner with bad band");
    assert!(!output.status.success());
}

#[test]
fn benchmark_reports_tone_as_voiced() {
    let Some(bin) = option_env!("CARGO_BIN_EXE_pipeline_benchmark") else {
        return;
    };
    let output = Command::new(bin)
        .args(["--label", "tone", "--tone-ms", "1000", "--silence-ms", "0"])
        .output()
        .expect("run pipeline_benchmark");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("pipeline_metrics|label=tone|"));
    assert!(stdout.contains("|window_samples=16000|"));
    assert!(stdout.contains("|silent=false|"));
}

#[test]
fn benchmark_reports_silence() {
    let Some(bin) = option_env!("CARGO_BIN_EXE_pipeline_benchmark") else {
        return;
    };
    let output = Command::new(bin)
        .args(["--tone-ms", "0", "--silence-ms", "1000"])
        .output()
        .expect("run pipeline_benchmark");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("|silent=true|"));
}

#[test]
fn sniffer_decodes_piped_frames() {
    let Some(bin) = option_env!("CARGO_BIN_EXE_packet_sniffer") else {
        return;
    };
    // cmd 0xA1, chunk 0 of 1, two samples: 1 and -1.
    let body = [0x00u8, 0x01, 0x01, 0x00, 0xFF, 0xFF];
    let len = body.len() as u16;
    let mut frame = vec![0xAB, 0xCD, 0xA1, (len >> 8) as u8, len as u8];
    frame.extend_from_slice(&body);
    let crc = frame[2..].iter().fold(0u8, |acc, b| acc ^ b);
    frame.push(crc);

    let mut child = Command::new(bin)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn packet_sniffer");
    let mut stream = vec![0x00, 0x13];
    stream.extend_from_slice(&frame);
    child
        .stdin
        .take()
        .expect("sniffer stdin")
        .write_all(&stream)
        .expect("write frames");
    let output = child.wait_with_output().expect("wait packet_sniffer");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"cmd\":\"0xA1\""));
    assert!(stdout.contains("\"samples\":2"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("|messages=1|"));
}
