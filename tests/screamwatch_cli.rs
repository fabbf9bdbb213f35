use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn screamwatch_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_screamwatch").expect("screamwatch test binary not built")
}

#[test]
fn help_mentions_name() {
    let output = Command::new(screamwatch_bin())
        .arg("--help")
        .output()
        .expect("run screamwatch --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("screamwatch"));
}

#[test]
fn list_input_devices_prints_message() {
    let output = Command::new(screamwatch_bin())
        .arg("--list-input-devices")
        .output()
        .expect("run screamwatch --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(
        combined.contains("audio input devices")
            || combined.contains("Failed to list audio input devices")
    );
}

#[test]
fn rejects_invalid_sensitivity() {
    let output = Command::new(screamwatch_bin())
        .args(["--sensitivity", "0.01"])
        .output()
        .expect("run screamwatch with bad sensitivity");
    assert!(!output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--sensitivity"), "got: {combined}");
}
