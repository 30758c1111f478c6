//! CLI Integration Tests
//!
//! These tests run the `cgm` binary and check its output formats and command
//! behaviors. Every run points `CGM_CONFIG` at a temporary directory so the
//! user's own config never leaks in.
//!
//! ```
//! cargo test --package cgm-cli --test cli_integration
//! ```

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run cgm with an isolated config path and return its output
fn run_cgm_with_config(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cgm"))
        .args(args)
        .env("CGM_CONFIG", config)
        .env_remove("CGM_DEVICE")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run cgm binary")
}

/// Run cgm with a config path inside a fresh temporary directory
fn run_cgm(args: &[&str]) -> Output {
    let dir = TempDir::new().expect("temp dir");
    run_cgm_with_config(&dir.path().join("config.toml"), args)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    let output = run_cgm(&["--help"]);

    assert!(output.status.success(), "Help should succeed");

    let stdout = stdout(&output);
    assert!(stdout.contains("devices"), "Help should list devices command");
    assert!(stdout.contains("watch"), "Help should list watch command");
    assert!(stdout.contains("forecast"), "Help should list forecast command");
    assert!(stdout.contains("config"), "Help should list config command");
}

#[test]
fn test_version_command() {
    let output = run_cgm(&["--version"]);

    assert!(output.status.success(), "Version should succeed");
    assert!(stdout(&output).contains("cgm"));
}

#[test]
fn test_watch_help_lists_options() {
    let output = run_cgm(&["watch", "--help"]);

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("--interval-ms"));
    assert!(stdout.contains("--seed"));
    assert!(stdout.contains("--mmol"));
}

// =============================================================================
// Devices
// =============================================================================

#[test]
fn test_devices_json() {
    let output = run_cgm(&["devices", "--format", "json"]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["count"], 4);
    let ids: Vec<_> = json["devices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["dexcom-g7", "libre-3", "medtronic-780g", "omnipod-5"]);
}

#[test]
fn test_devices_text() {
    let output = run_cgm(&["devices"]);

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("FreeStyle Libre 3 (Abbott)"));
    assert!(stdout.contains("Omnipod 5 (Insulet)"));
}

// =============================================================================
// Forecast
// =============================================================================

#[test]
fn test_forecast_json_shape() {
    let output = run_cgm(&[
        "forecast", "--value", "150", "--seed", "1", "--format", "json",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["reading"]["value"], 150);
    assert_eq!(json["reading"]["trend"], "stable");

    let points = json["forecast"].as_array().unwrap();
    assert_eq!(points.len(), 4);
    let offsets: Vec<_> = points.iter().map(|p| p["offset_minutes"].as_u64().unwrap()).collect();
    assert_eq!(offsets, [15, 30, 45, 60]);
    let confidences: Vec<_> = points
        .iter()
        .map(|p| p["confidence_percent"].as_u64().unwrap())
        .collect();
    assert_eq!(confidences, [87, 79, 71, 63]);
    for point in points {
        let value = point["predicted_value"].as_u64().unwrap();
        assert!((140..=160).contains(&value), "unexpected value {}", value);
    }
}

#[test]
fn test_forecast_is_reproducible_with_seed() {
    let args = [
        "forecast", "--value", "200", "--trend", "rising", "--seed", "17", "--format", "csv",
        "--no-header",
    ];
    let values = |output: Output| -> Vec<String> {
        assert!(output.status.success());
        stdout(&output)
            .lines()
            .map(|line| line.split(',').nth(1).unwrap().to_string())
            .collect()
    };

    let first = values(run_cgm(&args));
    let second = values(run_cgm(&args));
    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
}

#[test]
fn test_forecast_rejects_bad_value() {
    let output = run_cgm(&["forecast", "--value", "sweet"]);
    assert!(!output.status.success());
}

// =============================================================================
// Watch
// =============================================================================

#[test]
fn test_watch_csv_with_count() {
    let output = run_cgm(&[
        "watch",
        "--device",
        "libre-3",
        "--interval-ms",
        "20",
        "--connect-delay-ms",
        "5",
        "-n",
        "3",
        "--seed",
        "42",
        "--format",
        "csv",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = stdout(&output);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 4, "header plus three readings: {:?}", lines);
    assert!(lines[0].starts_with("timestamp,device,mg_dl,trend"));

    for line in &lines[1..] {
        let fields: Vec<_> = line.split(',').collect();
        assert_eq!(fields[1], "FreeStyle Libre 3");
        let value: u16 = fields[2].parse().unwrap();
        assert!((70..=300).contains(&value));
    }
    // The first row is the seed reading.
    assert!(lines[1].contains(",stable,"));
}

#[test]
fn test_watch_json_uses_config_device() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        r#"
device = "eversense-365"
interval_ms = 20
connect_delay_ms = 5

[[devices]]
id = "eversense-365"
name = "Eversense 365"
manufacturer = "Senseonics"
"#,
    )
    .unwrap();

    let output = run_cgm_with_config(
        &config,
        &["watch", "-n", "1", "--format", "json", "--compact", "--mmol"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["reading"]["device_name"], "Eversense 365");
    assert_eq!(json["unit"], "mmol/L");
}

#[test]
fn test_watch_unknown_device_fails() {
    let output = run_cgm(&["watch", "--device", "pump-9000", "-n", "1"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pump-9000"));
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_config_path_init_show() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("cgm").join("config.toml");

    let output = run_cgm_with_config(&config, &["config", "path"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), config.display().to_string());

    let output = run_cgm_with_config(&config, &["config", "init"]);
    assert!(output.status.success());
    assert!(config.exists());

    let output = run_cgm_with_config(&config, &["config", "init"]);
    assert!(!output.status.success(), "init must not overwrite without --force");

    let output = run_cgm_with_config(&config, &["config", "init", "--force"]);
    assert!(output.status.success());

    let output = run_cgm_with_config(&config, &["config", "show"]);
    assert!(output.status.success());
    let shown = stdout(&output);
    assert!(shown.contains("device = \"dexcom-g7\""));
    assert!(shown.contains("interval_ms = 60000"));
}
