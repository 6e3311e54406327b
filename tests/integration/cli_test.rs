use anyhow::Result;
use std::process::Command;

fn pagectl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pagectl"))
}

/// The info command echoes the configured pool
#[test]
fn test_cli_info_command() -> Result<()> {
    let output = pagectl().args(["--frames", "32", "--user-limit", "20", "info"]).output()?;

    assert!(output.status.success(), "info command failed");

    let output_str = String::from_utf8(output.stdout)?;
    assert!(output_str.contains("pagectl Information:"));
    assert!(output_str.contains("Frames: 32"));
    assert!(output_str.contains("User page limit: 20"));
    assert!(output_str.contains("shared pool of 1024 slots"));
    Ok(())
}

/// The demo runs the workload to completion without corruption
#[test]
fn test_cli_demo() -> Result<()> {
    let output = pagectl()
        .args(["--frames", "16", "--user-limit", "8", "demo", "--pages", "20", "--iterations", "30"])
        .output()?;

    assert!(output.status.success(), "demo failed: {}", String::from_utf8_lossy(&output.stderr));

    let output_str = String::from_utf8(output.stdout)?;
    assert!(output_str.contains("=== Final Statistics ==="));
    assert!(output_str.contains("MRU List (Most -> Least Recently Used):"));
    assert!(!output_str.contains("ERROR"));
    Ok(())
}

/// Demo against per-owner swap files
#[test]
fn test_cli_demo_file_backed() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let output = pagectl()
        .args(["--frames", "8", "--user-limit", "4", "--swap-slots", "32"])
        .arg("--swap-dir")
        .arg(temp_dir.path())
        .args(["demo", "--pages", "12"])
        .output()?;

    assert!(output.status.success(), "demo failed: {}", String::from_utf8_lossy(&output.stderr));
    let output_str = String::from_utf8(output.stdout)?;
    assert!(output_str.contains("Swap Outs:"));
    Ok(())
}

#[test]
fn test_cli_stress() -> Result<()> {
    let output = pagectl()
        .args(["--frames", "12", "--user-limit", "8", "stress", "--workers", "3", "--pages", "10", "--rounds", "60"])
        .output()?;

    assert!(output.status.success(), "stress failed: {}", String::from_utf8_lossy(&output.stderr));
    let output_str = String::from_utf8(output.stdout)?;
    assert!(output_str.contains("Stress completed: no corruption"));
    Ok(())
}
