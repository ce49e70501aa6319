use std::fs;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::tempdir;

fn hps(config: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hps"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("HPS_DB")
        .env_remove("RUST_LOG")
        .output()
        .expect("run hps")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json")
}

#[test]
fn seeded_config_makes_random_sweeps_repeat() {
    let dir = tempdir().expect("tempdir");
    let params = dir.path().join("params.json");
    fs::write(&params, r#"{"a": [1, 2, 3, 4, 5, 6, 7, 8], "b": ["u", "v", "w"]}"#).expect("params");

    let draws: Vec<Value> = ["one.sqlite", "two.sqlite"]
        .iter()
        .map(|db| {
            let config = dir.path().join(format!("{db}.yaml"));
            fs::write(
                &config,
                format!(
                    "store:\n  path: {}\n  journal_mode: delete\nrng:\n  seed: 1234\nlog:\n  filter: warn\n",
                    dir.path().join(db).display()
                ),
            )
            .expect("config");
            let created = stdout_json(&hps(
                &config,
                &["create-sweep", "--method", "random", "--parameters", params.to_str().expect("path")],
            ));
            let sweep = created["SweepID"].to_string();
            stdout_json(&hps(&config, &["iterate", "--sweep", &sweep]))
        })
        .collect();
    assert_eq!(draws[0], draws[1]);
}

#[test]
fn unknown_config_field_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("hps.yaml");
    fs::write(&config, "storage:\n  path: nope.sqlite\n").expect("config");
    let output = hps(&config, &["runs"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("config-parse"));
}

#[test]
fn zero_busy_timeout_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("hps.yaml");
    fs::write(
        &config,
        format!(
            "store:\n  path: {}\n  busy_timeout_ms: 0\n",
            dir.path().join("db.sqlite").display()
        ),
    )
    .expect("config");
    let output = hps(&config, &["runs"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("busy-timeout"));
}
