#[test]
fn searchmux_version_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("searchmux");
    let out = std::process::Command::new(bin)
        .args(["version"])
        .output()
        .expect("run searchmux version");

    assert!(out.status.success(), "searchmux version failed");
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse version json");

    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["name"].as_str(), Some("searchmux"));
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[test]
fn searchmux_version_text_output() {
    use predicates::prelude::*;

    let bin = assert_cmd::cargo::cargo_bin!("searchmux");
    assert_cmd::Command::new(bin)
        .args(["version", "--output", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("searchmux "));
}
