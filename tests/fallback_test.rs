use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[cfg(not(feature = "gateway-http"))]
#[test]
fn test_http_gateway_fallback_warning() {
    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.args([
        "pay",
        "--instant",
        "--api-url",
        "http://127.0.0.1:9",
        "mpesa",
        "--amount",
        "100",
        "--phone",
        "254700000000",
    ]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING: HTTP gateway requested via --api-url, but 'gateway-http' feature is not enabled. Falling back to the simulated gateway."));
}

#[test]
fn test_simulated_gateway_has_no_warning() {
    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.args([
        "pay",
        "--instant",
        "mpesa",
        "--amount",
        "100",
        "--phone",
        "254700000000",
    ]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING").not());
}
