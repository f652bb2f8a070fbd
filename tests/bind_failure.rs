//! The binary exits with status 1 when it cannot take its port.

use std::process::Stdio;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::process::Command;

#[tokio::test]
async fn occupied_port_exits_with_status_one() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let child = Command::new(env!("CARGO_BIN_EXE_graphql-bridge"))
        .arg("--bind")
        .arg(addr.to_string())
        .env("RUST_LOG", "error")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    let output = tokio::time::timeout(Duration::from_secs(30), child.wait_with_output())
        .await
        .expect("bridge kept running on an occupied port")
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let logs = String::from_utf8_lossy(&output.stdout);
    assert!(logs.contains("Failed to start server"), "logs: {logs}");
    assert!(logs.contains("Address already in use"), "logs: {logs}");
    assert!(logs.contains(&addr.to_string()), "logs: {logs}");
    drop(taken);
}

#[tokio::test]
async fn invalid_bind_address_exits_with_status_one() {
    let status = Command::new(env!("CARGO_BIN_EXE_graphql-bridge"))
        .args(["--bind", "not-an-address"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .unwrap();

    assert_eq!(status.code(), Some(1));
}
