use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use url_vet::config::ServerConfig;
use url_vet::error::StartupError;
use url_vet::supervisor::ServerSupervisor;

fn test_config(bin: &str, address: String, startup_timeout_ms: u64) -> ServerConfig {
    ServerConfig {
        bin: bin.to_string(),
        address,
        api_key: "test-key".to_string(),
        db_path: "/tmp/url-vet-test.db".to_string(),
        startup_timeout_ms,
        health_poll_interval_ms: 50,
        lookup_timeout_ms: 5_000,
    }
}

/// Grabs a loopback port that nothing will be listening on.
fn dead_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);
    address
}

/// Writes an executable stub that ignores the server flags, records its
/// pid and stays alive without ever listening.
fn write_stuck_server(dir: &std::path::Path, pid_file: &std::path::Path) -> String {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("stuck-server.sh");
    let body = format!("#!/bin/sh\necho $$ > {}\nexec sleep 30\n", pid_file.display());
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_startup_times_out_and_kills_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("stuck-server.pid");
    let bin = write_stuck_server(dir.path(), &pid_file);

    // The stub never listens, so the health endpoint never comes up.
    let config = test_config(&bin, dead_address(), 200);

    let begin = Instant::now();
    let err = ServerSupervisor::start(&config)
        .await
        .err()
        .expect("startup must fail");

    assert!(matches!(err, StartupError::Timeout(_)), "got {:?}", err);
    assert!(begin.elapsed() >= Duration::from_millis(200));

    // The child recorded its pid before blocking; it must be gone now.
    let pid = std::fs::read_to_string(&pid_file)
        .expect("stub must have started")
        .trim()
        .to_string();
    assert!(
        !std::path::Path::new(&format!("/proc/{}", pid)).exists(),
        "child {} still running after startup timeout",
        pid
    );
}

#[tokio::test]
async fn test_missing_binary_fails_at_spawn() {
    let config = test_config("url-vet-no-such-binary", dead_address(), 200);

    let err = ServerSupervisor::start(&config)
        .await
        .err()
        .expect("spawn must fail");
    assert!(matches!(err, StartupError::Spawn(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_start_succeeds_once_endpoint_answers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            // Drain the request head before answering.
            let mut buf = Vec::new();
            let mut tmp = [0u8; 512];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut tmp).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&tmp[..n]),
                }
            }
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
        }
    });

    let config = test_config("sleep", address.clone(), 2_000);
    let supervisor = ServerSupervisor::start(&config).await.expect("must start");
    assert_eq!(supervisor.address(), address);

    // Child may have exited on its own already; stop must still succeed.
    supervisor.stop().await.unwrap();
}
