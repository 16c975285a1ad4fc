use crate::config::ServerConfig;
use crate::error::StartupError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

/// Owns the external threat-matching server process.
///
/// `start` is the only constructor and the handle is the sole owner of the
/// child, so a second server per supervisor cannot exist. The child is
/// spawned with `kill_on_drop`, which makes teardown a scoped guarantee:
/// the process dies when the handle is dropped on any exit path.
pub struct ServerSupervisor {
    child: Child,
    address: String,
}

impl ServerSupervisor {
    /// Spawns the server and polls its HTTP endpoint until it answers or
    /// the startup window elapses. On timeout the child is killed before
    /// the error is returned.
    pub async fn start(config: &ServerConfig) -> Result<Self, StartupError> {
        let mut cmd = Command::new(&config.bin);
        cmd.arg("-apikey")
            .arg(&config.api_key)
            .arg("-db")
            .arg(&config.db_path)
            .arg("-srvaddr")
            .arg(&config.address)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        info!(
            "Spawned threat-matching server '{}' for {}",
            config.bin, config.address
        );

        let window = Duration::from_millis(config.startup_timeout_ms);
        let poll_interval = Duration::from_millis(config.health_poll_interval_ms);
        let deadline = Instant::now() + window;
        let health_url = format!("http://{}/", config.address);
        let probe = reqwest::Client::new();

        loop {
            // Any HTTP answer, whatever the status, means the server is up.
            let reachable = probe
                .get(&health_url)
                .timeout(poll_interval.max(Duration::from_millis(250)))
                .send()
                .await
                .is_ok();

            if reachable {
                info!("Threat-matching server is up at {}", config.address);
                break;
            }

            if Instant::now() >= deadline {
                warn!(
                    "Threat-matching server not reachable after {:?}; killing it",
                    window
                );
                let _ = child.kill().await;
                return Err(StartupError::Timeout(window));
            }

            sleep(poll_interval).await;
        }

        Ok(Self {
            child,
            address: config.address.clone(),
        })
    }

    /// Network address the server was told to bind. The only thing other
    /// components ever see of the child.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn stop(mut self) -> std::io::Result<()> {
        info!("Stopping threat-matching server");
        match self.child.kill().await {
            // Already exited on its own; nothing left to kill.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }
}
