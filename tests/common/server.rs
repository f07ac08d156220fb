//! Spawns and manages `superchatd` instances for integration testing.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;

use tokio::time::sleep;

/// A running `superchatd` test instance, bound to a loopback TCP port with
/// every other transport left disabled.
pub struct TestServer {
    child: Child,
    port: u16,
    data_dir: PathBuf,
}

impl TestServer {
    /// Spawn a fresh server listening only on plain TCP at `port`, backed
    /// by a throwaway sqlite file under the OS temp dir.
    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        Self::spawn_with_admin(port, None).await
    }

    /// Like [`Self::spawn`], but promotes `admin_nickname` to admin the
    /// first time it registers.
    pub async fn spawn_with_admin(port: u16, admin_nickname: Option<&str>) -> anyhow::Result<Self> {
        let data_dir = std::env::temp_dir().join(format!("superchat-test-{port}"));
        std::fs::create_dir_all(&data_dir)?;

        let admin_line = admin_nickname
            .map(|n| format!("admin_nickname = \"{n}\"\n"))
            .unwrap_or_default();

        let config_path = data_dir.join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "test.server"
network = "TestNet"
{admin_line}
[listen]
tcp_bind = "127.0.0.1:{port}"
enable_ssh = false
enable_websocket = false

[database]
path = "{db_path}/test.db"

[limits]
max_msg_bytes = 65536

[history]
retention_sweep_interval_secs = 3600

[rate_limit]
user_posts_per_min = 1000
ip_posts_per_min = 1000
connections_per_min_per_ip = 1000

[metrics]
port = 0
"#,
            port = port,
            db_path = data_dir.display(),
            admin_line = admin_line,
        );
        std::fs::write(&config_path, config_content)?;

        let cargo_manifest_dir = env!("CARGO_MANIFEST_DIR");
        let binary_path = PathBuf::from(cargo_manifest_dir).join("target/debug/superchatd");

        let child = Command::new(&binary_path)
            .arg(config_path.to_str().unwrap())
            .spawn()?;

        let server = Self {
            child,
            port,
            data_dir,
        };
        server.wait_until_ready().await?;
        Ok(server)
    }

    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server failed to start within 5 seconds")
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address()).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}
