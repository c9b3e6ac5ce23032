use {std::fmt, url::Url};

pub const STORAGE: &str = r#"
// SPDX-License-Identifier: GPL-3.0
pragma solidity >=0.7.0 <0.9.0;

contract Storage {
    uint256 number;

    function store(uint256 num) public {
        number = num;
    }

    function retrieve() public view returns (uint256) {
        return number;
    }
}
"#;

/// The solc binary to compile with. Can be overridden with `SOLC_COMMAND`.
pub fn solc() -> String {
    std::env::var("SOLC_COMMAND").unwrap_or("solc".to_string())
}

/// A blockchain node for development purposes. Dropping this type will
/// terminate the node.
pub struct Node {
    process: tokio::process::Child,
    url: Url,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("url", &self.url).finish()
    }
}

impl Node {
    /// Spawn a new node instance.
    pub async fn new() -> Self {
        use tokio::io::AsyncBufReadExt as _;

        // Allow using some custom logic to spawn `anvil` by setting `ANVIL_COMMAND`.
        let command = std::env::var("ANVIL_COMMAND").unwrap_or("anvil".to_string());

        let mut process = tokio::process::Command::new(command)
            .arg("--port")
            .arg("0") // use 0 to let `anvil` use any open port
            .stdout(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap();

        let stdout = process.stdout.take().unwrap();
        let (sender, receiver) = tokio::sync::oneshot::channel::<String>();

        tokio::task::spawn(async move {
            let mut sender = Some(sender);
            const NEEDLE: &str = "Listening on ";
            let mut reader = tokio::io::BufReader::new(stdout).lines();
            while let Some(line) = reader.next_line().await.unwrap() {
                tracing::trace!(line);
                if let Some(addr) = line.strip_prefix(NEEDLE) {
                    if let Some(sender) = sender.take() {
                        let _ = sender.send(format!("http://{addr}"));
                    }
                }
            }
        });

        let url = tokio::time::timeout(std::time::Duration::from_secs(5), receiver)
            .await
            .expect("finding anvil URL timed out")
            .unwrap();
        Self {
            process,
            url: url.parse().unwrap(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let Err(err) = self.process.start_kill() {
            tracing::error!("failed to kill anvil: {err:?}");
        }
    }
}
