//! Client side of the stdio binding: the server runs as a child process.

use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::transport::{ByteChannel, LineChannel};
use crate::types::{McpError, McpResult};

const EXIT_GRACE: Duration = Duration::from_secs(5);

pub struct StdioClientChannel {
    inner: LineChannel<BufReader<ChildStdout>, ChildStdin>,
    child: Child,
    stderr_task: Option<JoinHandle<()>>,
}

impl StdioClientChannel {
    /// Spawn `program` with `args` and talk to it over its stdin/stdout.
    ///
    /// The child's stderr is forwarded to this process's log at debug level.
    pub fn spawn<S: AsRef<OsStr>>(program: S, args: &[String]) -> McpResult<Self> {
        let program = program.as_ref();
        tracing::info!("Starting MCP server: {}", program.to_string_lossy());

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                McpError::Transport(format!(
                    "Failed to spawn MCP server '{}': {e}",
                    program.to_string_lossy()
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Transport("Failed to capture stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Transport("Failed to capture stdout".to_string()))?;
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "mcp_server", "{line}");
                }
            })
        });

        Ok(Self {
            inner: LineChannel::new(BufReader::new(stdout), stdin),
            child,
            stderr_task,
        })
    }
}

#[async_trait]
impl ByteChannel for StdioClientChannel {
    async fn recv(&mut self) -> McpResult<Option<String>> {
        self.inner.recv().await
    }

    async fn send(&mut self, message: &str) -> McpResult<()> {
        self.inner.send(message).await
    }

    /// Close stdin so the server sees EOF, then reap it, killing it if it lingers.
    async fn close(&mut self) -> McpResult<()> {
        self.inner.close().await?;

        match tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!("MCP server exited: {status}"),
            Ok(Err(e)) => tracing::warn!("Failed to wait for MCP server: {e}"),
            Err(_) => {
                tracing::warn!("MCP server did not exit within {EXIT_GRACE:?}, killing it");
                self.child.kill().await?;
            }
        }

        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        Ok(())
    }
}
