//! Async JSON-RPC stdio client for language servers.
//!
//! Frames use the LSP `Content-Length` header convention. A background
//! reader task parses incoming frames and routes responses to their
//! waiting requests by id; server notifications are logged and dropped,
//! and server-to-client requests get an immediate `null` result so
//! chatty servers never block on us. Requests carry a per-call timeout;
//! a timed-out request sends `$/cancelRequest` before reporting failure.

use crate::errors::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcMessage {
    /// Server-to-client request: must be answered to keep the server going.
    ServerRequest {
        id: Value,
        method: String,
        #[serde(default)]
        params: Value,
    },
    Response {
        id: Value,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<Value>,
    },
    Notification {
        method: String,
        #[serde(default)]
        params: Value,
    },
}

type Pending = Arc<Mutex<HashMap<i64, oneshot::Sender<Result<Value>>>>>;

pub struct LspClient {
    child: Child,
    stdin: Arc<Mutex<ChildStdin>>,
    pending: Pending,
    next_id: AtomicI64,
    reader: JoinHandle<()>,
}

impl LspClient {
    /// Spawn `argv` with `root` as working directory and run the
    /// `initialize`/`initialized` handshake.
    pub async fn start(argv: &[String], root: &Path, timeout: Duration) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Spawn("empty server command".into()))?;

        let mut child = Command::new(program)
            .args(args)
            .current_dir(root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Spawn(format!("{program}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn("no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Spawn("no stdout".into()))?;

        let stdin = Arc::new(Mutex::new(stdin));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_loop(stdout, stdin.clone(), pending.clone()));

        let client = Self {
            child,
            stdin,
            pending,
            next_id: AtomicI64::new(1),
            reader,
        };

        let root_uri = crate::util::file_uri(root)
            .ok_or_else(|| Error::Protocol(format!("root not absolute: {}", root.display())))?;
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        client
            .request(
                "initialize",
                json!({
                    "processId": std::process::id(),
                    "rootUri": root_uri,
                    "capabilities": {},
                    "workspaceFolders": [{"uri": root_uri, "name": name}],
                }),
                timeout,
            )
            .await?;
        client.notify("initialized", json!({})).await?;
        Ok(client)
    }

    /// Announce a file before querying references against it.
    pub async fn did_open(&self, uri: &str, language_id: &str, text: &str) -> Result<()> {
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": language_id,
                    "version": 1,
                    "text": text,
                }
            }),
        )
        .await
    }

    /// `textDocument/references` without the declaration itself.
    pub async fn references(
        &self,
        uri: &str,
        line: u32,
        character: u32,
        timeout: Duration,
    ) -> Result<Vec<lsp_types::Location>> {
        let result = self
            .request(
                "textDocument/references",
                json!({
                    "textDocument": {"uri": uri},
                    "position": {"line": line, "character": character},
                    "context": {"includeDeclaration": false},
                }),
                timeout,
            )
            .await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(result).map_err(Error::from)
    }

    /// Graceful shutdown: `shutdown`, `exit`, bounded wait, then kill.
    pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
        let _ = self.request("shutdown", Value::Null, grace).await;
        let _ = self.notify("exit", json!({})).await;
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                warn!("lsp: server ignored exit, killing");
                let _ = self.child.start_kill();
            }
        }
        self.reader.abort();
        Ok(())
    }

    async fn request(&self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        if let Err(err) = self.send(&frame).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                let _ = self
                    .notify("$/cancelRequest", json!({"id": id}))
                    .await;
                Err(Error::Timeout)
            }
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.send(&json!({"jsonrpc": "2.0", "method": method, "params": params}))
            .await
    }

    async fn send(&self, frame: &Value) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        write_frame(&mut *stdin, frame).await?;
        debug!("lsp → {}", frame["method"].as_str().unwrap_or("response"));
        Ok(())
    }
}

async fn read_loop(stdout: ChildStdout, stdin: Arc<Mutex<ChildStdin>>, pending: Pending) {
    let mut reader = BufReader::new(stdout);
    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) => {
                debug!("lsp: read error: {err}");
                break;
            }
        };
        match serde_json::from_value::<RpcMessage>(frame) {
            Ok(RpcMessage::Response { id, result, error }) => {
                let Some(id) = id.as_i64() else { continue };
                let Some(tx) = pending.lock().await.remove(&id) else {
                    continue;
                };
                let outcome = match error {
                    Some(err) => Err(Error::Server {
                        code: err["code"].as_i64().unwrap_or(0),
                        message: err["message"].as_str().unwrap_or("unknown").to_owned(),
                    }),
                    None => Ok(result.unwrap_or(Value::Null)),
                };
                let _ = tx.send(outcome);
            }
            Ok(RpcMessage::ServerRequest { id, method, .. }) => {
                debug!("lsp: answering server request {method} with null");
                let reply = json!({"jsonrpc": "2.0", "id": id, "result": null});
                let mut stdin = stdin.lock().await;
                if write_frame(&mut *stdin, &reply).await.is_err() {
                    break;
                }
            }
            Ok(RpcMessage::Notification { method, .. }) => {
                // window/logMessage, diagnostics and friends: tolerated, ignored.
                debug!("lsp ← notification {method}");
            }
            Err(err) => debug!("lsp: unparseable frame: {err}"),
        }
    }
    // Reader gone: fail whatever is still in flight.
    for (_, tx) in pending.lock().await.drain() {
        let _ = tx.send(Err(Error::Closed));
    }
}

/// Write one `Content-Length`-framed message.
pub(crate) async fn write_frame<W>(writer: &mut W, frame: &Value) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(frame)?;
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message; `None` on clean EOF.
pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Option<Value>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            content_length = value.trim().parse().ok();
        }
        // Other headers (Content-Type) are permitted and ignored.
    }

    let len = content_length.ok_or_else(|| Error::Protocol("missing content length".into()))?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    let value = serde_json::from_slice(&body)?;
    Ok(Some(value))
}
