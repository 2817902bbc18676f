//! Per-language server pool.
//!
//! Servers start lazily on first demand for their language group and are
//! addressed by `server_key`, so TypeScript, TSX and JavaScript share one
//! process. A server that fails to start is marked unavailable for the
//! rest of the build; queries against it report `Error::Unavailable` and
//! the caller degrades that language to hierarchy-only. Requests are
//! serialised per server and retried with exponential backoff on
//! transport errors.

use crate::client::LspClient;
use crate::errors::{Error, Result};
use crate::util::file_uri;
use graph_builder::config::LspSettings;
use graph_builder::languages::LanguageId;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cooperative cancellation signal for a build.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum ServerState {
    Ready(LspClient),
    Unavailable,
}

pub struct ServerPool {
    root: PathBuf,
    settings: LspSettings,
    servers: HashMap<&'static str, ServerState>,
    opened: HashSet<(&'static str, PathBuf)>,
}

impl ServerPool {
    pub fn new(root: PathBuf, settings: LspSettings) -> Self {
        Self {
            root,
            settings,
            servers: HashMap::new(),
            opened: HashSet::new(),
        }
    }

    /// True once the language's server failed to start.
    pub fn is_unavailable(&self, language: LanguageId) -> bool {
        matches!(
            self.servers.get(language.server_key()),
            Some(ServerState::Unavailable)
        )
    }

    /// References for the symbol at `(line, character)` in `fs_path`.
    ///
    /// `text` is the exact file content already parsed by the build; it is
    /// replayed to the server through `didOpen` before the first query.
    pub async fn references(
        &mut self,
        language: LanguageId,
        fs_path: &Path,
        line: u32,
        character: u32,
        text: &str,
    ) -> Result<Vec<lsp_types::Location>> {
        let key = language.server_key();

        if !self.servers.contains_key(key) {
            let state = match self.start_server(language).await {
                Ok(client) => ServerState::Ready(client),
                Err(err) => {
                    warn!("lsp: server for '{key}' failed to start: {err}");
                    ServerState::Unavailable
                }
            };
            self.servers.insert(key, state);
        }

        let uri = file_uri(fs_path)
            .ok_or_else(|| Error::Protocol(format!("unmappable path {}", fs_path.display())))?;
        let needs_open = self.opened.insert((key, fs_path.to_path_buf()));

        let client = match self.servers.get(key) {
            Some(ServerState::Ready(client)) => client,
            _ => return Err(Error::Unavailable(key.to_owned())),
        };

        if needs_open {
            client.did_open(&uri, language.lsp_identifier(), text).await?;
        }

        let mut attempt = 0u32;
        loop {
            match client
                .references(&uri, line, character, self.settings.request_timeout)
                .await
            {
                Ok(locations) => return Ok(locations),
                Err(err) if err.is_retryable() && attempt < self.settings.max_retries => {
                    let backoff = Duration::from_millis(250 * 2u64.pow(attempt));
                    debug!(
                        "lsp: references retry {} after {:?}: {err}",
                        attempt + 1,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Shut every server down cleanly, with a bounded grace period.
    pub async fn shutdown_all(&mut self) {
        for (key, state) in self.servers.drain() {
            if let ServerState::Ready(client) = state {
                debug!("lsp: shutting down '{key}'");
                let _ = client.shutdown(Duration::from_secs(2)).await;
            }
        }
        self.opened.clear();
    }

    async fn start_server(&self, language: LanguageId) -> Result<LspClient> {
        let key = language.server_key();
        let argv = self
            .settings
            .servers
            .get(key)
            .cloned()
            .or_else(|| default_argv(key))
            .ok_or_else(|| Error::Unavailable(key.to_owned()))?;
        info!("lsp: starting '{key}' ({})", argv.join(" "));
        LspClient::start(&argv, &self.root, self.settings.request_timeout).await
    }
}

/// Launch commands for the stock servers of each language group.
fn default_argv(server_key: &str) -> Option<Vec<String>> {
    let argv: &[&str] = match server_key {
        "python" => &["pylsp"],
        "typescript" => &["typescript-language-server", "--stdio"],
        "ruby" => &["solargraph", "stdio"],
        "go" => &["gopls"],
        "csharp" => &["OmniSharp", "-lsp"],
        "java" => &["jdtls"],
        "php" => &["intelephense", "--stdio"],
        _ => return None,
    };
    Some(argv.iter().map(|s| s.to_string()).collect())
}
