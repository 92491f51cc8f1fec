//! A minimal JSON-envelope RPC client over a Unix-domain stream socket.
//!
//! Framing/correlation is explicitly out of scope for the core;
//! this module is the thin, concrete transport the rest of the crate is
//! built against through the [`GridServer`] trait, so that the CLI has
//! something real to run against a live server.
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::server::{GridServer, ServerInfo, Snapshot, WindowId, WindowUpdate};

/// The default, platform-local socket path.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/grid-server.sock";

/// A connected RPC client. Each request/response round-trip is a single
/// line of JSON terminated with `\n`.
pub struct RpcClient {
    stream: Mutex<BufReader<UnixStream>>,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Connect to `path`, applying `timeout` to both reads and writes.
    pub fn connect(path: &str, timeout: Duration) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .map_err(|e| Error::ServerUnavailable(format!("connecting to {path}: {e}")))?;

        stream
            .set_read_timeout(Some(timeout))
            .map_err(|e| Error::ServerUnavailable(e.to_string()))?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(|e| Error::ServerUnavailable(e.to_string()))?;

        Ok(Self {
            stream: Mutex::new(BufReader::new(stream)),
            next_id: AtomicU64::new(1),
        })
    }

    fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let envelope = json!({ "id": id, "method": method, "params": params });

        trace!(%method, id, "sending RPC request");

        let mut guard = self
            .stream
            .lock()
            .map_err(|_| Error::ServerUnavailable("RPC client lock poisoned".into()))?;

        let line = serde_json::to_string(&envelope)?;
        {
            let stream = guard.get_mut();
            stream
                .write_all(line.as_bytes())
                .and_then(|_| stream.write_all(b"\n"))
                .map_err(|e| Error::ServerUnavailable(format!("writing request: {e}")))?;
        }

        let mut response_line = String::new();
        guard
            .read_line(&mut response_line)
            .map_err(|e| Error::ServerUnavailable(format!("reading response: {e}")))?;

        if response_line.is_empty() {
            return Err(Error::ServerUnavailable("connection closed by server".into()));
        }

        let response: Value = serde_json::from_str(response_line.trim_end())?;

        let response_id = response.get("id").and_then(Value::as_u64);
        if response_id != Some(id) {
            return Err(Error::ServerUnavailable(format!(
                "response id {response_id:?} did not match request id {id}"
            )));
        }

        if let Some(err) = response.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(-1);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown server error")
                .to_string();
            return Err(Error::ServerError { code, message });
        }

        debug!(%method, id, "RPC call succeeded");

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}

impl GridServer for RpcClient {
    fn ping(&self) -> Result<()> {
        self.call("ping", json!({}))?;
        Ok(())
    }

    fn server_info(&self) -> Result<ServerInfo> {
        let result = self.call("getServerInfo", json!({}))?;
        serde_json::from_value(result).map_err(Error::from)
    }

    fn dump(&self, space: &str) -> Result<Snapshot> {
        let result = self.call("dump", json!({}))?;
        crate::server::snapshot::parse_dump(&result, space)
    }

    fn update_window(&self, update: WindowUpdate) -> Result<()> {
        self.call("updateWindow", serialize(&update)?)?;
        Ok(())
    }

    fn focus_window(&self, id: WindowId) -> Result<()> {
        self.call("window.focus", json!({ "windowId": id }))?;
        Ok(())
    }

    fn raise_window(&self, id: WindowId) -> Result<()> {
        self.call("window.raise", json!({ "windowId": id }))?;
        Ok(())
    }
}

fn serialize<T: Serialize>(v: &T) -> Result<Value> {
    serde_json::to_value(v).map_err(Error::from)
}
