//! An in-memory mock server: a fixed [`Snapshot`] plus a log of every
//! mutating call, so orchestrator/reconciler tests don't need a real
//! socket.
use std::cell::RefCell;

use crate::error::Result;
use crate::server::{GridServer, ServerInfo, Snapshot, WindowId, WindowUpdate};

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    UpdateWindow(WindowUpdate),
    FocusWindow(WindowId),
    RaiseWindow(WindowId),
}

/// A mock [`GridServer`] that serves a fixed snapshot and records every
/// call it receives for later assertions.
pub struct MockServer {
    snapshot: Snapshot,
    calls: RefCell<Vec<MockCall>>,
    /// Window ids that should fail `updateWindow`, for exercising the
    /// orchestrator's partial-failure batching policy.
    pub failing_window_ids: Vec<WindowId>,
}

impl MockServer {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            calls: RefCell::new(Vec::new()),
            failing_window_ids: Vec::new(),
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.borrow().clone()
    }
}

impl GridServer for MockServer {
    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn server_info(&self) -> Result<ServerInfo> {
        Ok(ServerInfo {
            name: "mock-grid-server".into(),
            version: "0.0.0".into(),
            platform: "mock".into(),
            capabilities: vec![],
        })
    }

    fn dump(&self, _space: &str) -> Result<Snapshot> {
        Ok(self.snapshot.clone())
    }

    fn update_window(&self, update: WindowUpdate) -> Result<()> {
        if self.failing_window_ids.contains(&update.window_id) {
            return Err(crate::error::Error::ServerError {
                code: 500,
                message: format!("mock failure for window {}", update.window_id),
            });
        }
        self.calls.borrow_mut().push(MockCall::UpdateWindow(update));
        Ok(())
    }

    fn focus_window(&self, id: WindowId) -> Result<()> {
        self.calls.borrow_mut().push(MockCall::FocusWindow(id));
        Ok(())
    }

    fn raise_window(&self, id: WindowId) -> Result<()> {
        self.calls.borrow_mut().push(MockCall::RaiseWindow(id));
        Ok(())
    }
}
