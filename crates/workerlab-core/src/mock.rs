//! Mock isolation substrate for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{EntrypointError, SubstrateError};
use crate::ids::SandboxId;
use crate::synth::SyntheticRequest;
use crate::traits::{EntrypointResponse, IsolationSubstrate, ModuleSpec, Sandbox};

type HandlerFn =
    dyn Fn(&SyntheticRequest) -> Result<EntrypointResponse, EntrypointError> + Send + Sync;

/// How every sandbox loaded by a [`MockSubstrate`] responds.
#[derive(Clone)]
pub enum MockBehavior {
    /// Return a fixed response.
    Respond { status: u16, body: String },
    /// Fail as if the entrypoint threw.
    Throw(String),
    /// Never return.
    Hang,
    /// Respond after a delay.
    Delayed {
        delay: Duration,
        status: u16,
        body: String,
    },
    /// Return the number of calls this sandbox has served, starting at 1.
    CountCalls,
    /// Compute the response from the request.
    Handler(Arc<HandlerFn>),
}

impl MockBehavior {
    pub fn respond(status: u16, body: &str) -> Self {
        MockBehavior::Respond {
            status,
            body: body.to_string(),
        }
    }

    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&SyntheticRequest) -> Result<EntrypointResponse, EntrypointError>
            + Send
            + Sync
            + 'static,
    {
        MockBehavior::Handler(Arc::new(f))
    }
}

/// A substrate that builds in-memory sandboxes with scripted behavior.
///
/// Records every load so tests can assert on provisioning.
pub struct MockSubstrate {
    behavior: MockBehavior,
    load_count: AtomicU32,
    loaded_ids: Mutex<Vec<SandboxId>>,
    last_source: Mutex<Option<String>>,
    failing_loads: AtomicU32,
    failures_transient: bool,
    terminations: Arc<AtomicU32>,
}

impl MockSubstrate {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            load_count: AtomicU32::new(0),
            loaded_ids: Mutex::new(Vec::new()),
            last_source: Mutex::new(None),
            failing_loads: AtomicU32::new(0),
            failures_transient: true,
            terminations: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Make the next `count` loads fail, as exhaustion or as unavailability.
    pub fn failing_loads(mut self, count: u32, transient: bool) -> Self {
        self.failing_loads = AtomicU32::new(count);
        self.failures_transient = transient;
        self
    }

    /// Number of load attempts, including failed ones.
    pub fn load_count(&self) -> u32 {
        self.load_count.load(Ordering::Relaxed)
    }

    /// Ids of successfully loaded sandboxes, in load order.
    pub fn loaded_ids(&self) -> Vec<SandboxId> {
        self.loaded_ids.lock().unwrap().clone()
    }

    pub fn last_source(&self) -> Option<String> {
        self.last_source.lock().unwrap().clone()
    }

    /// Number of sandboxes that were forcibly terminated.
    pub fn terminations(&self) -> u32 {
        self.terminations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl IsolationSubstrate for MockSubstrate {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load(&self, module: ModuleSpec<'_>) -> Result<Box<dyn Sandbox>, SubstrateError> {
        self.load_count.fetch_add(1, Ordering::Relaxed);

        let remaining = self.failing_loads.load(Ordering::Relaxed);
        if remaining > 0 {
            self.failing_loads.store(remaining - 1, Ordering::Relaxed);
            return Err(if self.failures_transient {
                SubstrateError::Exhausted("mock capacity exhausted".into())
            } else {
                SubstrateError::Unavailable("mock substrate offline".into())
            });
        }

        self.loaded_ids.lock().unwrap().push(module.id.clone());
        *self.last_source.lock().unwrap() = Some(module.source_text.to_string());

        Ok(Box::new(MockSandbox {
            behavior: self.behavior.clone(),
            calls: 0,
            terminations: Arc::clone(&self.terminations),
        }))
    }
}

struct MockSandbox {
    behavior: MockBehavior,
    calls: u32,
    terminations: Arc<AtomicU32>,
}

#[async_trait]
impl Sandbox for MockSandbox {
    async fn fetch(
        &mut self,
        request: &SyntheticRequest,
    ) -> Result<EntrypointResponse, EntrypointError> {
        self.calls += 1;
        match &self.behavior {
            MockBehavior::Respond { status, body } => Ok(EntrypointResponse {
                status: *status,
                body: body.clone(),
            }),
            MockBehavior::Throw(message) => Err(EntrypointError::new(message.clone())),
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            MockBehavior::Delayed {
                delay,
                status,
                body,
            } => {
                tokio::time::sleep(*delay).await;
                Ok(EntrypointResponse {
                    status: *status,
                    body: body.clone(),
                })
            }
            MockBehavior::CountCalls => Ok(EntrypointResponse {
                status: 200,
                body: self.calls.to_string(),
            }),
            MockBehavior::Handler(handler) => handler(request),
        }
    }

    async fn terminate(&mut self) {
        self.terminations.fetch_add(1, Ordering::Relaxed);
    }
}
