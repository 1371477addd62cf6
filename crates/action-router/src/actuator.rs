//! Actuator Interface

use alerting::{ActionKind, DeviceId};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::ActuatorError;

/// Command handed to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub device: DeviceId,
    pub action: ActionKind,
    /// How long the pump runs for a `Water` command
    pub duration: Duration,
}

/// Physical endpoint that executes a command.
///
/// Implementations may take arbitrarily long; the router enforces the
/// timeout.
#[async_trait]
pub trait Actuator: Send + Sync + 'static {
    async fn send_command(&self, command: &ActuatorCommand) -> Result<(), ActuatorError>;
}

/// Scripted answer of a [`MockActuator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    Ack,
    Fail(String),
    /// Never answers
    Hang,
}

/// In-process actuator for tests and dry runs (no hardware required).
///
/// Answers from a script, falling back to a default response once the
/// script runs dry. When gated, every call waits for one permit released
/// through [`MockActuator::release`].
pub struct MockActuator {
    script: Mutex<VecDeque<MockResponse>>,
    fallback: MockResponse,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    commands: Mutex<Vec<ActuatorCommand>>,
}

impl MockActuator {
    /// Mock that always answers `fallback`
    pub fn new(fallback: MockResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            gate: None,
            calls: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Mock that acknowledges everything
    pub fn acking() -> Self {
        Self::new(MockResponse::Ack)
    }

    /// Answer with `responses` in order before the fallback
    pub fn with_script(self, responses: impl IntoIterator<Item = MockResponse>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(responses);
        }
        self
    }

    /// Hold every call until a permit is released
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` held calls proceed
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Number of commands received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Commands received so far, in order
    pub fn commands(&self) -> Vec<ActuatorCommand> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn next_response(&self) -> MockResponse {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Actuator for MockActuator {
    async fn send_command(&self, command: &ActuatorCommand) -> Result<(), ActuatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }
        let response = self.next_response();
        debug!("Mock actuator: {:?} -> {:?}", command, response);

        if let Some(gate) = &self.gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(ActuatorError::Unreachable("gate closed".to_string())),
            }
        }

        match response {
            MockResponse::Ack => Ok(()),
            MockResponse::Fail(reason) => Err(ActuatorError::Rejected(reason)),
            MockResponse::Hang => std::future::pending().await,
        }
    }
}
