//! Mock implementations for the transport, invoker and provisioner traits
//!
//! This module provides in-memory mock implementations that can be used
//! for unit testing without requiring a running queue backend or real
//! dispatch targets. All mocks record the calls made against them and
//! support per-call fault injection.

use async_trait::async_trait;
use relay_core::models::{DispatchEnvelope, QueueMessage, WorkPayload};
use relay_core::traits::{CapacityProvisioner, DispatchInvoker, QueueTransport};
use relay_core::{RelayError, RelayResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Mock implementation of QueueTransport for testing
///
/// Messages seeded via `push_message` are handed out by `receive_batch`
/// and tracked as in-flight until `delete_message` is called with their
/// receipt handle. Deletes are idempotent, matching the contract of the
/// real transports.
#[derive(Debug, Clone)]
pub struct MockQueueTransport {
    queues: Arc<Mutex<HashMap<String, Vec<QueueMessage>>>>,
    in_flight: Arc<Mutex<HashMap<String, QueueMessage>>>,
    deleted_handles: Arc<Mutex<Vec<(String, String)>>>,
    enqueued: Arc<Mutex<Vec<(String, WorkPayload)>>>,
    fail_receive: Arc<Mutex<bool>>,
    fail_enqueue: Arc<Mutex<bool>>,
    fail_delete: Arc<Mutex<bool>>,
}

impl MockQueueTransport {
    pub fn new() -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            deleted_handles: Arc::new(Mutex::new(Vec::new())),
            enqueued: Arc::new(Mutex::new(Vec::new())),
            fail_receive: Arc::new(Mutex::new(false)),
            fail_enqueue: Arc::new(Mutex::new(false)),
            fail_delete: Arc::new(Mutex::new(false)),
        }
    }

    /// Seed a message into a queue so a later `receive_batch` returns it.
    pub fn push_message(&self, queue: &str, message: QueueMessage) {
        let mut queues = self.queues.lock().unwrap();
        queues.entry(queue.to_string()).or_default().push(message);
    }

    pub fn set_fail_receive(&self, fail: bool) {
        *self.fail_receive.lock().unwrap() = fail;
    }

    pub fn set_fail_enqueue(&self, fail: bool) {
        *self.fail_enqueue.lock().unwrap() = fail;
    }

    pub fn set_fail_delete(&self, fail: bool) {
        *self.fail_delete.lock().unwrap() = fail;
    }

    /// (queue, receipt_handle) pairs in delete-call order.
    pub fn deleted_handles(&self) -> Vec<(String, String)> {
        self.deleted_handles.lock().unwrap().clone()
    }

    /// (queue, payload) pairs in enqueue-call order.
    pub fn enqueued_payloads(&self) -> Vec<(String, WorkPayload)> {
        self.enqueued.lock().unwrap().clone()
    }

    pub fn queue_len(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .unwrap()
            .get(queue)
            .map(|q| q.len())
            .unwrap_or(0)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.queues.lock().unwrap().clear();
        self.in_flight.lock().unwrap().clear();
        self.deleted_handles.lock().unwrap().clear();
        self.enqueued.lock().unwrap().clear();
    }
}

impl Default for MockQueueTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueTransport for MockQueueTransport {
    async fn receive_batch(
        &self,
        queue: &str,
        max_messages: u32,
        _visibility_timeout_seconds: u64,
    ) -> RelayResult<Vec<QueueMessage>> {
        if *self.fail_receive.lock().unwrap() {
            return Err(RelayError::Transport("mock receive failure".to_string()));
        }

        let mut queues = self.queues.lock().unwrap();
        let entries = queues.entry(queue.to_string()).or_default();
        let take = (max_messages as usize).min(entries.len());
        let batch: Vec<QueueMessage> = entries.drain(..take).collect();

        let mut in_flight = self.in_flight.lock().unwrap();
        for message in &batch {
            in_flight.insert(message.receipt_handle.clone(), message.clone());
        }

        Ok(batch)
    }

    async fn enqueue(&self, queue: &str, payload: &WorkPayload) -> RelayResult<String> {
        if *self.fail_enqueue.lock().unwrap() {
            return Err(RelayError::Transport("mock enqueue failure".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        self.enqueued
            .lock()
            .unwrap()
            .push((queue.to_string(), payload.clone()));

        let mut queues = self.queues.lock().unwrap();
        queues.entry(queue.to_string()).or_default().push(QueueMessage {
            id: id.clone(),
            payload: payload.clone(),
            receipt_handle: Uuid::new_v4().to_string(),
        });

        Ok(id)
    }

    async fn delete_message(&self, queue: &str, receipt_handle: &str) -> RelayResult<()> {
        if *self.fail_delete.lock().unwrap() {
            return Err(RelayError::Transport("mock delete failure".to_string()));
        }

        self.deleted_handles
            .lock()
            .unwrap()
            .push((queue.to_string(), receipt_handle.to_string()));

        // Idempotent: deleting an unknown handle is not an error
        self.in_flight.lock().unwrap().remove(receipt_handle);
        Ok(())
    }
}

/// Mock implementation of DispatchInvoker for testing
///
/// Records every submitted envelope. Individual message ids can be marked
/// as failing so tests can exercise partial fan-out failures.
#[derive(Debug, Clone)]
pub struct MockDispatchInvoker {
    invocations: Arc<Mutex<Vec<(String, DispatchEnvelope)>>>,
    fail_message_ids: Arc<Mutex<HashSet<String>>>,
    fail_all: Arc<Mutex<bool>>,
}

impl MockDispatchInvoker {
    pub fn new() -> Self {
        Self {
            invocations: Arc::new(Mutex::new(Vec::new())),
            fail_message_ids: Arc::new(Mutex::new(HashSet::new())),
            fail_all: Arc::new(Mutex::new(false)),
        }
    }

    /// Make submissions fail for the envelope carrying this message id.
    pub fn fail_for_message(&self, message_id: &str) {
        self.fail_message_ids
            .lock()
            .unwrap()
            .insert(message_id.to_string());
    }

    pub fn set_fail_all(&self, fail: bool) {
        *self.fail_all.lock().unwrap() = fail;
    }

    /// (target, envelope) pairs for every successful submission.
    pub fn invocations(&self) -> Vec<(String, DispatchEnvelope)> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

impl Default for MockDispatchInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DispatchInvoker for MockDispatchInvoker {
    async fn invoke_async(&self, target: &str, envelope: &DispatchEnvelope) -> RelayResult<()> {
        if *self.fail_all.lock().unwrap() {
            return Err(RelayError::Dispatch("mock dispatch failure".to_string()));
        }
        if self
            .fail_message_ids
            .lock()
            .unwrap()
            .contains(&envelope.message.id)
        {
            return Err(RelayError::Dispatch(format!(
                "mock dispatch failure for message {}",
                envelope.message.id
            )));
        }

        self.invocations
            .lock()
            .unwrap()
            .push((target.to_string(), envelope.clone()));
        Ok(())
    }
}

/// Mock implementation of CapacityProvisioner for testing
#[derive(Debug, Clone)]
pub struct MockCapacityProvisioner {
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
    fail_requests: Arc<Mutex<bool>>,
}

impl MockCapacityProvisioner {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            fail_requests: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_fail_requests(&self, fail: bool) {
        *self.fail_requests.lock().unwrap() = fail;
    }

    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockCapacityProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapacityProvisioner for MockCapacityProvisioner {
    async fn request_capacity(&self, worker_config: &serde_json::Value) -> RelayResult<()> {
        if *self.fail_requests.lock().unwrap() {
            return Err(RelayError::Capacity("mock capacity failure".to_string()));
        }
        self.requests.lock().unwrap().push(worker_config.clone());
        Ok(())
    }
}
