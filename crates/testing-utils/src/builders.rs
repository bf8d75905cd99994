//! Test data builders for creating relay test entities
//!
//! This module provides builder patterns for creating test data with
//! sensible defaults and easy customization.

use relay_core::models::{DispatchEnvelope, QueueMessage, WorkPayload};
use uuid::Uuid;

/// Builder for creating test WorkPayload values
pub struct WorkPayloadBuilder {
    payload: WorkPayload,
}

impl WorkPayloadBuilder {
    pub fn new() -> Self {
        Self {
            payload: WorkPayload::new(
                "https://example.com/bot-data/default.json",
                "user-0001",
            ),
        }
    }

    pub fn with_bot_data_url(mut self, url: &str) -> Self {
        self.payload.bot_data_url = url.to_string();
        self
    }

    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.payload.user_id = user_id.to_string();
        self
    }

    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.payload.extra.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> WorkPayload {
        self.payload
    }
}

impl Default for WorkPayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test QueueMessage values
pub struct QueueMessageBuilder {
    message: QueueMessage,
}

impl QueueMessageBuilder {
    pub fn new() -> Self {
        Self {
            message: QueueMessage {
                id: Uuid::new_v4().to_string(),
                payload: WorkPayloadBuilder::new().build(),
                receipt_handle: Uuid::new_v4().to_string(),
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.message.id = id.to_string();
        self
    }

    pub fn with_payload(mut self, payload: WorkPayload) -> Self {
        self.message.payload = payload;
        self
    }

    pub fn with_receipt_handle(mut self, receipt_handle: &str) -> Self {
        self.message.receipt_handle = receipt_handle.to_string();
        self
    }

    pub fn build(self) -> QueueMessage {
        self.message
    }

    /// Build the message already wrapped in a process-message envelope.
    pub fn build_envelope(self) -> DispatchEnvelope {
        DispatchEnvelope::process_message(self.message)
    }
}

impl Default for QueueMessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}
