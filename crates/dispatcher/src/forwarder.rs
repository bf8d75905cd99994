use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use relay_core::config::MessageQueueConfig;
use relay_core::models::{DispatchEnvelope, QueueMessage};
use relay_core::traits::{InvocationHandler, QueueTransport};
use relay_core::{RelayError, RelayResult};
use relay_infrastructure::CapacityController;

/// 消息转发处理器
///
/// 每次调用处理一条消息：先把负载转发到TX队列，成功后
/// 再用本条消息的回执句柄删除RX队列中的原消息。
///
/// 顺序不可颠倒：转发失败时消息必须留在RX队列等待重投；
/// 删除失败只告警不报错，重复投递由下游按至少一次语义容忍。
pub struct MessageForwarder {
    transport: Arc<dyn QueueTransport>,
    capacity: Arc<CapacityController>,
    queue_config: MessageQueueConfig,
}

impl MessageForwarder {
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        capacity: Arc<CapacityController>,
        queue_config: MessageQueueConfig,
    ) -> Self {
        Self {
            transport,
            capacity,
            queue_config,
        }
    }

    /// 转发一条消息并删除原消息
    pub async fn process_message(&self, message: QueueMessage) -> RelayResult<QueueMessage> {
        debug!(
            "开始转发消息 {} (user: {})",
            message.id, message.payload.user_id
        );

        let forwarded_id = self
            .transport
            .enqueue(&self.queue_config.tx_queue, &message.payload)
            .await?;
        info!(
            "消息 {} 已转发到TX队列 '{}' (新ID: {})",
            message.id, self.queue_config.tx_queue, forwarded_id
        );

        // 只能用本条消息自己的回执句柄删除
        if let Err(e) = self
            .transport
            .delete_message(&self.queue_config.rx_queue, &message.receipt_handle)
            .await
        {
            warn!(
                "消息 {} 已转发但删除失败，租约到期后可能重复投递: {}",
                message.id, e
            );
        }

        if let Err(e) = self.capacity.request_worker().await {
            warn!("容量请求失败，忽略并继续: {}", e);
        }

        Ok(message)
    }
}

#[async_trait]
impl InvocationHandler for MessageForwarder {
    async fn handle(&self, envelope: DispatchEnvelope) -> RelayResult<QueueMessage> {
        if !envelope.is_process_message() {
            return Err(RelayError::Dispatch(format!(
                "转发处理器不支持的操作: {}",
                envelope.operation
            )));
        }
        self.process_message(envelope.message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::config::ProvisioningConfig;
    use relay_testing_utils::builders::{QueueMessageBuilder, WorkPayloadBuilder};
    use relay_testing_utils::mocks::MockQueueTransport;

    fn forwarder_with(transport: Arc<MockQueueTransport>) -> MessageForwarder {
        let capacity = Arc::new(
            CapacityController::from_config(ProvisioningConfig::default()).unwrap(),
        );
        MessageForwarder::new(transport, capacity, MessageQueueConfig::default())
    }

    #[tokio::test]
    async fn test_forward_then_delete() {
        let transport = Arc::new(MockQueueTransport::new());
        let forwarder = forwarder_with(transport.clone());
        let payload = WorkPayloadBuilder::new().with_user_id("u7").build();
        let message = QueueMessageBuilder::new()
            .with_payload(payload.clone())
            .with_receipt_handle("rh-42")
            .build();

        let processed = forwarder.process_message(message.clone()).await.unwrap();
        assert_eq!(processed, message);

        // 负载原样进入TX队列
        let enqueued = transport.enqueued_payloads();
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0].0, "relay_tx");
        assert_eq!(enqueued[0].1, payload);

        // 用本条消息的回执句柄删除RX原消息
        let deleted = transport.deleted_handles();
        assert_eq!(deleted, vec![("relay_rx".to_string(), "rh-42".to_string())]);
    }

    #[tokio::test]
    async fn test_forward_failure_leaves_message_in_rx() {
        let transport = Arc::new(MockQueueTransport::new());
        transport.set_fail_enqueue(true);
        let forwarder = forwarder_with(transport.clone());
        let message = QueueMessageBuilder::new().build();

        let result = forwarder.process_message(message).await;
        assert!(matches!(result, Err(RelayError::Transport(_))));

        // 转发失败时绝不删除原消息
        assert!(transport.deleted_handles().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_is_not_fatal() {
        let transport = Arc::new(MockQueueTransport::new());
        transport.set_fail_delete(true);
        let forwarder = forwarder_with(transport.clone());
        let message = QueueMessageBuilder::new().with_id("m-9").build();

        // 已转发的消息删除失败只告警，调用仍然成功
        let processed = forwarder.process_message(message).await.unwrap();
        assert_eq!(processed.id, "m-9");
        assert_eq!(transport.enqueued_payloads().len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_failure_is_absorbed() {
        use relay_infrastructure::FixedCountStrategy;
        use relay_testing_utils::mocks::MockCapacityProvisioner;

        let transport = Arc::new(MockQueueTransport::new());
        let provisioner = Arc::new(MockCapacityProvisioner::new());
        provisioner.set_fail_requests(true);
        let capacity = Arc::new(CapacityController::new(
            Arc::new(FixedCountStrategy::new(1)),
            provisioner,
            ProvisioningConfig::default(),
        ));
        let forwarder =
            MessageForwarder::new(transport.clone(), capacity, MessageQueueConfig::default());

        // 容量后端故障不影响转发结果
        let message = QueueMessageBuilder::new().build();
        let result = forwarder.process_message(message).await;
        assert!(result.is_ok());
        assert_eq!(transport.enqueued_payloads().len(), 1);
        assert_eq!(transport.deleted_handles().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_rejects_unknown_operation() {
        let transport = Arc::new(MockQueueTransport::new());
        let forwarder = forwarder_with(transport);
        let envelope = DispatchEnvelope {
            operation: "unknown-op".to_string(),
            message: QueueMessageBuilder::new().build(),
        };

        let result = forwarder.handle(envelope).await;
        assert!(matches!(result, Err(RelayError::Dispatch(_))));
    }

    #[tokio::test]
    async fn test_handle_processes_envelope() {
        let transport = Arc::new(MockQueueTransport::new());
        let forwarder = forwarder_with(transport.clone());
        let envelope = QueueMessageBuilder::new().with_id("m-1").build_envelope();

        let processed = forwarder.handle(envelope).await.unwrap();
        assert_eq!(processed.id, "m-1");
        assert_eq!(transport.enqueued_payloads().len(), 1);
    }
}
