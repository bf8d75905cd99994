use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use relay_core::models::{QueueMessage, TriggerEvent};
use relay_core::RelayResult;

use crate::forwarder::MessageForwarder;
use crate::poller::{PollOutcome, RelayPoller};

/// 触发处理结果
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// 完成了一个轮询周期
    Polled(PollOutcome),
    /// 处理了一条消息
    Processed(QueueMessage),
}

/// 中继服务：入站触发的统一入口
///
/// 定时调度触发轮询周期，分发调用触发单条消息转发，
/// 两种触发共用同一个入口按事件内容路由。
pub struct RelayService {
    poller: Arc<RelayPoller>,
    forwarder: Arc<MessageForwarder>,
}

impl RelayService {
    pub fn new(poller: Arc<RelayPoller>, forwarder: Arc<MessageForwarder>) -> Self {
        Self { poller, forwarder }
    }

    /// 处理一个已解析的触发事件
    pub async fn handle_trigger(&self, event: TriggerEvent) -> RelayResult<TriggerOutcome> {
        match event {
            TriggerEvent::Poll => {
                debug!("收到定时轮询触发");
                let outcome = self.poller.run_cycle().await?;
                info!("{}", outcome.summary());
                Ok(TriggerOutcome::Polled(outcome))
            }
            TriggerEvent::ProcessMessage(message) => {
                debug!("收到单条消息处理触发: {}", message.id);
                let processed = self.forwarder.process_message(message).await?;
                Ok(TriggerOutcome::Processed(processed))
            }
        }
    }

    /// 从原始JSON事件解析并处理触发
    pub async fn handle_trigger_value(&self, event: &Value) -> RelayResult<TriggerOutcome> {
        let trigger = TriggerEvent::from_value(event)?;
        self.handle_trigger(trigger).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::config::{MessageQueueConfig, ProvisioningConfig, RelayEngineConfig};
    use relay_infrastructure::CapacityController;
    use relay_testing_utils::builders::QueueMessageBuilder;
    use relay_testing_utils::mocks::{MockDispatchInvoker, MockQueueTransport};
    use serde_json::json;

    fn service_with(
        transport: Arc<MockQueueTransport>,
        invoker: Arc<MockDispatchInvoker>,
    ) -> RelayService {
        let capacity = Arc::new(
            CapacityController::from_config(ProvisioningConfig::default()).unwrap(),
        );
        let poller = Arc::new(RelayPoller::new(
            transport.clone(),
            invoker,
            capacity.clone(),
            MessageQueueConfig::default(),
            RelayEngineConfig::default(),
        ));
        let forwarder = Arc::new(MessageForwarder::new(
            transport,
            capacity,
            MessageQueueConfig::default(),
        ));
        RelayService::new(poller, forwarder)
    }

    #[tokio::test]
    async fn test_poll_trigger_runs_cycle() {
        let transport = Arc::new(MockQueueTransport::new());
        let invoker = Arc::new(MockDispatchInvoker::new());
        transport.push_message("relay_rx", QueueMessageBuilder::new().build());

        let service = service_with(transport, invoker.clone());
        let outcome = service.handle_trigger(TriggerEvent::Poll).await.unwrap();

        match outcome {
            TriggerOutcome::Polled(poll) => {
                assert_eq!(poll.received, 1);
                assert_eq!(poll.submitted, 1);
            }
            other => panic!("Expected Polled, got {other:?}"),
        }
        assert_eq!(invoker.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_process_message_trigger_forwards() {
        let transport = Arc::new(MockQueueTransport::new());
        let invoker = Arc::new(MockDispatchInvoker::new());
        let message = QueueMessageBuilder::new().with_id("m-1").build();

        let service = service_with(transport.clone(), invoker);
        let outcome = service
            .handle_trigger(TriggerEvent::ProcessMessage(message))
            .await
            .unwrap();

        match outcome {
            TriggerOutcome::Processed(processed) => assert_eq!(processed.id, "m-1"),
            other => panic!("Expected Processed, got {other:?}"),
        }
        assert_eq!(transport.enqueued_payloads().len(), 1);
    }

    #[tokio::test]
    async fn test_raw_event_without_operation_triggers_poll() {
        let transport = Arc::new(MockQueueTransport::new());
        let invoker = Arc::new(MockDispatchInvoker::new());

        let service = service_with(transport, invoker);
        let outcome = service.handle_trigger_value(&json!({})).await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Polled(_)));
    }

    #[tokio::test]
    async fn test_raw_process_message_event_routes_to_forwarder() {
        let transport = Arc::new(MockQueueTransport::new());
        let invoker = Arc::new(MockDispatchInvoker::new());
        let envelope = QueueMessageBuilder::new().with_id("m-2").build_envelope();
        let event = serde_json::to_value(&envelope).unwrap();

        let service = service_with(transport.clone(), invoker);
        let outcome = service.handle_trigger_value(&event).await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Processed(_)));
        assert_eq!(transport.enqueued_payloads().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_process_message_event_fails() {
        let transport = Arc::new(MockQueueTransport::new());
        let invoker = Arc::new(MockDispatchInvoker::new());

        let service = service_with(transport, invoker);
        let result = service
            .handle_trigger_value(&json!({"operation": "process-message"}))
            .await;
        assert!(result.is_err());
    }
}
