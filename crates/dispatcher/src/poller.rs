use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info};

use relay_core::config::{MessageQueueConfig, RelayEngineConfig};
use relay_core::models::DispatchEnvelope;
use relay_core::traits::{DispatchInvoker, QueueTransport};
use relay_core::RelayResult;
use relay_infrastructure::CapacityController;

/// 一次轮询周期的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// 本次从RX队列接收到的消息数
    pub received: usize,
    /// 成功提交分发的消息数
    pub submitted: usize,
    /// 提交失败的消息数（消息仍留在RX队列，租约到期后重投）
    pub failed_submissions: usize,
}

impl PollOutcome {
    pub fn empty() -> Self {
        Self {
            received: 0,
            submitted: 0,
            failed_submissions: 0,
        }
    }

    /// 轮询周期的摘要描述
    pub fn summary(&self) -> String {
        format!("Messages received: {}", self.received)
    }
}

/// 中继轮询引擎
///
/// 每个周期从RX队列拉取一批消息，为每条消息构造一个
/// process-message信封并以即发即忘方式提交给分发调用器。
/// 单条消息的提交失败不影响同批次其他消息。
pub struct RelayPoller {
    transport: Arc<dyn QueueTransport>,
    invoker: Arc<dyn DispatchInvoker>,
    capacity: Arc<CapacityController>,
    queue_config: MessageQueueConfig,
    engine_config: RelayEngineConfig,
}

impl RelayPoller {
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        invoker: Arc<dyn DispatchInvoker>,
        capacity: Arc<CapacityController>,
        queue_config: MessageQueueConfig,
        engine_config: RelayEngineConfig,
    ) -> Self {
        Self {
            transport,
            invoker,
            capacity,
            queue_config,
            engine_config,
        }
    }

    /// 执行一个完整的轮询周期
    ///
    /// RX队列不可达时返回传输错误；扇出阶段的提交失败只计数，
    /// 不中断本批次剩余消息的提交。
    pub async fn run_cycle(&self) -> RelayResult<PollOutcome> {
        let messages = self
            .transport
            .receive_batch(
                &self.queue_config.rx_queue,
                self.queue_config.max_batch_size,
                self.queue_config.visibility_timeout_seconds,
            )
            .await?;

        self.capacity.record_queue_depth(messages.len() as u32);
        info!("Messages received: {}", messages.len());

        if messages.is_empty() {
            return Ok(PollOutcome::empty());
        }

        let submissions = messages.iter().map(|message| {
            let envelope = DispatchEnvelope::process_message(message.clone());
            async move {
                let result = self
                    .invoker
                    .invoke_async(&self.engine_config.handler_target, &envelope)
                    .await;
                (envelope.message.id, result)
            }
        });

        let mut submitted = 0;
        let mut failed_submissions = 0;
        for (message_id, result) in join_all(submissions).await {
            match result {
                Ok(()) => {
                    debug!("消息 {} 已提交分发", message_id);
                    submitted += 1;
                }
                Err(e) => {
                    // 提交失败的消息留在RX队列，租约到期后重新投递
                    error!("消息 {} 提交分发失败: {}", message_id, e);
                    failed_submissions += 1;
                }
            }
        }

        let outcome = PollOutcome {
            received: messages.len(),
            submitted,
            failed_submissions,
        };
        info!(
            "本轮询周期完成: 接收 {} 条，提交 {} 条，失败 {} 条",
            outcome.received, outcome.submitted, outcome.failed_submissions
        );
        Ok(outcome)
    }
}
