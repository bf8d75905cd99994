use async_trait::async_trait;
use relay_core::models::{QueueMessage, WorkPayload};
use relay_core::traits::QueueTransport;
use relay_core::{RelayError, RelayResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 内存队列传输实现
///
/// 带可见性租约语义的内存队列，适用于嵌入式部署和测试场景。
/// 消息被接收后进入租约期，在租约期内对其他接收者不可见；
/// 租约到期且未被删除的消息会被重新投递（至少一次语义）。
#[derive(Debug)]
pub struct InMemoryQueueTransport {
    /// 队列存储：队列名 -> 消息条目列表
    queues: Arc<RwLock<HashMap<String, Vec<QueueEntry>>>>,
}

#[derive(Debug, Clone)]
struct QueueEntry {
    id: String,
    payload: WorkPayload,
    /// 当前投递的回执句柄，每次投递都会更换
    receipt_handle: String,
    /// 消息再次可见的时间点
    visible_at: Instant,
}

impl InMemoryQueueTransport {
    pub fn new() -> Self {
        info!("Creating in-memory queue transport");
        Self {
            queues: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 当前队列中消息总数（包含租约期内的消息）
    pub async fn queue_depth(&self, queue: &str) -> usize {
        let queues = self.queues.read().await;
        queues.get(queue).map(|q| q.len()).unwrap_or(0)
    }

    /// 当前可见（可被接收）的消息数
    pub async fn visible_count(&self, queue: &str) -> usize {
        let now = Instant::now();
        let queues = self.queues.read().await;
        queues
            .get(queue)
            .map(|q| q.iter().filter(|e| e.visible_at <= now).count())
            .unwrap_or(0)
    }
}

impl Default for InMemoryQueueTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueTransport for InMemoryQueueTransport {
    async fn receive_batch(
        &self,
        queue: &str,
        max_messages: u32,
        visibility_timeout_seconds: u64,
    ) -> RelayResult<Vec<QueueMessage>> {
        if queue.is_empty() {
            return Err(RelayError::Transport("队列名不能为空".to_string()));
        }

        let now = Instant::now();
        let lease = Duration::from_secs(visibility_timeout_seconds);
        let mut queues = self.queues.write().await;
        let entries = queues.entry(queue.to_string()).or_default();

        let mut batch = Vec::new();
        for entry in entries.iter_mut() {
            if batch.len() >= max_messages as usize {
                break;
            }
            if entry.visible_at > now {
                continue;
            }

            // 每次投递更换回执句柄，过期租约的旧句柄随之失效
            entry.receipt_handle = Uuid::new_v4().to_string();
            entry.visible_at = now + lease;

            batch.push(QueueMessage {
                id: entry.id.clone(),
                payload: entry.payload.clone(),
                receipt_handle: entry.receipt_handle.clone(),
            });
        }

        debug!(
            "Received {} messages from queue '{}' (lease: {}s)",
            batch.len(),
            queue,
            visibility_timeout_seconds
        );
        Ok(batch)
    }

    async fn enqueue(&self, queue: &str, payload: &WorkPayload) -> RelayResult<String> {
        if queue.is_empty() {
            return Err(RelayError::Transport("队列名不能为空".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let mut queues = self.queues.write().await;
        queues.entry(queue.to_string()).or_default().push(QueueEntry {
            id: id.clone(),
            payload: payload.clone(),
            receipt_handle: Uuid::new_v4().to_string(),
            visible_at: Instant::now(),
        });

        debug!("Enqueued message {} to queue '{}'", id, queue);
        Ok(id)
    }

    async fn delete_message(&self, queue: &str, receipt_handle: &str) -> RelayResult<()> {
        let mut queues = self.queues.write().await;
        let entries = match queues.get_mut(queue) {
            Some(entries) => entries,
            None => {
                warn!("Delete on unknown queue '{}', ignoring", queue);
                return Ok(());
            }
        };

        let before = entries.len();
        entries.retain(|e| e.receipt_handle != receipt_handle);

        if entries.len() < before {
            debug!("Deleted message from queue '{}'", queue);
        } else {
            // 句柄已过期或消息已被删除，删除是幂等的
            debug!(
                "Receipt handle not found in queue '{}' (expired or already deleted)",
                queue
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_testing_utils::builders::WorkPayloadBuilder;

    #[tokio::test]
    async fn test_enqueue_and_receive() {
        let transport = InMemoryQueueTransport::new();
        let payload = WorkPayloadBuilder::new().with_user_id("u1").build();

        let id = transport.enqueue("rx", &payload).await.unwrap();
        assert_eq!(transport.queue_depth("rx").await, 1);

        let batch = transport.receive_batch("rx", 10, 30).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, id);
        assert_eq!(batch[0].payload.user_id, "u1");
    }

    #[tokio::test]
    async fn test_batch_size_limit() {
        let transport = InMemoryQueueTransport::new();
        for i in 0..15 {
            let payload = WorkPayloadBuilder::new()
                .with_user_id(&format!("user-{i}"))
                .build();
            transport.enqueue("rx", &payload).await.unwrap();
        }

        let batch = transport.receive_batch("rx", 10, 30).await.unwrap();
        assert_eq!(batch.len(), 10);

        // 剩余消息在下一批可见
        let batch = transport.receive_batch("rx", 10, 30).await.unwrap();
        assert_eq!(batch.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leased_message_invisible_until_expiry() {
        let transport = InMemoryQueueTransport::new();
        let payload = WorkPayloadBuilder::new().build();
        transport.enqueue("rx", &payload).await.unwrap();

        let first = transport.receive_batch("rx", 10, 30).await.unwrap();
        assert_eq!(first.len(), 1);

        // 租约期内不可见
        let during_lease = transport.receive_batch("rx", 10, 30).await.unwrap();
        assert!(during_lease.is_empty());

        // 租约到期后重新投递，回执句柄更换
        tokio::time::advance(Duration::from_secs(31)).await;
        let redelivered = transport.receive_batch("rx", 10, 30).await.unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].id, first[0].id);
        assert_ne!(redelivered[0].receipt_handle, first[0].receipt_handle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_with_expired_handle_is_noop() {
        let transport = InMemoryQueueTransport::new();
        let payload = WorkPayloadBuilder::new().build();
        transport.enqueue("rx", &payload).await.unwrap();

        let first = transport.receive_batch("rx", 10, 30).await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        let second = transport.receive_batch("rx", 10, 30).await.unwrap();

        // 旧句柄删除不生效，消息仍然在队列中
        transport
            .delete_message("rx", &first[0].receipt_handle)
            .await
            .unwrap();
        assert_eq!(transport.queue_depth("rx").await, 1);

        // 当前句柄删除生效
        transport
            .delete_message("rx", &second[0].receipt_handle)
            .await
            .unwrap();
        assert_eq!(transport.queue_depth("rx").await, 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let transport = InMemoryQueueTransport::new();
        let payload = WorkPayloadBuilder::new().build();
        transport.enqueue("rx", &payload).await.unwrap();

        let batch = transport.receive_batch("rx", 10, 30).await.unwrap();
        let handle = &batch[0].receipt_handle;

        transport.delete_message("rx", handle).await.unwrap();
        transport.delete_message("rx", handle).await.unwrap();
        transport.delete_message("unknown", handle).await.unwrap();
        assert_eq!(transport.queue_depth("rx").await, 0);
    }

    #[tokio::test]
    async fn test_empty_queue_returns_empty_batch() {
        let transport = InMemoryQueueTransport::new();
        let batch = transport.receive_batch("rx", 10, 30).await.unwrap();
        assert!(batch.is_empty());
    }
}
