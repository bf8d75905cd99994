//! Redis Stream队列传输模块
//!
//! 基于Redis Stream消费组实现带可见性租约的队列传输，
//! 按照单一职责原则分解为多个子模块。

pub mod config;
pub mod connection_manager;
pub mod metrics_collector;
pub mod stream_operations;

// 重新导出公共接口
pub use config::RedisStreamConfig;
pub use connection_manager::RedisConnectionManager;
pub use metrics_collector::RedisStreamMetrics;
pub use stream_operations::RedisStreamOperations;

use async_trait::async_trait;
use redis::streams::StreamId;
use relay_core::models::{QueueMessage, WorkPayload};
use relay_core::traits::QueueTransport;
use relay_core::RelayResult;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 健康状态
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub error_message: Option<String>,
}

/// Redis Stream队列传输实现
///
/// 可见性租约映射到消费组语义：XREADGROUP读取的消息进入pending状态，
/// 对其他消费周期不可见；空闲时间超过租约时长的pending消息由
/// XAUTOCLAIM重新认领投递，删除即XACK加XDEL。
pub struct RedisStreamTransport {
    connection_manager: Arc<RedisConnectionManager>,
    operations: Arc<RedisStreamOperations>,
    metrics: Arc<RedisStreamMetrics>,
}

impl RedisStreamTransport {
    /// 创建新的Redis Stream传输实例
    pub async fn new(config: RedisStreamConfig) -> RelayResult<Self> {
        let metrics = Arc::new(RedisStreamMetrics::default());
        let connection_manager =
            Arc::new(RedisConnectionManager::new(config.clone(), metrics.clone()).await?);
        let operations = Arc::new(RedisStreamOperations::new(
            connection_manager.clone(),
            config,
            metrics.clone(),
        ));

        Ok(Self {
            connection_manager,
            operations,
            metrics,
        })
    }

    /// 获取性能指标
    pub fn metrics(&self) -> Arc<RedisStreamMetrics> {
        self.metrics.clone()
    }

    /// 健康检查
    pub async fn health_check(&self) -> RelayResult<HealthStatus> {
        match self.connection_manager.ping().await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                error_message: None,
            }),
            Err(e) => Ok(HealthStatus {
                healthy: false,
                error_message: Some(e.to_string()),
            }),
        }
    }

    /// 当前队列中的消息数
    pub async fn queue_depth(&self, queue: &str) -> RelayResult<u64> {
        self.operations.stream_length(queue).await
    }

    /// 把一个流条目转换为队列消息
    ///
    /// 负载损坏的条目无法被任何处理器消费，直接确认移除，
    /// 避免其在租约到期后被无限重新投递。
    async fn entry_to_message(&self, queue: &str, entry: &StreamId) -> Option<QueueMessage> {
        let payload_json: String = match entry.get("payload") {
            Some(json) => json,
            None => {
                warn!(
                    "Entry {} in stream '{}' has no payload field, discarding",
                    entry.id, queue
                );
                let _ = self.operations.acknowledge_entry(queue, &entry.id).await;
                return None;
            }
        };

        match WorkPayload::deserialize(&payload_json) {
            Ok(payload) => {
                let id = entry
                    .get::<String>("id")
                    .unwrap_or_else(|| entry.id.clone());
                Some(QueueMessage {
                    id,
                    payload,
                    receipt_handle: entry.id.clone(),
                })
            }
            Err(e) => {
                warn!(
                    "Entry {} in stream '{}' has malformed payload ({}), discarding",
                    entry.id, queue, e
                );
                let _ = self.operations.acknowledge_entry(queue, &entry.id).await;
                None
            }
        }
    }
}

#[async_trait]
impl QueueTransport for RedisStreamTransport {
    async fn receive_batch(
        &self,
        queue: &str,
        max_messages: u32,
        visibility_timeout_seconds: u64,
    ) -> RelayResult<Vec<QueueMessage>> {
        self.operations.ensure_stream_and_group(queue).await?;

        let mut entries = Vec::new();

        // 先认领租约过期的消息，再读取新消息补足批次
        let reclaimed = self
            .operations
            .claim_expired_entries(queue, max_messages, visibility_timeout_seconds)
            .await?;
        entries.extend(reclaimed.claimed);

        if (entries.len() as u32) < max_messages {
            let remaining = max_messages - entries.len() as u32;
            if let Some(reply) = self.operations.read_new_entries(queue, remaining).await? {
                for key in reply.keys {
                    entries.extend(key.ids);
                }
            }
        }

        let mut messages = Vec::new();
        for entry in &entries {
            if let Some(message) = self.entry_to_message(queue, entry).await {
                self.metrics.record_message_received();
                messages.push(message);
            }
        }

        debug!(
            "Received {} messages from stream '{}' (lease: {}s)",
            messages.len(),
            queue,
            visibility_timeout_seconds
        );
        Ok(messages)
    }

    async fn enqueue(&self, queue: &str, payload: &WorkPayload) -> RelayResult<String> {
        self.operations.ensure_stream_and_group(queue).await?;

        let message_id = Uuid::new_v4().to_string();
        let payload_json = payload.serialize()?;
        self.operations
            .append_entry(queue, &message_id, &payload_json)
            .await?;

        Ok(message_id)
    }

    async fn delete_message(&self, queue: &str, receipt_handle: &str) -> RelayResult<()> {
        self.operations
            .acknowledge_entry(queue, receipt_handle)
            .await?;
        Ok(())
    }
}
