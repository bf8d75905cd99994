use async_trait::async_trait;

use crate::{
    models::{QueueMessage, WorkPayload},
    RelayResult,
};

/// 队列传输抽象接口
///
/// 传输层提供至少一次投递语义：接收会为每条消息建立有界的可见性租约，
/// 租约到期前未删除的消息会被重新投递。同一条消息因此可能被接收多次，
/// 下游必须容忍重复。
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// 从指定队列批量接收消息
    ///
    /// 返回的每条消息在 `visibility_timeout_seconds` 内对其他接收者不可见。
    /// 队列为空时返回空集合，不是错误。
    async fn receive_batch(
        &self,
        queue: &str,
        max_messages: u32,
        visibility_timeout_seconds: u64,
    ) -> RelayResult<Vec<QueueMessage>>;

    /// 发布负载到指定队列，返回传输层分配的消息ID
    async fn enqueue(&self, queue: &str, payload: &WorkPayload) -> RelayResult<String>;

    /// 按回执句柄删除消息
    ///
    /// 句柄已过期或消息已被删除时视为成功（幂等删除）。
    async fn delete_message(&self, queue: &str, receipt_handle: &str) -> RelayResult<()>;
}
