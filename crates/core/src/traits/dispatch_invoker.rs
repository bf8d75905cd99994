use async_trait::async_trait;

use crate::{
    models::{DispatchEnvelope, QueueMessage},
    RelayResult,
};

/// 分发调用抽象接口
///
/// 以事件方式触发一次独立的处理器执行，与调用方的生命周期解耦。
#[async_trait]
pub trait DispatchInvoker: Send + Sync {
    /// 触发目标处理器执行信封中的消息
    ///
    /// 提交请求被分发基底接受即返回，不等待处理器执行完成。
    /// 返回的错误只说明提交本身失败（限流、目标不存在、负载非法等），
    /// 与处理器最终的成败无关。
    async fn invoke_async(&self, target: &str, envelope: &DispatchEnvelope) -> RelayResult<()>;
}

/// 分发调用的目标处理器
///
/// 每次调用处理一条消息；成功时返回原消息用于关联和日志。
#[async_trait]
pub trait InvocationHandler: Send + Sync {
    async fn handle(&self, envelope: DispatchEnvelope) -> RelayResult<QueueMessage>;
}
