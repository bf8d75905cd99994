use async_trait::async_trait;

use crate::RelayResult;

/// 容量信号：供给策略据此决定需要多少处理实例
#[derive(Debug, Clone, Default)]
pub struct CapacitySignal {
    /// 本次触发时观察到的队列深度
    pub queue_depth: u32,
    /// 最近若干次触发的队列深度观察值（由容量控制器累积）
    pub recent_depths: Vec<u32>,
}

/// 实例数量决策策略
///
/// 具体的扩缩容算法是明确的扩展点，通过注入替换，核心不猜测任何启发式。
pub trait ProvisioningStrategy: Send + Sync {
    fn desired_instances(&self, signal: &CapacitySignal) -> u32;

    fn name(&self) -> &str;
}

/// 容量供给抽象接口
///
/// 通知容量后端有新工作到达。尽力而为：调用永远不应阻塞中继路径，
/// 后端不可用时调用方记录 `RelayError::Capacity` 并继续，不得因此失败。
#[async_trait]
pub trait CapacityProvisioner: Send + Sync {
    async fn request_capacity(&self, worker_config: &serde_json::Value) -> RelayResult<()>;
}
