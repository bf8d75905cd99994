use async_trait::async_trait;
use relay_core::config::ProvisioningConfig;
use relay_core::traits::{CapacityProvisioner, CapacitySignal, ProvisioningStrategy};
use relay_core::{RelayError, RelayResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 保留的队列深度观察值数量上限
const RECENT_DEPTH_WINDOW: usize = 32;

/// 固定实例数策略
///
/// 只要有新工作到达就维持固定数量的处理实例。
pub struct FixedCountStrategy {
    instances: u32,
}

impl FixedCountStrategy {
    pub fn new(instances: u32) -> Self {
        Self { instances }
    }
}

impl ProvisioningStrategy for FixedCountStrategy {
    fn desired_instances(&self, signal: &CapacitySignal) -> u32 {
        if signal.queue_depth == 0 {
            0
        } else {
            self.instances
        }
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// 仅记录日志的容量后端
///
/// 实际的实例启动留给部署环境的容量后端，这里只记录请求内容。
pub struct LoggingCapacityProvisioner;

#[async_trait]
impl CapacityProvisioner for LoggingCapacityProvisioner {
    async fn request_capacity(&self, worker_config: &serde_json::Value) -> RelayResult<()> {
        info!("Capacity requested with worker config: {}", worker_config);
        Ok(())
    }
}

/// 容量控制器
///
/// 累积队列深度观察值，按注入的策略计算期望实例数，
/// 并向容量后端发出供给请求。
pub struct CapacityController {
    strategy: Arc<dyn ProvisioningStrategy>,
    provisioner: Arc<dyn CapacityProvisioner>,
    config: ProvisioningConfig,
    recent_depths: Mutex<VecDeque<u32>>,
}

impl CapacityController {
    pub fn new(
        strategy: Arc<dyn ProvisioningStrategy>,
        provisioner: Arc<dyn CapacityProvisioner>,
        config: ProvisioningConfig,
    ) -> Self {
        Self {
            strategy,
            provisioner,
            config,
            recent_depths: Mutex::new(VecDeque::with_capacity(RECENT_DEPTH_WINDOW)),
        }
    }

    /// 按配置组装控制器
    pub fn from_config(config: ProvisioningConfig) -> RelayResult<Self> {
        let strategy: Arc<dyn ProvisioningStrategy> = match config.strategy.as_str() {
            "fixed" => Arc::new(FixedCountStrategy::new(config.fixed_instances)),
            other => {
                return Err(RelayError::Configuration(format!(
                    "不支持的供给策略: {other}"
                )))
            }
        };
        Ok(Self::new(strategy, Arc::new(LoggingCapacityProvisioner), config))
    }

    /// 记录一次队列深度观察值
    pub fn record_queue_depth(&self, depth: u32) {
        let mut depths = match self.recent_depths.lock() {
            Ok(depths) => depths,
            Err(poisoned) => poisoned.into_inner(),
        };
        if depths.len() >= RECENT_DEPTH_WINDOW {
            depths.pop_front();
        }
        depths.push_back(depth);
    }

    /// 有新工作转发成功时请求容量
    ///
    /// 返回的错误由调用方记录后继续，不影响转发路径。
    pub async fn request_worker(&self) -> RelayResult<()> {
        let signal = self.build_signal();
        let desired = self.strategy.desired_instances(&signal);

        debug!(
            "Capacity decision: strategy={}, queue_depth={}, desired_instances={}",
            self.strategy.name(),
            signal.queue_depth,
            desired
        );

        if !self.config.enabled {
            debug!("Provisioning disabled, skipping capacity request");
            return Ok(());
        }
        if desired == 0 {
            return Ok(());
        }

        self.provisioner
            .request_capacity(&self.config.worker_config)
            .await
    }

    fn build_signal(&self) -> CapacitySignal {
        let depths = match self.recent_depths.lock() {
            Ok(depths) => depths,
            Err(poisoned) => poisoned.into_inner(),
        };
        CapacitySignal {
            queue_depth: depths.back().copied().unwrap_or(1),
            recent_depths: depths.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_testing_utils::mocks::MockCapacityProvisioner;
    use serde_json::json;

    fn controller_with(
        provisioner: Arc<dyn CapacityProvisioner>,
        config: ProvisioningConfig,
    ) -> CapacityController {
        CapacityController::new(
            Arc::new(FixedCountStrategy::new(config.fixed_instances)),
            provisioner,
            config,
        )
    }

    #[test]
    fn test_fixed_strategy_scales_to_zero_when_idle() {
        let strategy = FixedCountStrategy::new(3);
        let idle = CapacitySignal {
            queue_depth: 0,
            recent_depths: vec![0, 0],
        };
        let busy = CapacitySignal {
            queue_depth: 5,
            recent_depths: vec![2, 5],
        };
        assert_eq!(strategy.desired_instances(&idle), 0);
        assert_eq!(strategy.desired_instances(&busy), 3);
    }

    #[tokio::test]
    async fn test_request_worker_passes_worker_config() {
        let mock = Arc::new(MockCapacityProvisioner::new());
        let config = ProvisioningConfig {
            worker_config: json!({"instance_type": "small"}),
            ..Default::default()
        };
        let controller = controller_with(mock.clone(), config);
        controller.record_queue_depth(4);

        controller.request_worker().await.unwrap();
        assert_eq!(mock.request_count(), 1);
        assert_eq!(mock.requests()[0], json!({"instance_type": "small"}));
    }

    #[tokio::test]
    async fn test_disabled_provisioning_skips_backend() {
        let mock = Arc::new(MockCapacityProvisioner::new());
        let config = ProvisioningConfig {
            enabled: false,
            ..Default::default()
        };
        let controller = controller_with(mock.clone(), config);
        controller.record_queue_depth(4);

        controller.request_worker().await.unwrap();
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_as_capacity_error() {
        let mock = Arc::new(MockCapacityProvisioner::new());
        mock.set_fail_requests(true);
        let controller = controller_with(mock.clone(), ProvisioningConfig::default());
        controller.record_queue_depth(1);

        let result = controller.request_worker().await;
        assert!(matches!(result, Err(RelayError::Capacity(_))));
    }

    #[test]
    fn test_depth_window_is_bounded() {
        let mock = Arc::new(MockCapacityProvisioner::new());
        let controller = controller_with(mock, ProvisioningConfig::default());

        for i in 0..100 {
            controller.record_queue_depth(i);
        }
        let signal = controller.build_signal();
        assert_eq!(signal.recent_depths.len(), RECENT_DEPTH_WINDOW);
        assert_eq!(signal.queue_depth, 99);
    }

    #[test]
    fn test_from_config_rejects_unknown_strategy() {
        let config = ProvisioningConfig {
            strategy: "predictive".to_string(),
            ..Default::default()
        };
        assert!(CapacityController::from_config(config).is_err());
    }
}
