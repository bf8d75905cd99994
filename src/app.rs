use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use relay_core::models::TriggerEvent;
use relay_core::AppConfig;
use relay_dispatcher::{MessageForwarder, PollOutcome, RelayPoller, RelayService, TriggerOutcome};
use relay_infrastructure::{
    CapacityController, HandlerRegistry, TokioDispatchInvoker, TransportFactory,
};

/// 主应用程序
///
/// 组装队列传输、分发调用器、容量控制器与中继服务，
/// 并驱动定时轮询循环。
pub struct Application {
    config: AppConfig,
    service: Arc<RelayService>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化队列中继分发系统");

        let transport = TransportFactory::create(&config.message_queue)
            .await
            .context("创建队列传输失败")?;

        let capacity = Arc::new(
            CapacityController::from_config(config.provisioning.clone())
                .context("创建容量控制器失败")?,
        );

        let registry = Arc::new(HandlerRegistry::new());
        let forwarder = Arc::new(MessageForwarder::new(
            transport.clone(),
            capacity.clone(),
            config.message_queue.clone(),
        ));
        registry.register(&config.relay.handler_target, forwarder.clone());

        let invoker = Arc::new(TokioDispatchInvoker::new(registry));
        let poller = Arc::new(RelayPoller::new(
            transport,
            invoker,
            capacity,
            config.message_queue.clone(),
            config.relay.clone(),
        ));

        let service = Arc::new(RelayService::new(poller, forwarder));

        Ok(Self { config, service })
    }

    /// 运行定时轮询循环，直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        if !self.config.relay.enabled {
            warn!("中继引擎已禁用，等待关闭信号");
            let _ = shutdown_rx.recv().await;
            return Ok(());
        }

        info!(
            "启动中继轮询循环 (间隔: {}秒, RX: '{}', TX: '{}')",
            self.config.relay.poll_interval_seconds,
            self.config.message_queue.rx_queue,
            self.config.message_queue.tx_queue
        );

        let mut interval = tokio::time::interval(Duration::from_secs(
            self.config.relay.poll_interval_seconds,
        ));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.service.handle_trigger(TriggerEvent::Poll).await {
                        error!("轮询周期失败: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("轮询循环收到关闭信号");
                    break;
                }
            }
        }

        info!("中继轮询循环已停止");
        Ok(())
    }

    /// 执行单个轮询周期后返回
    pub async fn run_once(&self) -> Result<PollOutcome> {
        match self.service.handle_trigger(TriggerEvent::Poll).await? {
            TriggerOutcome::Polled(outcome) => Ok(outcome),
            TriggerOutcome::Processed(message) => {
                // 轮询触发不会产生消息处理结果
                Err(anyhow::anyhow!("意外的触发结果: 消息 {}", message.id))
            }
        }
    }
}
