use async_trait::async_trait;
use relay_core::models::DispatchEnvelope;
use relay_core::traits::{DispatchInvoker, InvocationHandler};
use relay_core::{RelayError, RelayResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

/// 处理器注册表
///
/// 以名称为键维护分发调用的目标处理器，调用目标完全来自配置。
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn InvocationHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, target: &str, handler: Arc<dyn InvocationHandler>) {
        info!("Registering invocation handler: {}", target);
        let mut handlers = match self.handlers.write() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.insert(target.to_string(), handler);
    }

    pub fn get(&self, target: &str) -> Option<Arc<dyn InvocationHandler>> {
        let handlers = match self.handlers.read() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.get(target).cloned()
    }

    pub fn registered_targets(&self) -> Vec<String> {
        let handlers = match self.handlers.read() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.keys().cloned().collect()
    }
}

/// 基于Tokio任务的分发调用器
///
/// 每次调用派生一个独立任务执行处理器，提交成功即返回，
/// 不等待处理器完成。处理器自身的成败只体现在日志中，
/// 不会回传给提交方。
pub struct TokioDispatchInvoker {
    registry: Arc<HandlerRegistry>,
}

impl TokioDispatchInvoker {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl DispatchInvoker for TokioDispatchInvoker {
    async fn invoke_async(&self, target: &str, envelope: &DispatchEnvelope) -> RelayResult<()> {
        let handler = self.registry.get(target).ok_or_else(|| {
            RelayError::Dispatch(format!("未注册的分发目标: {target}"))
        })?;

        let target = target.to_string();
        let envelope = envelope.clone();
        let message_id = envelope.message.id.clone();

        tokio::spawn(async move {
            match handler.handle(envelope).await {
                Ok(message) => {
                    debug!(
                        "Handler '{}' completed for message {}",
                        target, message.id
                    );
                }
                Err(e) => {
                    error!(
                        "Handler '{}' failed for message {}: {}",
                        target, message_id, e
                    );
                }
            }
        });

        Ok(())
    }
}
