use serde::{Deserialize, Serialize};

use crate::{RelayError, RelayResult};

/// 消息队列传输类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueTransportType {
    InMemory,
    RedisStream,
}

/// Redis连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub database: i64,
    pub password: Option<String>,
    pub connection_timeout_seconds: u64,
    pub max_retry_attempts: u32,
    pub retry_delay_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            password: None,
            connection_timeout_seconds: 30,
            max_retry_attempts: 3,
            retry_delay_seconds: 1,
        }
    }
}

/// 消息队列配置
///
/// RX/TX 队列定位符完全来自配置，代码中不出现硬编码的队列名。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageQueueConfig {
    pub r#type: QueueTransportType,
    pub url: String,
    pub redis: Option<RedisConfig>,
    /// 入站队列：待转发的工作
    pub rx_queue: String,
    /// 出站队列：已转发的工作，供下游消费
    pub tx_queue: String,
    /// 单次接收的最大消息数
    pub max_batch_size: u32,
    /// 可见性租约时长（秒）
    pub visibility_timeout_seconds: u64,
}

impl Default for MessageQueueConfig {
    fn default() -> Self {
        Self {
            r#type: QueueTransportType::InMemory,
            url: String::new(),
            redis: None,
            rx_queue: "relay_rx".to_string(),
            tx_queue: "relay_tx".to_string(),
            max_batch_size: 10,
            visibility_timeout_seconds: 30,
        }
    }
}

impl MessageQueueConfig {
    pub fn validate(&self) -> RelayResult<()> {
        if self.rx_queue.is_empty() || self.tx_queue.is_empty() {
            return Err(RelayError::Configuration(
                "rx_queue和tx_queue不能为空".to_string(),
            ));
        }
        if self.rx_queue == self.tx_queue {
            return Err(RelayError::Configuration(
                "rx_queue和tx_queue不能是同一个队列".to_string(),
            ));
        }
        if self.max_batch_size == 0 || self.max_batch_size > 100 {
            return Err(RelayError::Configuration(format!(
                "max_batch_size必须在1到100之间: {}",
                self.max_batch_size
            )));
        }
        if self.visibility_timeout_seconds == 0 {
            return Err(RelayError::Configuration(
                "visibility_timeout_seconds必须大于0".to_string(),
            ));
        }
        if self.r#type == QueueTransportType::RedisStream
            && self.redis.is_none()
            && !(self.url.starts_with("redis://") || self.url.starts_with("rediss://"))
        {
            return Err(RelayError::Configuration(
                "Redis Stream配置缺失：需要提供redis配置段或有效的Redis URL".to_string(),
            ));
        }
        Ok(())
    }
}

/// 中继引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEngineConfig {
    pub enabled: bool,
    /// 轮询周期间隔（秒）
    pub poll_interval_seconds: u64,
    /// 扇出调用的目标处理器名称
    pub handler_target: String,
}

impl Default for RelayEngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: 10,
            handler_target: "relay-message-handler".to_string(),
        }
    }
}

impl RelayEngineConfig {
    pub fn validate(&self) -> RelayResult<()> {
        if self.poll_interval_seconds == 0 {
            return Err(RelayError::Configuration(
                "poll_interval_seconds必须大于0".to_string(),
            ));
        }
        if self.handler_target.is_empty() {
            return Err(RelayError::Configuration(
                "handler_target不能为空".to_string(),
            ));
        }
        Ok(())
    }
}

/// 容量供给配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    pub enabled: bool,
    /// 扩缩容策略名称，目前支持 fixed
    pub strategy: String,
    /// fixed策略的固定实例数
    pub fixed_instances: u32,
    /// 透传给容量后端的不透明配置对象
    pub worker_config: serde_json::Value,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: "fixed".to_string(),
            fixed_instances: 1,
            worker_config: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

impl ProvisioningConfig {
    pub fn validate(&self) -> RelayResult<()> {
        if self.strategy != "fixed" {
            return Err(RelayError::Configuration(format!(
                "不支持的供给策略: {}，支持的策略: fixed",
                self.strategy
            )));
        }
        Ok(())
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn validate(&self) -> RelayResult<()> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(RelayError::Configuration(format!(
                    "不支持的日志级别: {other}"
                )))
            }
        }
        match self.log_format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(RelayError::Configuration(format!(
                "不支持的日志格式: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_queue_config_is_valid() {
        let config = MessageQueueConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.visibility_timeout_seconds, 30);
    }

    #[test]
    fn test_same_rx_tx_queue_rejected() {
        let config = MessageQueueConfig {
            tx_queue: "relay_rx".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redis_stream_requires_redis_config_or_url() {
        let mut config = MessageQueueConfig {
            r#type: QueueTransportType::RedisStream,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.url = "redis://localhost:6379".to_string();
        assert!(config.validate().is_ok());

        config.url = String::new();
        config.redis = Some(RedisConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_provisioning_strategy_rejected() {
        let config = ProvisioningConfig {
            strategy: "ml_forecast".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_visibility_timeout_rejected() {
        let config = MessageQueueConfig {
            visibility_timeout_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
