use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::models::{
    MessageQueueConfig, ObservabilityConfig, ProvisioningConfig, RelayEngineConfig,
};

/// 系统配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub message_queue: MessageQueueConfig,
    pub relay: RelayEngineConfig,
    pub provisioning: ProvisioningConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序：
    /// 1. 默认配置
    /// 2. 配置文件（TOML格式）
    /// 3. 环境变量覆盖（前缀: RELAY_）
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            // 尝试默认配置文件路径
            let default_paths = ["config/relay.toml", "relay.toml", "/etc/relay/config.toml"];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        // 环境变量覆盖（前缀: RELAY_）- 最高优先级
        builder = builder.add_source(
            Environment::with_prefix("RELAY")
                .separator("_")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// 从TOML字符串加载配置
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化配置为TOML字符串
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    /// 校验配置有效性
    pub fn validate(&self) -> Result<()> {
        self.message_queue.validate().context("消息队列配置验证失败")?;
        self.relay.validate().context("中继引擎配置验证失败")?;
        self.provisioning.validate().context("容量供给配置验证失败")?;
        self.observability.validate().context("可观测性配置验证失败")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::QueueTransportType;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.message_queue.r#type, QueueTransportType::InMemory);
        assert_eq!(config.relay.poll_interval_seconds, 10);
    }

    #[test]
    fn test_from_toml_overrides_defaults() {
        let toml_str = r#"
            [message_queue]
            type = "redis_stream"
            url = "redis://localhost:6379"
            rx_queue = "inbound"
            tx_queue = "outbound"
            max_batch_size = 5
            visibility_timeout_seconds = 30

            [relay]
            poll_interval_seconds = 3
            handler_target = "forwarder"
        "#;

        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.message_queue.r#type, QueueTransportType::RedisStream);
        assert_eq!(config.message_queue.rx_queue, "inbound");
        assert_eq!(config.message_queue.max_batch_size, 5);
        assert_eq!(config.relay.poll_interval_seconds, 3);
        assert_eq!(config.relay.handler_target, "forwarder");
        // 未覆盖的段保持默认值
        assert_eq!(config.provisioning.strategy, "fixed");
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let toml_str = r#"
            [message_queue]
            rx_queue = "same"
            tx_queue = "same"
        "#;
        assert!(AppConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let toml_str = config.to_toml().unwrap();
        let reloaded = AppConfig::from_toml(&toml_str).unwrap();
        assert_eq!(reloaded.message_queue.rx_queue, config.message_queue.rx_queue);
        assert_eq!(
            reloaded.relay.poll_interval_seconds,
            config.relay.poll_interval_seconds
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [message_queue]
            rx_queue = "file_rx"
            tx_queue = "file_tx"
            "#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.message_queue.rx_queue, "file_rx");
        assert_eq!(config.message_queue.tx_queue, "file_tx");
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load(Some("/nonexistent/relay.toml")).is_err());
    }
}
