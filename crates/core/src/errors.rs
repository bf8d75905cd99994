use thiserror::Error;

/// 中继系统错误类型定义
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("队列传输错误: {0}")]
    Transport(String),

    #[error("分发提交错误: {0}")]
    Dispatch(String),

    #[error("容量供给错误: {0}")]
    Capacity(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type RelayResult<T> = std::result::Result<T, RelayError>;
