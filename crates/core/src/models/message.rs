use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{RelayError, RelayResult};

/// 分发信封中标识"处理单条消息"的操作名
pub const PROCESS_MESSAGE_OPERATION: &str = "process-message";

/// 工作负载的线上格式
///
/// RX 与 TX 两个队列使用完全相同的JSON格式，中继只做转发，
/// 除路由所需字段外不检查也不修改负载内容。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkPayload {
    /// 外部存储的输入数据定位符（s3风格URL）
    pub bot_data_url: String,
    /// 全局用户标识
    pub user_id: String,
    /// 路由之外的字段原样透传
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkPayload {
    pub fn new(bot_data_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            bot_data_url: bot_data_url.into(),
            user_id: user_id.into(),
            extra: Map::new(),
        }
    }

    pub fn serialize(&self) -> RelayResult<String> {
        serde_json::to_string(self).map_err(|e| RelayError::Serialization(format!("序列化负载失败: {e}")))
    }

    pub fn deserialize(json: &str) -> RelayResult<Self> {
        serde_json::from_str(json).map_err(|e| RelayError::Serialization(format!("反序列化负载失败: {e}")))
    }
}

/// 从RX队列接收到的一条消息
///
/// `receipt_handle` 是本次接收持有的租约凭证，删除消息时必须出示；
/// 可见性租约到期后句柄失效，消息会被重新投递给其他接收者。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: String,
    pub payload: WorkPayload,
    pub receipt_handle: String,
}

impl QueueMessage {
    pub fn new(
        id: impl Into<String>,
        payload: WorkPayload,
        receipt_handle: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            payload,
            receipt_handle: receipt_handle.into(),
        }
    }
}

/// 分发信封：把一条消息包装成一次独立的处理器调用
///
/// 用于区分"我被调用来处理单条消息"与"我被定时调度来轮询"。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEnvelope {
    pub operation: String,
    pub message: QueueMessage,
}

impl DispatchEnvelope {
    pub fn process_message(message: QueueMessage) -> Self {
        Self {
            operation: PROCESS_MESSAGE_OPERATION.to_string(),
            message,
        }
    }

    pub fn is_process_message(&self) -> bool {
        self.operation == PROCESS_MESSAGE_OPERATION
    }

    pub fn serialize(&self) -> RelayResult<String> {
        serde_json::to_string(self).map_err(|e| RelayError::Serialization(format!("序列化信封失败: {e}")))
    }

    pub fn deserialize(json: &str) -> RelayResult<Self> {
        serde_json::from_str(json).map_err(|e| RelayError::Serialization(format!("反序列化信封失败: {e}")))
    }
}

/// 入站触发事件
///
/// 触发方有两种：定时调度器（无 operation 字段，触发一次轮询周期）
/// 和分发调用（携带 process-message 信封，触发单条消息处理）。
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    /// 定时调度触发的轮询
    Poll,
    /// 分发调用触发的单条消息处理
    ProcessMessage(QueueMessage),
}

impl TriggerEvent {
    /// 按 operation 字段的有无和取值解析触发事件
    pub fn from_value(event: &Value) -> RelayResult<Self> {
        match event.get("operation").and_then(Value::as_str) {
            Some(PROCESS_MESSAGE_OPERATION) => {
                let message = event.get("message").ok_or_else(|| {
                    RelayError::Serialization("process-message信封缺少message字段".to_string())
                })?;
                let message: QueueMessage = serde_json::from_value(message.clone())
                    .map_err(|e| RelayError::Serialization(format!("解析信封消息失败: {e}")))?;
                Ok(TriggerEvent::ProcessMessage(message))
            }
            _ => Ok(TriggerEvent::Poll),
        }
    }
}
