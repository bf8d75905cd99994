//! 中继分发核心
//!
//! 从RX队列批量拉取消息、以即发即忘方式扇出到消息处理器，
//! 处理器把负载转发到TX队列后删除原消息（先转发后删除，至少一次语义）。

pub mod forwarder;
pub mod poller;
pub mod service;

pub use forwarder::MessageForwarder;
pub use poller::{PollOutcome, RelayPoller};
pub use service::{RelayService, TriggerOutcome};
