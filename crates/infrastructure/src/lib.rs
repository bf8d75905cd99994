//! 中继系统基础设施层
//!
//! 提供队列传输的具体实现（内存队列、Redis Stream）、
//! 基于Tokio的分发调用器以及容量供给控制器。

pub mod in_memory_queue;
pub mod invoker;
pub mod provisioner;
pub mod redis_stream;
pub mod transport_factory;

pub use in_memory_queue::InMemoryQueueTransport;
pub use invoker::{HandlerRegistry, TokioDispatchInvoker};
pub use provisioner::{CapacityController, FixedCountStrategy, LoggingCapacityProvisioner};
pub use redis_stream::{RedisStreamConfig, RedisStreamTransport};
pub use transport_factory::TransportFactory;
