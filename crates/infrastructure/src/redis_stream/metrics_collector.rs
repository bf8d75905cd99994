use metrics::{counter, gauge, histogram};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Redis Stream性能监控指标
///
/// 用于收集和跟踪Redis Stream队列传输的性能数据。
/// 所有计数器都是原子操作，确保在多线程环境下的数据一致性。
#[derive(Debug, Clone)]
pub struct RedisStreamMetrics {
    pub messages_enqueued: Arc<AtomicU64>,
    pub messages_received: Arc<AtomicU64>,
    pub messages_deleted: Arc<AtomicU64>,
    pub messages_reclaimed: Arc<AtomicU64>,
    pub connection_errors: Arc<AtomicU64>,
    pub active_connections: Arc<AtomicU32>,
}

impl Default for RedisStreamMetrics {
    fn default() -> Self {
        Self {
            messages_enqueued: Arc::new(AtomicU64::new(0)),
            messages_received: Arc::new(AtomicU64::new(0)),
            messages_deleted: Arc::new(AtomicU64::new(0)),
            messages_reclaimed: Arc::new(AtomicU64::new(0)),
            connection_errors: Arc::new(AtomicU64::new(0)),
            active_connections: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl RedisStreamMetrics {
    /// 记录消息入队
    pub fn record_message_enqueued(&self) {
        self.messages_enqueued.fetch_add(1, Ordering::Relaxed);
        counter!("redis_stream_messages_enqueued_total").increment(1);
    }

    /// 记录消息接收
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        counter!("redis_stream_messages_received_total").increment(1);
    }

    /// 记录消息删除
    pub fn record_message_deleted(&self) {
        self.messages_deleted.fetch_add(1, Ordering::Relaxed);
        counter!("redis_stream_messages_deleted_total").increment(1);
    }

    /// 记录租约过期后重新认领的消息
    pub fn record_message_reclaimed(&self) {
        self.messages_reclaimed.fetch_add(1, Ordering::Relaxed);
        counter!("redis_stream_messages_reclaimed_total").increment(1);
    }

    /// 记录连接错误
    pub fn record_connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
        counter!("redis_stream_connection_errors_total").increment(1);
    }

    /// 更新活跃连接数
    pub fn set_active_connections(&self, count: u32) {
        self.active_connections.store(count, Ordering::Relaxed);
        gauge!("redis_stream_active_connections").set(count as f64);
    }

    /// 记录操作耗时
    pub fn record_operation_duration(&self, operation: &str, duration_ms: f64) {
        histogram!(format!("redis_stream_{}_duration_ms", operation)).record(duration_ms);
    }

    /// 获取当前统计信息
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_enqueued: self.messages_enqueued.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_deleted: self.messages_deleted.load(Ordering::Relaxed),
            messages_reclaimed: self.messages_reclaimed.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub messages_enqueued: u64,
    pub messages_received: u64,
    pub messages_deleted: u64,
    pub messages_reclaimed: u64,
    pub connection_errors: u64,
    pub active_connections: u32,
}
