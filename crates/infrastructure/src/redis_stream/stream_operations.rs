use redis::streams::{StreamAutoClaimReply, StreamReadReply};
use relay_core::{RelayError, RelayResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::config::RedisStreamConfig;
use super::connection_manager::RedisConnectionManager;
use super::metrics_collector::RedisStreamMetrics;

/// Redis Stream底层操作
///
/// 封装消费组管理和XADD/XREADGROUP/XAUTOCLAIM/XACK命令，
/// 可见性租约通过消费组的pending状态和最小空闲时间认领实现。
pub struct RedisStreamOperations {
    connection_manager: Arc<RedisConnectionManager>,
    config: RedisStreamConfig,
    metrics: Arc<RedisStreamMetrics>,
}

impl RedisStreamOperations {
    pub fn new(
        connection_manager: Arc<RedisConnectionManager>,
        config: RedisStreamConfig,
        metrics: Arc<RedisStreamMetrics>,
    ) -> Self {
        Self {
            connection_manager,
            config,
            metrics,
        }
    }

    pub fn consumer_group_name(&self, queue_name: &str) -> String {
        format!("{}_{}", self.config.consumer_group_prefix, queue_name)
    }

    /// 确保流和消费组存在
    pub async fn ensure_stream_and_group(&self, stream_name: &str) -> RelayResult<()> {
        let group_name = self.consumer_group_name(stream_name);

        let mut cmd = redis::cmd("XGROUP");
        cmd.arg("CREATE")
            .arg(stream_name)
            .arg(&group_name)
            .arg("0")
            .arg("MKSTREAM");

        match self
            .connection_manager
            .execute_command::<String>(&cmd)
            .await
        {
            Ok(_) => {
                debug!("Created consumer group: {}", group_name);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("BUSYGROUP") {
                    debug!("Consumer group {} already exists", group_name);
                    Ok(())
                } else {
                    Err(RelayError::Transport(format!(
                        "Failed to create consumer group {group_name}: {e}"
                    )))
                }
            }
        }
    }

    /// 追加一条消息到流，返回流条目ID
    pub async fn append_entry(
        &self,
        stream_name: &str,
        message_id: &str,
        payload_json: &str,
    ) -> RelayResult<String> {
        let start = Instant::now();

        let mut cmd = redis::cmd("XADD");
        cmd.arg(stream_name)
            .arg("*")
            .arg("id")
            .arg(message_id)
            .arg("payload")
            .arg(payload_json);

        let entry_id: String = self.connection_manager.execute_command(&cmd).await?;

        self.metrics.record_message_enqueued();
        self.metrics
            .record_operation_duration("enqueue", start.elapsed().as_millis() as f64);

        debug!(
            "Appended entry {} to stream '{}' (message: {})",
            entry_id, stream_name, message_id
        );
        Ok(entry_id)
    }

    /// 认领租约过期的pending条目
    ///
    /// 空闲时间超过可见性租约的消息会被重新投递给当前消费者。
    pub async fn claim_expired_entries(
        &self,
        stream_name: &str,
        max_entries: u32,
        visibility_timeout_seconds: u64,
    ) -> RelayResult<StreamAutoClaimReply> {
        let group_name = self.consumer_group_name(stream_name);
        let min_idle_ms = visibility_timeout_seconds * 1000;

        let mut cmd = redis::cmd("XAUTOCLAIM");
        cmd.arg(stream_name)
            .arg(&group_name)
            .arg(&self.config.consumer_id)
            .arg(min_idle_ms)
            .arg("0-0")
            .arg("COUNT")
            .arg(max_entries);

        let reply: StreamAutoClaimReply = self.connection_manager.execute_command(&cmd).await?;

        if !reply.claimed.is_empty() {
            debug!(
                "Reclaimed {} expired entries from stream '{}'",
                reply.claimed.len(),
                stream_name
            );
            for _ in &reply.claimed {
                self.metrics.record_message_reclaimed();
            }
        }

        Ok(reply)
    }

    /// 读取新的流条目并加入pending列表
    pub async fn read_new_entries(
        &self,
        stream_name: &str,
        max_entries: u32,
    ) -> RelayResult<Option<StreamReadReply>> {
        let group_name = self.consumer_group_name(stream_name);

        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&group_name)
            .arg(&self.config.consumer_id)
            .arg("COUNT")
            .arg(max_entries)
            .arg("STREAMS")
            .arg(stream_name)
            .arg(">");

        self.connection_manager.execute_command(&cmd).await
    }

    /// 确认并移除一个流条目
    ///
    /// XACK返回0说明条目已被其他消费者确认或租约过期后重新投递，
    /// 此时不再执行XDEL，保证删除幂等且不误删他人持有的消息。
    pub async fn acknowledge_entry(&self, stream_name: &str, entry_id: &str) -> RelayResult<bool> {
        let start = Instant::now();
        let group_name = self.consumer_group_name(stream_name);

        let mut ack_cmd = redis::cmd("XACK");
        ack_cmd.arg(stream_name).arg(&group_name).arg(entry_id);
        let ack_count: i64 = self.connection_manager.execute_command(&ack_cmd).await?;

        if ack_count == 0 {
            debug!(
                "Entry {} in stream '{}' was not pending (expired or already acknowledged)",
                entry_id, stream_name
            );
            return Ok(false);
        }

        let mut del_cmd = redis::cmd("XDEL");
        del_cmd.arg(stream_name).arg(entry_id);
        let deleted: i64 = self.connection_manager.execute_command(&del_cmd).await?;
        if deleted == 0 {
            warn!(
                "Entry {} acknowledged but already removed from stream '{}'",
                entry_id, stream_name
            );
        }

        self.metrics.record_message_deleted();
        self.metrics
            .record_operation_duration("delete", start.elapsed().as_millis() as f64);
        Ok(true)
    }

    /// 当前流中的条目数
    pub async fn stream_length(&self, stream_name: &str) -> RelayResult<u64> {
        let mut cmd = redis::cmd("XLEN");
        cmd.arg(stream_name);
        self.connection_manager.execute_command(&cmd).await
    }
}
