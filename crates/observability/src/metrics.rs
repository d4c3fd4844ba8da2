//! Funnel 指标收集模块
//!
//! 通过 `metrics` facade 记录漏斗运行指标；未安装 recorder 时为空操作。

use metrics::{counter, gauge, histogram};

/// 记录数据块进入漏斗
pub fn record_chunk_ingested(funnel: &str, bytes: usize) {
    counter!("funnel_chunks_ingested_total", "funnel" => funnel.to_string()).increment(1);
    counter!("funnel_bytes_ingested_total", "funnel" => funnel.to_string())
        .increment(bytes as u64);
}

/// 记录数据块写入桶
pub fn record_chunk_delivered(funnel: &str, bucket: &str, bytes: usize) {
    counter!(
        "funnel_chunks_delivered_total",
        "funnel" => funnel.to_string(),
        "bucket" => bucket.to_string()
    )
    .increment(1);
    counter!(
        "funnel_bytes_delivered_total",
        "funnel" => funnel.to_string(),
        "bucket" => bucket.to_string()
    )
    .increment(bytes as u64);
}

/// 记录 shutoff 事件
pub fn record_shutoff(funnel: &str) {
    counter!("funnel_shutoff_total", "funnel" => funnel.to_string()).increment(1);
}

/// 记录桶背压
pub fn record_backpressure(funnel: &str, bucket: &str) {
    counter!(
        "funnel_backpressure_total",
        "funnel" => funnel.to_string(),
        "bucket" => bucket.to_string()
    )
    .increment(1);
}

/// 记录缓冲区深度
pub fn record_buffer_depth(funnel: &str, depth: usize) {
    gauge!("funnel_buffer_depth", "funnel" => funnel.to_string()).set(depth as f64);
}

/// 记录桶挂载
pub fn record_bucket_attached(funnel: &str, bucket: &str) {
    counter!(
        "funnel_bucket_attached_total",
        "funnel" => funnel.to_string(),
        "bucket" => bucket.to_string()
    )
    .increment(1);
}

/// 记录桶封口时的填充量
pub fn record_bucket_capped(funnel: &str, bucket: &str, chunks: u64, bytes: u64) {
    counter!(
        "funnel_bucket_capped_total",
        "funnel" => funnel.to_string(),
        "bucket" => bucket.to_string()
    )
    .increment(1);
    histogram!("funnel_bucket_fill_chunks", "funnel" => funnel.to_string())
        .record(chunks as f64);
    histogram!("funnel_bucket_fill_bytes", "funnel" => funnel.to_string()).record(bytes as f64);
}

/// 记录容量策略丢弃/拒绝的数据块
pub fn record_chunks_dropped(funnel: &str, reason: &str) {
    counter!(
        "funnel_chunks_dropped_total",
        "funnel" => funnel.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录终止时滞留的数据块
pub fn record_stranded(funnel: &str, chunks: usize) {
    gauge!("funnel_stranded_chunks", "funnel" => funnel.to_string()).set(chunks as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorders_without_recorder_are_noops() {
        record_chunk_ingested("f", 3);
        record_chunk_delivered("f", "b", 3);
        record_bucket_capped("f", "b", 1, 3);
        record_buffer_depth("f", 0);
        record_stranded("f", 0);
    }
}
