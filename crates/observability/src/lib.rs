//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出
//! - 漏斗指标记录
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::metrics;
//!
//! // 初始化
//! observability::init(&config.telemetry)?;
//!
//! // 记录漏斗指标
//! metrics::record_buffer_depth("ingest", funnel.pending());
//! ```

pub mod metrics;

use anyhow::{anyhow, Context, Result};
use contracts::{LogFormatKind, TelemetryConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

// Re-exports
pub use crate::metrics::{
    record_backpressure, record_bucket_attached, record_bucket_capped, record_buffer_depth,
    record_chunk_delivered, record_chunk_ingested, record_chunks_dropped, record_shutoff,
    record_stranded,
};

/// 按遥测配置初始化 Tracing 与 Prometheus
///
/// - `RUST_LOG` 优先于 `log_level`
/// - `metrics_port` 为 None 时不启动导出器
///
/// # Errors
/// 全局 subscriber 已存在，或导出器端口绑定失败。
pub fn init(telemetry: &TelemetryConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&telemetry.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match telemetry.log_format {
        LogFormatKind::Json => builder.json().with_current_span(true).try_init(),
        LogFormatKind::Pretty => builder.pretty().try_init(),
        LogFormatKind::Compact => builder.compact().try_init(),
    };
    installed
        .map_err(|e| anyhow!(e))
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = telemetry.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("Failed to install Prometheus recorder")?;
        tracing::info!(port, "Prometheus metrics endpoint initialized");
    }

    tracing::info!(
        log_format = ?telemetry.log_format,
        metrics_port = ?telemetry.metrics_port,
        "Observability initialized"
    );
    Ok(())
}
