//! 配置校验模块
//!
//! 校验规则：
//! - 字段级约束 (validator derive)
//! - bucket 名称唯一
//! - file bucket 必须提供 path 参数
//! - log_level 合法

use std::collections::HashSet;

use contracts::{BucketType, ContractError, FunnelConfig};
use validator::Validate;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// 校验 FunnelConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &FunnelConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_bucket_names(config)?;
    validate_bucket_params(config)?;
    validate_telemetry(config)?;
    Ok(())
}

/// 字段级约束
fn validate_fields(config: &FunnelConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation(config.name.as_str(), e.to_string()))
}

/// 校验 bucket 名称唯一性
fn validate_bucket_names(config: &FunnelConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for bucket in &config.buckets {
        if !seen.insert(bucket.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("buckets[name={}]", bucket.name),
                "duplicate bucket name",
            ));
        }
    }
    Ok(())
}

/// 校验 bucket 类型参数
fn validate_bucket_params(config: &FunnelConfig) -> Result<(), ContractError> {
    for (idx, bucket) in config.buckets.iter().enumerate() {
        if bucket.bucket_type == BucketType::File
            && bucket.params.get("path").is_none_or(|p| p.is_empty())
        {
            return Err(ContractError::config_validation(
                format!("buckets[{idx}].params.path"),
                "file bucket requires a path",
            ));
        }
    }
    Ok(())
}

/// 校验日志级别
fn validate_telemetry(config: &FunnelConfig) -> Result<(), ContractError> {
    let level = config.telemetry.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ContractError::config_validation(
            "telemetry.log_level",
            format!("unknown log level '{}'", config.telemetry.log_level),
        ));
    }
    Ok(())
}
