//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置到 funnel 的装配测试
//! - 基于 driver 的端到端轮转测试
//! - 背压端到端测试

#[cfg(test)]
mod config_tests {
    use std::collections::VecDeque;

    use config_loader::{ConfigFormat, ConfigLoader};
    use funnel::{create_bucket, ByteBudget, Chunk, DynBucket, Funnel};
    use tempfile::TempDir;

    /// 配置 -> create_bucket -> Funnel，同步轮转两个文件
    #[test]
    fn test_config_driven_file_rotation() {
        let dir = TempDir::new().unwrap();
        let seg0 = dir.path().join("seg-0.log");
        let seg1 = dir.path().join("seg-1.log");

        let content = format!(
            r#"
name = "rotating"

[[buckets]]
name = "seg-0"
bucket_type = "file"
high_water_mark = 2
[buckets.params]
path = "{}"

[[buckets]]
name = "seg-1"
bucket_type = "file"
[buckets.params]
path = "{}"
"#,
            seg0.display(),
            seg1.display()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();

        let budget = ByteBudget::new(4);
        let mut funnel: Funnel<DynBucket, _> = Funnel::from_config(&config, budget.clone());
        let mut spare: VecDeque<DynBucket> = config
            .buckets
            .iter()
            .map(|bucket| create_bucket(bucket).unwrap())
            .collect();

        for text in ["aa", "bb", "cc", "dd"] {
            funnel.ingest(Chunk::text(text)).unwrap();
            // Attach the next segment whenever the funnel has run dry
            if !funnel.is_filling() {
                let next = spare.pop_front().expect("ran out of segments");
                budget.reset();
                funnel.attach(next).unwrap();
            }
        }

        let termination = funnel.terminate().unwrap();
        assert!(termination.is_clean());
        assert!(spare.is_empty());
        assert_eq!(funnel.metrics().shutoff_count(), 2);

        assert_eq!(std::fs::read_to_string(&seg0).unwrap(), "aabb");
        assert_eq!(std::fs::read_to_string(&seg1).unwrap(), "ccdd");
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::ChannelUpstream;
    use funnel::{
        ByteBudget, ChannelBucket, Chunk, Funnel, FunnelDriver, FunnelEvent, MemoryBucket,
        StopReason,
    };
    use tokio::sync::mpsc;

    /// End-to-end test: ChannelUpstream -> FunnelDriver -> rotating MemoryBuckets
    ///
    /// 验证完整的数据流：
    /// 1. shutoff 事件通知控制任务
    /// 2. 控制任务通过 FunnelHandle 挂载下一个 bucket
    /// 3. 拼接后的输出与输入顺序一致
    #[tokio::test]
    async fn test_e2e_rotation_through_driver() {
        let budget = ByteBudget::new(4);
        let mut funnel = Funnel::with_valve("rotating", budget.clone());

        let (shutoff_tx, mut shutoff_rx) = mpsc::unbounded_channel();
        funnel.subscribe(FunnelEvent::Shutoff, move || {
            let _ = shutoff_tx.send(());
        });

        let (tx, upstream) = ChannelUpstream::channel("lines", 16);
        for text in ["aa", "bb", "cc", "dd", "ee"] {
            tx.send(Chunk::text(text)).await.unwrap();
        }
        drop(tx);

        let buckets: Vec<MemoryBucket> = (0..3)
            .map(|i| MemoryBucket::new(format!("seg-{i}")))
            .collect();

        let (driver, handle) = FunnelDriver::new(funnel, upstream, 4);
        handle.attach(buckets[0].clone()).await.unwrap();

        let controller = {
            let handle = handle.clone();
            let budget = budget.clone();
            let buckets = buckets.clone();
            tokio::spawn(async move {
                let mut next = 1;
                while shutoff_rx.recv().await.is_some() {
                    let Some(bucket) = buckets.get(next) else {
                        break;
                    };
                    budget.reset();
                    if handle.attach(bucket.clone()).await.is_err() {
                        break;
                    }
                    next += 1;
                }
                next
            })
        };

        let report = driver.run().await.unwrap();
        let attached = controller.await.unwrap();

        assert_eq!(report.reason, StopReason::UpstreamFinished);
        assert!(report.stranded.is_empty());
        assert_eq!(report.metrics.shutoff_count, 2);
        assert_eq!(attached, 3);

        let segments: Vec<Vec<String>> = buckets.iter().map(|b| b.received_text()).collect();
        assert_eq!(segments, vec![vec!["aa", "bb"], vec!["cc", "dd"], vec!["ee"]]);
        assert!(buckets.iter().all(MemoryBucket::is_ended));
    }

    /// 背压：bucket 通道容量为 1，消费端逐条读取
    #[tokio::test]
    async fn test_e2e_channel_backpressure_keeps_order() {
        let (bucket, mut rx) = ChannelBucket::channel("chan", 1);
        let consumer = tokio::spawn(async move {
            let mut received = Vec::new();
            while let Some(chunk) = rx.recv().await {
                received.push(chunk.as_str().unwrap_or_default().to_string());
            }
            received
        });

        let (tx, upstream) = ChannelUpstream::channel("numbers", 32);
        let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        for text in &expected {
            tx.send(Chunk::text(text.clone())).await.unwrap();
        }
        drop(tx);

        let (driver, handle) = FunnelDriver::new(Funnel::new("paced"), upstream, 4);
        handle.attach(bucket).await.unwrap();

        let report = driver.run().await.unwrap();
        assert_eq!(report.reason, StopReason::UpstreamFinished);
        assert!(report.metrics.backpressure_count >= 1);
        assert_eq!(report.metrics.delivered_count, 10);

        let received = consumer.await.unwrap();
        assert_eq!(received, expected);
    }
}
