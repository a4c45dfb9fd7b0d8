#[cfg(feature = "telemetry")]
mod telemetry_enabled_tests {
    use std::io::Write;
    use std::sync::Mutex;

    use pzip_core::telemetry::{self, Subsystem};
    use pzip_core::telemetry::tags;
    use pzip_core::{BufferPool, EncoderConfig, FileEncoder, MmapInput, plan_chunks};
    use tempfile::{NamedTempFile, tempdir};

    static TELEMETRY_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn records_metrics_for_hotspots() -> Result<(), Box<dyn std::error::Error>> {
        let _guard = TELEMETRY_TEST_MUTEX
            .lock()
            .expect("telemetry test lock poisoned");

        telemetry::reset();

        let mut file = NamedTempFile::new()?;
        file.write_all(b"hello telemetry")?;
        file.flush()?;
        let input = MmapInput::open(file.path())?;
        assert_eq!(input.len(), 15);

        let pool = BufferPool::new(64, 1);
        {
            let _first = pool.acquire();
        }
        {
            let _second = pool.acquire();
        }

        let snapshot = telemetry::snapshot();
        assert!(snapshot.counter(tags::METRIC_MMAP_OPEN_COUNT).unwrap_or(0) >= 1);
        assert!(snapshot.gauge(tags::METRIC_MMAP_MAPPED_BYTES).is_some());
        assert!(
            snapshot
                .counter(tags::METRIC_BUFFER_ACQUIRE_CREATED_COUNT)
                .unwrap_or(0)
                >= 1
        );
        assert!(
            snapshot
                .counter(tags::METRIC_BUFFER_ACQUIRE_RECYCLED_COUNT)
                .unwrap_or(0)
                >= 1
        );
        Ok(())
    }

    #[test]
    fn encoding_a_file_advances_pipeline_counters() -> Result<(), Box<dyn std::error::Error>> {
        let _guard = TELEMETRY_TEST_MUTEX
            .lock()
            .expect("telemetry test lock poisoned");

        telemetry::reset();

        let dir = tempdir()?;
        let path = dir.path().join("input.bin");
        std::fs::write(&path, vec![b'q'; 4096])?;

        let encoder = FileEncoder::new(EncoderConfig::new(4));
        let stats = encoder.encode_file(&path)?;
        assert_eq!(stats.chunks, plan_chunks(4096, 4).len());

        let snapshot = telemetry::snapshot();
        assert!(snapshot.counter(tags::METRIC_PLANNER_PLAN_COUNT).unwrap_or(0) >= 1);
        assert!(snapshot.counter(tags::METRIC_PLANNER_CHUNK_COUNT).unwrap_or(0) >= 4);
        assert!(snapshot.counter(tags::METRIC_CODEC_CHUNK_COUNT).unwrap_or(0) >= 4);
        assert!(snapshot.counter(tags::METRIC_CODEC_RECORD_COUNT).unwrap_or(0) >= 4);
        assert!(snapshot.counter(tags::METRIC_CODEC_INPUT_BYTES).unwrap_or(0) >= 4096);
        assert!(snapshot.counter(tags::METRIC_WRITER_APPEND_COUNT).unwrap_or(0) >= 4);
        assert!(snapshot.counter(tags::METRIC_WORKER_TASK_START_COUNT).unwrap_or(0) >= 4);
        assert!(snapshot.counter(tags::METRIC_WORKER_TASK_FINISH_COUNT).unwrap_or(0) >= 4);
        assert!(snapshot.counter(tags::METRIC_PIPELINE_FILE_COUNT).unwrap_or(0) >= 1);
        assert_eq!(
            snapshot.counter(tags::METRIC_PIPELINE_OUTPUT_BYTES),
            Some(stats.output_bytes)
        );
        assert!(
            snapshot
                .histogram(tags::METRIC_WORKER_TASK_LATENCY_US)
                .map(|histogram| histogram.count)
                .unwrap_or(0)
                >= 4
        );
        assert_eq!(snapshot.gauge(tags::METRIC_WORKER_ACTIVE_COUNT).unwrap_or(0), 0);
        Ok(())
    }

    #[test]
    fn reset_clears_collected_metrics() {
        let _guard = TELEMETRY_TEST_MUTEX
            .lock()
            .expect("telemetry test lock poisoned");

        telemetry::increment_counter(tags::METRIC_PIPELINE_FILE_COUNT, 3);
        telemetry::reset();
        assert_eq!(telemetry::snapshot().counter(tags::METRIC_PIPELINE_FILE_COUNT), None);
    }

    #[test]
    fn subsystems_are_snapshotted_and_reset_independently() {
        let _guard = TELEMETRY_TEST_MUTEX
            .lock()
            .expect("telemetry test lock poisoned");

        telemetry::reset();
        telemetry::increment_counter(tags::METRIC_CODEC_CHUNK_COUNT, 2);
        telemetry::increment_counter(tags::METRIC_WRITER_APPEND_COUNT, 5);
        telemetry::record_histogram(tags::METRIC_WRITER_LOCK_WAIT_US, 40);

        let writer = telemetry::snapshot_subsystem(Subsystem::Writer);
        assert_eq!(writer.counter(tags::METRIC_WRITER_APPEND_COUNT), Some(5));
        assert_eq!(writer.counter(tags::METRIC_CODEC_CHUNK_COUNT), None);
        assert_eq!(
            writer
                .histogram(tags::METRIC_WRITER_LOCK_WAIT_US)
                .map(|histogram| histogram.max),
            Some(40)
        );

        telemetry::reset_subsystem(Subsystem::Writer);
        assert!(telemetry::snapshot_subsystem(Subsystem::Writer).is_empty());
        assert_eq!(
            telemetry::snapshot().counter(tags::METRIC_CODEC_CHUNK_COUNT),
            Some(2)
        );
    }

    #[test]
    fn per_file_counters_come_from_snapshot_deltas() -> Result<(), Box<dyn std::error::Error>> {
        let _guard = TELEMETRY_TEST_MUTEX
            .lock()
            .expect("telemetry test lock poisoned");

        let dir = tempdir()?;
        let path = dir.path().join("runs.bin");
        std::fs::write(&path, b"aaaabbbb")?;

        let before = telemetry::snapshot();
        FileEncoder::new(EncoderConfig::new(2)).encode_file(&path)?;
        let delta = telemetry::snapshot().counters_since(&before);

        assert_eq!(delta.get(tags::METRIC_PIPELINE_FILE_COUNT), Some(&1));
        assert_eq!(delta.get(tags::METRIC_CODEC_CHUNK_COUNT), Some(&2));
        assert_eq!(delta.get(tags::METRIC_CODEC_INPUT_BYTES), Some(&8));
        Ok(())
    }
}
