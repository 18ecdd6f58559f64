//! Cross-module tests for the run loop

#[cfg(test)]
mod tests {
    use crate::{EventLog, Pipeline, PipelineError, RunEvent, RunMode, RunOptions, SkipReason};
    use serde_json::json;
    use std::fs;
    use std::io;
    use std::path::Path;
    use tempfile::TempDir;
    use triplex_domain::{Origin, Record, RecordSource};
    use triplex_llm::{
        ExtractionSettings, GatewayConfig, MockTransport, ModelGateway, Provider, RecordingSleeper,
        RetryPolicy,
    };
    use triplex_source::file::DEFAULT_EXTENSIONS;
    use triplex_source::FileSource;
    use triplex_store::materializer::read_document;
    use triplex_store::{ArtifactIndex, Materializer, MaterializerConfig};

    const VALID: &str = r#"{"entities": {"e1": {"label": "Jean Paul", "typ": "Person"}}, "praedikate": {}, "triples": []}"#;

    struct VecSource {
        origin: Origin,
        records: Vec<Record>,
    }

    impl VecSource {
        fn rows(count: usize) -> Self {
            Self {
                origin: Origin::Database,
                records: (1..=count)
                    .map(|i| Record::new(i.to_string(), format!("Text {}", i)))
                    .collect(),
            }
        }
    }

    impl RecordSource for VecSource {
        type Error = io::Error;

        fn origin(&self) -> Origin {
            self.origin
        }

        fn fetch(&self, selector: Option<&str>) -> Result<Vec<Record>, Self::Error> {
            match selector {
                None => Ok(self.records.clone()),
                Some(id) => {
                    let found: Vec<Record> = self.records.iter().filter(|r| r.id == id).cloned().collect();
                    if found.is_empty() {
                        Err(io::Error::new(io::ErrorKind::NotFound, format!("record {}", id)))
                    } else {
                        Ok(found)
                    }
                }
            }
        }
    }

    fn pipeline<S: RecordSource>(
        source: S,
        transport: MockTransport,
        output_dir: &Path,
    ) -> Pipeline<S, MockTransport, RecordingSleeper> {
        let config = GatewayConfig::new(
            Provider::OpenAi,
            "http://localhost:3000",
            "/api/chat/completions",
            "llama3.1",
            "Extract triples.",
        )
        .with_retry(RetryPolicy::immediate(1));
        let settings = ExtractionSettings::new(3).with_required_keys(["entities", "praedikate", "triples"]);
        let gateway = ModelGateway::new(config, settings, transport, RecordingSleeper::new()).unwrap();
        let materializer = Materializer::new(MaterializerConfig {
            visualization: false,
            ..MaterializerConfig::default()
        })
        .unwrap();

        Pipeline::new(source, gateway, materializer, output_dir)
    }

    fn extract(skip_existing: bool) -> RunOptions {
        RunOptions::new(RunMode::Extract { skip_existing })
    }

    fn seed_artifact(dir: &Path, id: &str) {
        fs::write(
            dir.join(format!("20240101_000000-{}.json", id)),
            serde_json::to_string_pretty(&json!({"entities": {}, "meta": {"source_id": id}})).unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_extract_writes_one_artifact_per_record() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().with_fallback(VALID);
        let mut pipeline = pipeline(VecSource::rows(3), transport.clone(), dir.path());

        let stats = pipeline.run(&extract(false)).await.unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.success, 3);
        assert_eq!(stats.api_calls, 3);
        assert_eq!(stats.exit_code(), 0);
        assert_eq!(transport.call_count(), 3);

        let index = ArtifactIndex::scan(dir.path(), Origin::Database).unwrap();
        assert_eq!(index.len(), 3);
        let artifact = index.existing(&Record::new("2", "")).unwrap();
        let doc = read_document(artifact).unwrap();
        assert_eq!(doc["meta"]["source_id"], "2");
        assert_eq!(doc["meta"]["original_text"], "Text 2");
        assert_eq!(doc["meta"]["model"], "llama3.1");
        assert_eq!(doc["meta"]["granularity"], 3);
        assert!(artifact.with_extension("puml").exists());
    }

    #[tokio::test]
    async fn test_second_run_with_skip_existing_makes_no_calls() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().with_fallback(VALID);
        let mut pipeline = pipeline(VecSource::rows(4), transport.clone(), dir.path());

        pipeline.run(&extract(true)).await.unwrap();
        let second = pipeline.run(&extract(true)).await.unwrap();

        assert_eq!(second.skipped, second.total);
        assert_eq!(second.success, 0);
        assert_eq!(second.api_calls, 0);
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test]
    async fn test_limit_counts_only_attempted_records() {
        let dir = TempDir::new().unwrap();
        for id in ["1", "2", "3"] {
            seed_artifact(dir.path(), id);
        }
        let transport = MockTransport::new().with_fallback(VALID);
        let log = EventLog::new();
        let mut pipeline = pipeline(VecSource::rows(10), transport.clone(), dir.path()).with_observer(log.clone());

        let stats = pipeline.run(&extract(true).with_limit(2)).await.unwrap();

        assert_eq!(transport.call_count(), 2);
        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.unvisited(), 5);
        assert!(log
            .events()
            .contains(&RunEvent::LimitReached { limit: 2, unvisited: 5 }));
    }

    #[tokio::test]
    async fn test_database_ids_match_exactly() {
        let dir = TempDir::new().unwrap();
        seed_artifact(dir.path(), "105");
        let transport = MockTransport::new().with_fallback(VALID);
        let source = VecSource {
            origin: Origin::Database,
            records: vec![Record::new("5", "five"), Record::new("105", "hundred and five")],
        };
        let mut pipeline = pipeline(source, transport.clone(), dir.path());

        let stats = pipeline.run(&extract(true)).await.unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.success, 1);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_record_does_not_abort_run() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().with_fallback(VALID);
        transport.push_failure("connection refused");
        let mut pipeline = pipeline(VecSource::rows(3), transport, dir.path());

        let stats = pipeline.run(&extract(false)).await.unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.failed_ids, vec!["1"]);
        assert_eq!(stats.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_invalid_model_output_is_a_record_failure() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().with_fallback(VALID);
        transport.push_output(r#"{"entities": {}}"#);
        let mut pipeline = pipeline(VecSource::rows(2), transport, dir.path());

        let stats = pipeline.run(&extract(false)).await.unwrap();

        assert_eq!(stats.failed_ids, vec!["1"]);
        assert_eq!(stats.success, 1);
    }

    #[tokio::test]
    async fn test_refresh_updates_text_without_calling_model() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().with_fallback(VALID);
        pipeline(VecSource::rows(2), transport.clone(), dir.path())
            .run(&extract(false))
            .await
            .unwrap();

        let index = ArtifactIndex::scan(dir.path(), Origin::Database).unwrap();
        let artifact = index.existing(&Record::new("1", "")).unwrap().to_path_buf();
        let before = read_document(&artifact).unwrap();

        let mut source = VecSource::rows(3);
        source.records[0].text = "Korrigierter Text".to_string();
        let log = EventLog::new();
        let mut refresh = pipeline(source, transport.clone(), dir.path()).with_observer(log.clone());
        let stats = refresh.run(&RunOptions::new(RunMode::RefreshMetadata)).await.unwrap();

        assert_eq!(transport.call_count(), 2);
        assert_eq!(stats.api_calls, 0);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.skipped, 1);
        assert!(log.events().contains(&RunEvent::RecordSkipped {
            id: "3".to_string(),
            reason: SkipReason::NoArtifact,
        }));

        let after = read_document(&artifact).unwrap();
        assert_eq!(after["meta"]["original_text"], "Korrigierter Text");
        assert_eq!(after["entities"], before["entities"]);
        assert_eq!(after["plantuml"], before["plantuml"]);
        assert_eq!(after["meta"]["executed_at"], before["meta"]["executed_at"]);
        let keys_before: Vec<_> = before.keys().collect();
        let keys_after: Vec<_> = after.keys().collect();
        assert_eq!(keys_before, keys_after);
    }

    #[tokio::test]
    async fn test_corrupt_artifact_in_refresh_is_a_record_failure() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("20240101_000000-1.json"), "{ not json").unwrap();
        seed_artifact(dir.path(), "2");
        let mut pipeline = pipeline(VecSource::rows(2), MockTransport::new(), dir.path());

        let stats = pipeline.run(&RunOptions::new(RunMode::RefreshMetadata)).await.unwrap();

        assert_eq!(stats.failed_ids, vec!["1"]);
        assert_eq!(stats.success, 1);
    }

    #[tokio::test]
    async fn test_write_failure_aborts_run() {
        let dir = TempDir::new().unwrap();
        // A file where the record's output subdirectory must go
        fs::write(dir.path().join("briefe"), "").unwrap();
        let source = VecSource {
            origin: Origin::File,
            records: vec![Record::new("a", "text").with_origin_path("briefe/a.txt")],
        };
        let mut pipeline = pipeline(source, MockTransport::new().with_fallback(VALID), dir.path());

        let result = pipeline.run(&extract(false)).await;

        assert!(matches!(result, Err(PipelineError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_selector_restricts_run() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().with_fallback(VALID);
        let mut pipeline = pipeline(VecSource::rows(5), transport.clone(), dir.path());

        let stats = pipeline.run(&extract(false).with_selector("4")).await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(transport.call_count(), 1);

        let missing = pipeline.run(&extract(false).with_selector("99")).await;
        assert!(matches!(missing, Err(PipelineError::Source(_))));
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_before_fetch() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().with_fallback(VALID);
        let mut pipeline = pipeline(VecSource::rows(2), transport.clone(), dir.path());

        let result = pipeline.run(&extract(false).with_limit(0)).await;

        assert!(matches!(result, Err(PipelineError::Config(_))));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_event_order() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new();
        let mut pipeline =
            pipeline(VecSource::rows(1), MockTransport::new().with_fallback(VALID), dir.path()).with_observer(log.clone());

        pipeline.run(&extract(false)).await.unwrap();

        let events = log.events();
        assert!(matches!(events[0], RunEvent::RunStarted { total: 1, .. }));
        assert!(matches!(&events[1], RunEvent::RecordStarted { id, position: 1, total: 1 } if id == "1"));
        assert!(matches!(events[2], RunEvent::RecordSucceeded { .. }));
        assert!(matches!(&events[3], RunEvent::RunFinished { stats } if stats.success == 1));
    }

    #[tokio::test]
    async fn test_files_sharing_a_stem_produce_one_artifact() {
        let input = TempDir::new().unwrap();
        fs::write(input.path().join("brief.txt"), "Klartext").unwrap();
        fs::write(
            input.path().join("brief.xml"),
            "<TEI><text><body><p>Kodiert</p></body></text></TEI>",
        )
        .unwrap();
        let output = TempDir::new().unwrap();
        let log = EventLog::new();
        let source = FileSource::new(input.path(), DEFAULT_EXTENSIONS, true).unwrap();
        let transport = MockTransport::new().with_fallback(VALID);
        let mut pipeline = pipeline(source, transport.clone(), output.path()).with_observer(log.clone());

        let stats = pipeline.run(&extract(true)).await.unwrap();

        assert_eq!(stats.total, 1);
        assert_eq!(stats.success, 1);
        assert_eq!(stats.skipped, 0);
        assert_eq!(transport.call_count(), 1);
        assert!(!log
            .events()
            .iter()
            .any(|e| matches!(e, RunEvent::RecordSkipped { reason: SkipReason::AlreadyExtracted(_), .. })));

        let index = ArtifactIndex::scan(output.path(), Origin::File).unwrap();
        assert_eq!(index.len(), 1);
        let artifact = index.latest_paths()[0];
        assert_eq!(read_document(artifact).unwrap()["meta"]["original_text"], "Klartext");
    }
}
