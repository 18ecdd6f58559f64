//! The run loop

use crate::{PipelineError, RunEvent, RunMode, RunObserver, RunOptions, RunStats, SkipReason};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info_span, warn, Instrument};
use triplex_domain::{Record, RecordSource};
use triplex_llm::{HttpTransport, ModelGateway, Sleeper, TokioSleeper, Transport};
use triplex_store::{ArtifactIndex, ArtifactMetadata, Materializer, StoreError};
use uuid::Uuid;

/// Outcome of one attempted record
enum Attempt {
    Extracted { artifact: PathBuf, duration: std::time::Duration },
    Refreshed { artifact: PathBuf },
    Failed(String),
}

/// Drives records from a source through the model into artifacts
///
/// The pipeline owns its collaborators. Each call to [`Pipeline::run`]
/// rescans the output directory, so repeated runs see earlier output.
pub struct Pipeline<S, T = HttpTransport, Z = TokioSleeper> {
    source: S,
    gateway: ModelGateway<T, Z>,
    materializer: Materializer,
    output_dir: PathBuf,
    observers: Vec<Box<dyn RunObserver>>,
}

impl<S, T, Z> Pipeline<S, T, Z>
where
    S: RecordSource,
    T: Transport,
    Z: Sleeper,
{
    /// Create a pipeline writing artifacts below `output_dir`
    pub fn new(
        source: S,
        gateway: ModelGateway<T, Z>,
        materializer: Materializer,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            gateway,
            materializer,
            output_dir: output_dir.into(),
            observers: Vec::new(),
        }
    }

    /// Add an observer for run events
    pub fn with_observer(mut self, observer: impl RunObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// The model gateway
    pub fn gateway(&self) -> &ModelGateway<T, Z> {
        &self.gateway
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Process every record once
    ///
    /// A failing record is counted and the run moves on. Only source
    /// failures, invalid options and failed artifact writes abort the run.
    pub async fn run(&mut self, options: &RunOptions) -> Result<RunStats, PipelineError> {
        options.validate().map_err(PipelineError::Config)?;

        let run_id = Uuid::now_v7();
        let span = info_span!("run", %run_id, mode = %options.mode);
        self.run_inner(run_id, options).instrument(span).await
    }

    async fn run_inner(&mut self, run_id: Uuid, options: &RunOptions) -> Result<RunStats, PipelineError> {
        let records = self
            .source
            .fetch(options.selector.as_deref())
            .map_err(PipelineError::from_source)?;
        let mut index = ArtifactIndex::scan(&self.output_dir, self.source.origin())?;
        debug!(known_artifacts = index.len(), "Output directory scanned");

        let calls_before = self.gateway.call_count();
        let mut stats = RunStats::new(records.len());
        self.emit(RunEvent::RunStarted {
            run_id,
            mode: options.mode,
            total: records.len(),
        });

        for (position, record) in records.iter().enumerate() {
            let existing = index.existing(record).map(Path::to_path_buf);

            match (options.mode, existing) {
                (RunMode::Extract { skip_existing: true }, Some(path)) => {
                    stats.record_skip();
                    self.emit(RunEvent::RecordSkipped {
                        id: record.id.clone(),
                        reason: SkipReason::AlreadyExtracted(path),
                    });
                    continue;
                }
                (RunMode::RefreshMetadata, None) => {
                    stats.record_skip();
                    self.emit(RunEvent::RecordSkipped {
                        id: record.id.clone(),
                        reason: SkipReason::NoArtifact,
                    });
                    continue;
                }
                (mode, existing) => {
                    if let Some(limit) = options.limit {
                        if stats.attempted() >= limit {
                            self.emit(RunEvent::LimitReached {
                                limit,
                                unvisited: records.len() - position,
                            });
                            break;
                        }
                    }

                    self.emit(RunEvent::RecordStarted {
                        id: record.id.clone(),
                        position: position + 1,
                        total: records.len(),
                    });

                    let attempt = match (mode, existing) {
                        (RunMode::RefreshMetadata, Some(artifact)) => self.refresh(record, artifact)?,
                        _ => self.extract(record, &mut index).await?,
                    };

                    let event = match attempt {
                        Attempt::Extracted { artifact, duration } => {
                            stats.record_success();
                            RunEvent::RecordSucceeded {
                                id: record.id.clone(),
                                artifact,
                                duration,
                            }
                        }
                        Attempt::Refreshed { artifact } => {
                            stats.record_success();
                            RunEvent::MetadataRefreshed {
                                id: record.id.clone(),
                                artifact,
                            }
                        }
                        Attempt::Failed(error) => {
                            stats.record_failure(&record.id);
                            RunEvent::RecordFailed {
                                id: record.id.clone(),
                                error,
                            }
                        }
                    };
                    self.emit(event);
                }
            }
        }

        stats.api_calls = self.gateway.call_count() - calls_before;
        self.emit(RunEvent::RunFinished { stats: stats.clone() });
        Ok(stats)
    }

    async fn extract(&self, record: &Record, index: &mut ArtifactIndex) -> Result<Attempt, PipelineError> {
        if record.is_blank() {
            warn!(record_id = %record.id, "Record text is empty");
        }

        let started_at = Local::now();
        let timer = Instant::now();
        let document = match self.gateway.call(record).await {
            Ok(document) => document,
            Err(e) => return Ok(Attempt::Failed(e.to_string())),
        };
        let duration = timer.elapsed();

        let path = index.new_artifact_path(record, &started_at);
        let metadata = ArtifactMetadata::for_record(record)
            .with_execution(&started_at, duration)
            .with_model(
                self.gateway.model(),
                self.gateway.provider().as_str(),
                self.gateway.granularity().get(),
            );

        match self.materializer.write(&path, document, &metadata, &record.stem()) {
            Ok(paths) => {
                index.register(record, paths.json.clone());
                Ok(Attempt::Extracted {
                    artifact: paths.json,
                    duration,
                })
            }
            Err(e) => store_failure(e),
        }
    }

    fn refresh(&self, record: &Record, artifact: PathBuf) -> Result<Attempt, PipelineError> {
        match self.materializer.refresh_metadata(&artifact, &record.text) {
            Ok(()) => Ok(Attempt::Refreshed { artifact }),
            Err(e) => store_failure(e),
        }
    }

    fn emit(&mut self, event: RunEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }
}

fn store_failure(error: StoreError) -> Result<Attempt, PipelineError> {
    if error.is_fatal() {
        Err(PipelineError::Persistence(error))
    } else {
        Ok(Attempt::Failed(error.to_string()))
    }
}
