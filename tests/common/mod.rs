#![allow(dead_code)]

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use trendcast::application::ml::model_store::{ModelStore, ModelStoreConfig};
use trendcast::application::ml::trainer::{GradientBoostingTrainer, Trainer, TrainerConfig};
use trendcast::domain::errors::ForecastError;
use trendcast::domain::market::price_series::PriceSeries;
use trendcast::domain::ml::dataset::LabeledExample;
use trendcast::domain::ml::model::TrainedModel;
use trendcast::domain::ports::{ClosesProvider, ModelRepository};
use trendcast::infrastructure::mock::MockClosesProvider;
use trendcast::infrastructure::repositories::InMemoryModelRepository;

pub const TRAINING_WINDOW: usize = 120;

/// Counts `train` calls and optionally holds each one for a while.
pub struct CountingTrainer {
    inner: GradientBoostingTrainer,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    hold: Duration,
}

impl CountingTrainer {
    pub fn new(hold: Duration) -> Self {
        Self {
            inner: GradientBoostingTrainer::new(TrainerConfig {
                n_estimators: 20,
                ..Default::default()
            }),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            hold,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `train` calls that overlapped in time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Trainer for CountingTrainer {
    fn train(
        &self,
        ticker: &str,
        examples: &[LabeledExample],
    ) -> Result<TrainedModel, ForecastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        std::thread::sleep(self.hold);
        let result = self.inner.train(ticker, examples);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Holds every fetch until `release` is called.
pub struct GatedProvider {
    inner: MockClosesProvider,
    gate: Semaphore,
}

impl GatedProvider {
    pub fn new(inner: MockClosesProvider) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1_000);
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.fetch_count()
    }
}

#[async_trait]
impl ClosesProvider for GatedProvider {
    async fn fetch_recent_closes(
        &self,
        ticker: &str,
        window: usize,
    ) -> Result<PriceSeries, ForecastError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ForecastError::unavailable(ticker, "gate closed"))?;
        self.inner.fetch_recent_closes(ticker, window).await
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// In-memory repository whose next save can be made to fail.
pub struct FlakyRepository {
    inner: InMemoryModelRepository,
    fail_next_save: AtomicBool,
}

impl FlakyRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryModelRepository::new(),
            fail_next_save: AtomicBool::new(false),
        }
    }

    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ModelRepository for FlakyRepository {
    async fn save(&self, model: &TrainedModel) -> anyhow::Result<()> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.save(model).await
    }

    async fn load(&self, ticker: &str) -> anyhow::Result<Option<TrainedModel>> {
        self.inner.load(ticker).await
    }

    async fn list(&self) -> anyhow::Result<Vec<String>> {
        self.inner.list().await
    }
}

pub fn store_with(
    repository: Arc<dyn ModelRepository>,
    trainer: Arc<dyn Trainer>,
    provider_timeout: Duration,
) -> ModelStore {
    ModelStore::new(
        repository,
        trainer,
        ModelStoreConfig {
            training_window: TRAINING_WINDOW,
            provider_timeout,
        },
    )
}

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn create_test_dir(label: &str) -> PathBuf {
    let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let temp_dir = std::env::temp_dir().join(format!(
        "trendcast_it_{}_{}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
        unique_id,
        label
    ));
    std::fs::create_dir_all(&temp_dir).unwrap();
    temp_dir
}
