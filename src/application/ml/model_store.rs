//! Per-ticker model registry with lazy, single-flight training.
//!
//! Each ticker moves through `Absent -> Training -> Ready`. The first caller
//! that misses the cache claims the `Training` slot and becomes the only
//! trainer for that ticker; concurrent callers subscribe to the slot's watch
//! channel and receive the same outcome. A failed run leaves nothing behind
//! (or the previous model, for a forced retrain), so the next request starts
//! over. The lock guards only the slot map and is never held across an await.
//!
//! Once the examples are built, training and persistence run in a detached
//! task that owns the slot. Cancelling the caller that started the run does
//! not release the ticker until that task publishes.

use crate::application::ml::label_builder::build_examples;
use crate::application::ml::trainer::Trainer;
use crate::domain::errors::ForecastError;
use crate::domain::market::ticker::normalize_ticker;
use crate::domain::ml::dataset::LabeledExample;
use crate::domain::ml::model::TrainedModel;
use crate::domain::ports::{ClosesProvider, ModelRepository};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

type TrainingOutcome = Result<Arc<TrainedModel>, ForecastError>;
type SlotMap = Arc<Mutex<HashMap<String, Slot>>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelStoreConfig {
    /// Number of daily closes requested from the provider for training.
    pub training_window: usize,
    /// Upper bound on a single provider call.
    pub provider_timeout: Duration,
}

impl Default for ModelStoreConfig {
    fn default() -> Self {
        Self {
            training_window: 750,
            provider_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Absent,
    Training,
    Ready,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Absent => write!(f, "absent"),
            ModelState::Training => write!(f, "training"),
            ModelState::Ready => write!(f, "ready"),
        }
    }
}

enum Slot {
    Training {
        done: watch::Receiver<Option<TrainingOutcome>>,
        /// Model served while a forced retrain is in flight.
        previous: Option<Arc<TrainedModel>>,
    },
    Ready(Arc<TrainedModel>),
}

enum Claim {
    Hit(Arc<TrainedModel>),
    Wait(watch::Receiver<Option<TrainingOutcome>>),
    Lead(TrainingGuard),
}

pub struct ModelStore {
    slots: SlotMap,
    repository: Arc<dyn ModelRepository>,
    trainer: Arc<dyn Trainer>,
    config: ModelStoreConfig,
}

impl ModelStore {
    pub fn new(
        repository: Arc<dyn ModelRepository>,
        trainer: Arc<dyn Trainer>,
        config: ModelStoreConfig,
    ) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            repository,
            trainer,
            config,
        }
    }

    pub fn config(&self) -> &ModelStoreConfig {
        &self.config
    }

    /// Returns the model for `ticker`, loading it from the repository or
    /// training it on first use.
    ///
    /// A cache hit does no I/O. On a miss, at most one load-or-train run per
    /// ticker is in flight; concurrent callers wait for it and share its
    /// result, success or failure. Failures are never cached.
    pub async fn get_or_train(
        &self,
        ticker: &str,
        provider: &dyn ClosesProvider,
    ) -> Result<Arc<TrainedModel>, ForecastError> {
        let ticker = normalize_ticker(ticker)?;

        match self.claim(&ticker, false) {
            Claim::Hit(model) => {
                debug!("ModelStore: cache hit for {}", ticker);
                Ok(model)
            }
            Claim::Wait(done) => {
                debug!("ModelStore: waiting for in-flight training of {}", ticker);
                wait_for_outcome(&ticker, done).await
            }
            Claim::Lead(guard) => self.lead(guard, provider, false).await,
        }
    }

    /// Trains a fresh model for `ticker` and replaces the current one.
    ///
    /// The previous model keeps serving `get_or_train` while the retrain
    /// runs, and stays in place if it fails. Joins a run already in flight.
    pub async fn retrain(
        &self,
        ticker: &str,
        provider: &dyn ClosesProvider,
    ) -> Result<Arc<TrainedModel>, ForecastError> {
        let ticker = normalize_ticker(ticker)?;

        match self.claim(&ticker, true) {
            Claim::Hit(model) => Ok(model),
            Claim::Wait(done) => wait_for_outcome(&ticker, done).await,
            Claim::Lead(guard) => {
                info!("ModelStore: forced retrain of {}", ticker);
                self.lead(guard, provider, true).await
            }
        }
    }

    /// The servable model for `ticker`, without loading or training.
    pub fn get_cached(&self, ticker: &str) -> Option<Arc<TrainedModel>> {
        let ticker = normalize_ticker(ticker).ok()?;
        match self.slots.lock().get(&ticker)? {
            Slot::Ready(model) => Some(model.clone()),
            Slot::Training { previous, .. } => previous.clone(),
        }
    }

    pub fn state(&self, ticker: &str) -> ModelState {
        let Ok(ticker) = normalize_ticker(ticker) else {
            return ModelState::Absent;
        };
        match self.slots.lock().get(&ticker) {
            None => ModelState::Absent,
            Some(Slot::Training { .. }) => ModelState::Training,
            Some(Slot::Ready(_)) => ModelState::Ready,
        }
    }

    /// Tickers with a servable model in memory, sorted.
    pub fn cached_tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| match slot {
                Slot::Ready(_) => true,
                Slot::Training { previous, .. } => previous.is_some(),
            })
            .map(|(ticker, _)| ticker.clone())
            .collect();
        tickers.sort();
        tickers
    }

    fn claim(&self, ticker: &str, force: bool) -> Claim {
        let mut slots = self.slots.lock();

        let previous = match slots.get(ticker) {
            None => None,
            Some(Slot::Ready(model)) if !force => return Claim::Hit(model.clone()),
            Some(Slot::Ready(model)) => Some(model.clone()),
            Some(Slot::Training {
                previous: Some(model),
                ..
            }) if !force => return Claim::Hit(model.clone()),
            Some(Slot::Training { done, .. }) => return Claim::Wait(done.clone()),
        };

        let (tx, rx) = watch::channel(None);
        slots.insert(
            ticker.to_string(),
            Slot::Training {
                done: rx,
                previous: previous.clone(),
            },
        );

        Claim::Lead(TrainingGuard {
            slots: self.slots.clone(),
            ticker: ticker.to_string(),
            tx,
            previous,
            published: false,
        })
    }

    /// Runs the load-or-train pipeline for a claimed slot.
    ///
    /// Loading and fetching happen in the caller's future. Training and
    /// persistence are handed to a spawned task together with the guard,
    /// and the caller waits on the slot's channel like any other waiter.
    async fn lead(
        &self,
        guard: TrainingGuard,
        provider: &dyn ClosesProvider,
        force: bool,
    ) -> TrainingOutcome {
        let ticker = guard.ticker.clone();

        if !force {
            if let Some(model) = self.load_persisted(&ticker).await {
                return guard.publish(Ok(Arc::new(model)));
            }
        }

        let examples = match self.fetch_examples(&ticker, provider).await {
            Ok(examples) => examples,
            Err(e) => return guard.publish(Err(e)),
        };

        let done = guard.subscribe();
        let trainer = self.trainer.clone();
        let repository = self.repository.clone();
        tokio::spawn(async move {
            let outcome =
                train_and_persist(trainer, repository, guard.ticker.clone(), examples).await;
            let _ = guard.publish(outcome);
        });

        wait_for_outcome(&ticker, done).await
    }

    /// A stored model usable with the current feature schema, if any.
    /// Unreadable or incompatible artifacts are reported and retrained over.
    async fn load_persisted(&self, ticker: &str) -> Option<TrainedModel> {
        match self.repository.load(ticker).await {
            Ok(Some(model)) if model.ticker() != ticker => {
                warn!(
                    "ModelStore: stored model for {} belongs to {}, retraining",
                    ticker,
                    model.ticker()
                );
                None
            }
            Ok(Some(model)) if !model.feature_schema().is_current() => {
                warn!(
                    "ModelStore: stored model for {} uses feature schema {}, retraining",
                    ticker,
                    model.feature_schema()
                );
                None
            }
            Ok(Some(model)) => {
                info!(
                    "ModelStore: loaded persisted model {} for {}",
                    model.model_id(),
                    ticker
                );
                Some(model)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    "ModelStore: could not load stored model for {}, retraining: {:#}",
                    ticker, e
                );
                None
            }
        }
    }

    async fn fetch_examples(
        &self,
        ticker: &str,
        provider: &dyn ClosesProvider,
    ) -> Result<Vec<LabeledExample>, ForecastError> {
        let window = self.config.training_window;
        let timeout = self.config.provider_timeout;

        info!(
            "ModelStore: fetching {} closes for {} from {}",
            window,
            ticker,
            provider.name()
        );

        let series =
            match tokio::time::timeout(timeout, provider.fetch_recent_closes(ticker, window)).await
            {
                Ok(Ok(series)) => series,
                Ok(Err(e)) => {
                    warn!("ModelStore: {} failed for {}: {}", provider.name(), ticker, e);
                    return Err(e);
                }
                Err(_) => {
                    warn!(
                        "ModelStore: {} timed out after {:?} for {}",
                        provider.name(),
                        timeout,
                        ticker
                    );
                    return Err(ForecastError::unavailable(
                        ticker,
                        format!("{} did not respond within {:?}", provider.name(), timeout),
                    ));
                }
            };

        build_examples(&series.closes())
    }
}

async fn train_and_persist(
    trainer: Arc<dyn Trainer>,
    repository: Arc<dyn ModelRepository>,
    ticker: String,
    examples: Vec<LabeledExample>,
) -> TrainingOutcome {
    info!(
        "ModelStore: training {} on {} examples",
        ticker,
        examples.len()
    );

    let model = {
        let ticker = ticker.clone();
        tokio::task::spawn_blocking(move || trainer.train(&ticker, &examples))
            .await
            .map_err(|e| ForecastError::Training {
                reason: format!("training task failed: {}", e),
            })??
    };

    if let Err(e) = repository.save(&model).await {
        error!("ModelStore: failed to persist model for {}: {:#}", ticker, e);
        return Err(ForecastError::Storage {
            ticker,
            reason: format!("{:#}", e),
        });
    }

    Ok(Arc::new(model))
}

async fn wait_for_outcome(
    ticker: &str,
    mut done: watch::Receiver<Option<TrainingOutcome>>,
) -> TrainingOutcome {
    match done.wait_for(Option::is_some).await {
        Ok(outcome) => match &*outcome {
            Some(outcome) => outcome.clone(),
            None => Err(aborted(ticker)),
        },
        Err(_) => Err(aborted(ticker)),
    }
}

fn aborted(ticker: &str) -> ForecastError {
    ForecastError::TrainingAborted {
        ticker: ticker.to_string(),
    }
}

/// Ownership of a ticker's `Training` slot.
///
/// `publish` installs the outcome and wakes waiters. If the guard is dropped
/// before publishing, the slot is rolled back and waiters get
/// `TrainingAborted`.
struct TrainingGuard {
    slots: SlotMap,
    ticker: String,
    tx: watch::Sender<Option<TrainingOutcome>>,
    previous: Option<Arc<TrainedModel>>,
    published: bool,
}

impl TrainingGuard {
    fn subscribe(&self) -> watch::Receiver<Option<TrainingOutcome>> {
        self.tx.subscribe()
    }

    fn publish(mut self, outcome: TrainingOutcome) -> TrainingOutcome {
        match &outcome {
            Ok(model) => {
                self.slots
                    .lock()
                    .insert(self.ticker.clone(), Slot::Ready(model.clone()));
            }
            Err(e) => {
                warn!("ModelStore: training for {} failed: {}", self.ticker, e);
                self.roll_back();
            }
        }

        self.published = true;
        self.tx.send_replace(Some(outcome.clone()));
        outcome
    }

    fn roll_back(&mut self) {
        let mut slots = self.slots.lock();
        match self.previous.take() {
            Some(model) => {
                slots.insert(self.ticker.clone(), Slot::Ready(model));
            }
            None => {
                slots.remove(&self.ticker);
            }
        }
    }
}

impl Drop for TrainingGuard {
    fn drop(&mut self) {
        if !self.published {
            warn!("ModelStore: training for {} was cancelled", self.ticker);
            self.roll_back();
            self.tx.send_replace(Some(Err(aborted(&self.ticker))));
        }
    }
}
