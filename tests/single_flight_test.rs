mod common;

use common::{CountingTrainer, GatedProvider, store_with};
use std::sync::Arc;
use std::time::Duration;
use trendcast::application::ml::model_store::ModelState;
use trendcast::domain::errors::ForecastError;
use trendcast::infrastructure::mock::{MockClosesProvider, MockSeries};
use trendcast::infrastructure::repositories::InMemoryModelRepository;

const CALLERS: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_training_run() {
    let trainer = Arc::new(CountingTrainer::new(Duration::from_millis(50)));
    let store = Arc::new(store_with(
        Arc::new(InMemoryModelRepository::new()),
        trainer.clone(),
        Duration::from_secs(10),
    ));
    let provider = Arc::new(GatedProvider::new(MockClosesProvider::with_series(
        MockSeries::Zigzag,
    )));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let store = store.clone();
            let provider = provider.clone();
            tokio::spawn(async move { store.get_or_train("AAPL", provider.as_ref()).await })
        })
        .collect();

    // Let every caller reach the store before the data arrives
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.state("AAPL"), ModelState::Training);
    provider.release();

    let mut models = Vec::new();
    for handle in handles {
        models.push(handle.await.unwrap().expect("training should succeed"));
    }

    assert_eq!(trainer.calls(), 1, "exactly one Trainer invocation");
    assert_eq!(provider.fetch_count(), 1, "provider invoked once");
    assert!(models.iter().all(|m| Arc::ptr_eq(m, &models[0])));
    assert_eq!(store.state("AAPL"), ModelState::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_failure() {
    let trainer = Arc::new(CountingTrainer::new(Duration::ZERO));
    let store = Arc::new(store_with(
        Arc::new(InMemoryModelRepository::new()),
        trainer.clone(),
        Duration::from_secs(10),
    ));
    let provider = Arc::new(GatedProvider::new(MockClosesProvider::with_series(
        MockSeries::Increasing,
    )));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let store = store.clone();
            let provider = provider.clone();
            tokio::spawn(async move { store.get_or_train("UP", provider.as_ref()).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(200)).await;
    provider.release();

    let mut errors = Vec::new();
    for handle in handles {
        errors.push(handle.await.unwrap().expect_err("single-class data must fail"));
    }

    assert_eq!(trainer.calls(), 1);
    assert!(matches!(
        errors[0],
        ForecastError::DegenerateDataset { label: 1, .. }
    ));
    assert!(errors.iter().all(|e| *e == errors[0]));

    // Nothing cached: the next request runs the whole pipeline again
    assert_eq!(store.state("UP"), ModelState::Absent);
    let retry = store.get_or_train("UP", provider.as_ref()).await;
    assert!(retry.is_err());
    assert_eq!(trainer.calls(), 2);
    assert_eq!(provider.fetch_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_other_tickers_proceed_while_one_trains() {
    let store = Arc::new(store_with(
        Arc::new(InMemoryModelRepository::new()),
        Arc::new(CountingTrainer::new(Duration::ZERO)),
        Duration::from_secs(30),
    ));
    let stuck = Arc::new(GatedProvider::new(MockClosesProvider::with_series(
        MockSeries::Zigzag,
    )));

    let blocked = {
        let store = store.clone();
        let stuck = stuck.clone();
        tokio::spawn(async move { store.get_or_train("AAPL", stuck.as_ref()).await })
    };

    while store.state("AAPL") != ModelState::Training {
        tokio::task::yield_now().await;
    }

    let free = MockClosesProvider::with_series(MockSeries::Zigzag);
    let msft = tokio::time::timeout(Duration::from_secs(10), store.get_or_train("MSFT", &free))
        .await
        .expect("MSFT must not wait for AAPL");
    assert!(msft.is_ok());
    assert_eq!(store.state("AAPL"), ModelState::Training);
    assert_eq!(store.cached_tickers(), vec!["MSFT"]);

    stuck.release();
    assert!(blocked.await.unwrap().is_ok());
    assert_eq!(store.cached_tickers(), vec!["AAPL", "MSFT"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancelled_leader_keeps_training_single_flight() {
    let trainer = Arc::new(CountingTrainer::new(Duration::from_millis(600)));
    let store = Arc::new(store_with(
        Arc::new(InMemoryModelRepository::new()),
        trainer.clone(),
        Duration::from_secs(10),
    ));
    let provider = Arc::new(MockClosesProvider::with_series(MockSeries::Zigzag));

    let leader = {
        let store = store.clone();
        let provider = provider.clone();
        tokio::spawn(async move { store.get_or_train("AAPL", provider.as_ref()).await })
    };

    while trainer.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    leader.abort();
    assert!(leader.await.unwrap_err().is_cancelled());

    // The run outlives its caller and still owns the ticker
    assert_eq!(store.state("AAPL"), ModelState::Training);

    let model = store
        .get_or_train("AAPL", provider.as_ref())
        .await
        .expect("joins the running training");

    assert_eq!(trainer.calls(), 1);
    assert_eq!(trainer.peak_in_flight(), 1);
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(store.state("AAPL"), ModelState::Ready);
    assert!(Arc::ptr_eq(&model, &store.get_cached("AAPL").unwrap()));
}

#[tokio::test]
async fn test_hung_provider_times_out_and_releases_ticker() {
    let trainer = Arc::new(CountingTrainer::new(Duration::ZERO));
    let store = store_with(
        Arc::new(InMemoryModelRepository::new()),
        trainer.clone(),
        Duration::from_millis(100),
    );
    let hung = GatedProvider::new(MockClosesProvider::with_series(MockSeries::Zigzag));

    let result = store.get_or_train("AAPL", &hung).await;

    match result {
        Err(e @ ForecastError::DataUnavailable { .. }) => assert!(e.is_transient()),
        other => panic!("expected DataUnavailable, got {:?}", other),
    }
    assert_eq!(store.state("AAPL"), ModelState::Absent);
    assert_eq!(trainer.calls(), 0);

    let healthy = MockClosesProvider::with_series(MockSeries::Zigzag);
    assert!(store.get_or_train("AAPL", &healthy).await.is_ok());
    assert_eq!(trainer.calls(), 1);
}

#[tokio::test]
async fn test_sequential_calls_hit_cache() {
    let trainer = Arc::new(CountingTrainer::new(Duration::ZERO));
    let store = store_with(
        Arc::new(InMemoryModelRepository::new()),
        trainer.clone(),
        Duration::from_secs(10),
    );
    let provider = MockClosesProvider::with_series(MockSeries::Zigzag);

    let first = store.get_or_train("AAPL", &provider).await.unwrap();
    let second = store.get_or_train("AAPL", &provider).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(trainer.calls(), 1);
}
