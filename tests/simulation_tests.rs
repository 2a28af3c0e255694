//! Control-loop behavior of the simulation manager, on a paused clock

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use common::{recorder, FakeModels, Model};
use millwright::config::SimulationConfig;
use millwright::models::LoadAction;
use millwright::simulator::{MachineSpecs, SimulationManager, SimulationScenario};
use millwright::Error;

fn manager_with(models: Arc<FakeModels>, config: SimulationConfig) -> SimulationManager {
    SimulationManager::new(config, models).unwrap()
}

fn no_cooldown() -> SimulationConfig {
    SimulationConfig {
        optimization_cooldown_ms: 0,
        ..SimulationConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_unregistered_machine_fails() {
    let manager = manager_with(FakeModels::new().shared(), SimulationConfig::default());
    let err = manager.start_simulation("ghost", |_| {}).unwrap_err();
    assert!(matches!(err, Error::NotRegistered(ref id) if id == "ghost"));
    assert!(!manager.is_running("ghost"));
}

#[test]
fn test_new_rejects_unusable_config() {
    let nan_bound = SimulationConfig {
        min_target_load: f64::NAN,
        ..SimulationConfig::default()
    };
    let err = SimulationManager::new(nan_bound, FakeModels::new().shared()).err();
    assert!(matches!(err, Some(Error::Config(_))));

    let inverted = SimulationConfig {
        min_target_load: 90.0,
        max_target_load: 20.0,
        ..SimulationConfig::default()
    };
    assert!(SimulationManager::new(inverted, FakeModels::new().shared()).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_register_and_start_are_idempotent() {
    let manager = manager_with(FakeModels::new().shared(), SimulationConfig::default());
    assert!(manager.register_machine("press-01", MachineSpecs::default()));
    assert!(!manager.register_machine("press-01", MachineSpecs::default()));

    let (listener, results) = recorder();
    manager.start_simulation("press-01", listener).unwrap();
    let (second, duplicate) = recorder();
    manager.start_simulation("press-01", second).unwrap();

    sleep(Duration::from_millis(1_110)).await;
    let ticks = results.lock().len();
    assert!((4..=5).contains(&ticks), "unexpected tick count {}", ticks);
    assert!(duplicate.lock().is_empty());

    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_every_tick_scores_anomaly() {
    let models = FakeModels::new().shared();
    let manager = manager_with(models.clone(), SimulationConfig::default());
    manager.register_machine("m", MachineSpecs::default());

    let (listener, results) = recorder();
    manager.start_simulation("m", listener).unwrap();
    sleep(Duration::from_millis(1_110)).await;
    manager.stop_simulation("m");

    let results = results.lock();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.anomaly.is_some() && r.machine_id == "m"));
    assert_eq!(models.anomaly_calls.load(Ordering::SeqCst), results.len());
}

#[tokio::test(start_paused = true)]
async fn test_optimization_runs_first_tick_then_respects_cooldown() {
    let models = FakeModels::new().shared();
    let manager = manager_with(models.clone(), SimulationConfig::default());
    manager.register_machine("m", MachineSpecs::default());

    let (listener, results) = recorder();
    manager.start_simulation("m", listener).unwrap();

    sleep(Duration::from_millis(1_900)).await;
    {
        let results = results.lock();
        assert!(results[0].optimization.is_some());
        assert_eq!(results.iter().filter(|r| r.optimization.is_some()).count(), 1);
    }

    sleep(Duration::from_millis(3_000)).await;
    assert!(results.lock().iter().filter(|r| r.optimization.is_some()).count() >= 2);
    assert!(models.optimization_calls.load(Ordering::SeqCst) >= 2);

    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_decrease_clamps_at_minimum_target() {
    let models = FakeModels::new().with_action(LoadAction::DecreaseLoad).shared();
    let manager = manager_with(models, no_cooldown());
    manager.register_machine("m", MachineSpecs::default());

    let (listener, results) = recorder();
    manager.start_simulation("m", listener).unwrap();
    sleep(Duration::from_millis(5_110)).await;
    manager.stop_simulation("m");
    assert_eq!(manager.target_load("m").await, Some(10.0));

    let results = results.lock();
    assert_eq!(results[0].target_load, 70.0);
    for pair in results.windows(2) {
        assert!(pair[1].target_load <= pair[0].target_load);
    }
    assert!(results.iter().all(|r| r.target_load >= 10.0));
}

#[tokio::test(start_paused = true)]
async fn test_increase_clamps_at_maximum_target() {
    let models = FakeModels::new().with_action(LoadAction::IncreaseLoad).shared();
    let manager = manager_with(models, no_cooldown());
    manager.register_machine("m", MachineSpecs::default());

    let (listener, results) = recorder();
    manager.start_simulation("m", listener).unwrap();
    sleep(Duration::from_millis(2_110)).await;
    manager.stop_simulation("m");

    assert!(results.lock().iter().all(|r| r.target_load <= 95.0));
    assert_eq!(manager.target_load("m").await, Some(95.0));
}

#[tokio::test(start_paused = true)]
async fn test_prediction_waits_for_full_window() {
    let models = FakeModels::new().shared();
    let manager = manager_with(models.clone(), SimulationConfig::default());
    manager.register_machine("m", MachineSpecs::default());

    let (listener, results) = recorder();
    manager.start_simulation("m", listener).unwrap();
    sleep(Duration::from_millis(3_110)).await;
    manager.stop_simulation("m");

    let results = results.lock();
    assert!(results.len() > 10);
    assert!(results[..9].iter().all(|r| r.prediction.is_none()));
    assert!(results[9..].iter().all(|r| r.prediction.is_some()));
    assert_eq!(models.last_window_len.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn test_history_is_bounded() {
    let manager = manager_with(FakeModels::new().shared(), SimulationConfig::default());
    manager.register_machine("m", MachineSpecs::default());
    manager.start_simulation("m", |_| {}).unwrap();

    sleep(Duration::from_millis(10_110)).await;
    manager.stop_simulation("m");

    let history = manager.history("m").await.unwrap();
    assert_eq!(history.samples.len(), 24);
    assert_eq!(history.load_kw.len(), 24);
    let latest = history.samples.last().unwrap();
    assert_eq!(history.load_kw.last().copied(), Some(latest.load_kw));
}

#[tokio::test(start_paused = true)]
async fn test_anomaly_failure_is_isolated() {
    let models = FakeModels::new().failing(Model::Anomaly).shared();
    let manager = manager_with(models, SimulationConfig::default());
    manager.register_machine("m", MachineSpecs::default());

    let (listener, results) = recorder();
    manager.start_simulation("m", listener).unwrap();
    sleep(Duration::from_millis(1_110)).await;

    let results = results.lock();
    assert!(results.len() >= 4);
    assert!(results.iter().all(|r| r.anomaly.is_none()));
    assert!(results[0].optimization.is_some());
    assert!(manager.is_running("m"));
}

#[tokio::test(start_paused = true)]
async fn test_panicking_model_does_not_stop_loop() {
    let models = FakeModels::new().panicking(Model::Anomaly).shared();
    let manager = manager_with(models.clone(), SimulationConfig::default());
    manager.register_machine("m", MachineSpecs::default());

    let (listener, results) = recorder();
    manager.start_simulation("m", listener).unwrap();
    sleep(Duration::from_millis(2_110)).await;

    {
        let results = results.lock();
        assert!(results.len() >= 8, "only {} ticks published", results.len());
        assert!(results.iter().all(|r| r.anomaly.is_none()));
        assert!(results[0].optimization.is_some());
    }
    assert_eq!(models.anomaly_calls.load(Ordering::SeqCst), results.lock().len());
    assert!(manager.is_running("m"));

    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_prediction_times_out_without_stalling() {
    let models = FakeModels::new()
        .slow(Model::Prediction, Duration::from_secs(5))
        .shared();
    let manager = manager_with(models, SimulationConfig::default());
    manager.register_machine("m", MachineSpecs::default());

    let (listener, results) = recorder();
    manager.start_simulation("m", listener).unwrap();
    sleep(Duration::from_millis(6_110)).await;
    manager.stop_simulation("m");

    let results = results.lock();
    assert!(results.len() > 10);
    assert!(results.iter().all(|r| r.prediction.is_none()));
    assert!(results.iter().all(|r| r.anomaly.is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_panicking_listener_does_not_stop_loop() {
    let manager = manager_with(FakeModels::new().shared(), SimulationConfig::default());
    manager.register_machine("m", MachineSpecs::default());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    manager
        .start_simulation("m", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("listener bug");
            }
        })
        .unwrap();

    sleep(Duration::from_millis(1_110)).await;
    assert!(calls.load(Ordering::SeqCst) >= 4);
    assert!(manager.is_running("m"));

    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_restart_keeps_target_load() {
    let models = FakeModels::new().with_action(LoadAction::DecreaseLoad).shared();
    let manager = manager_with(models, no_cooldown());
    manager.register_machine("m", MachineSpecs::default());

    manager.start_simulation("m", |_| {}).unwrap();
    sleep(Duration::from_millis(610)).await;
    manager.stop_simulation("m");
    assert!(!manager.is_running("m"));

    let stopped_at = manager.target_load("m").await.unwrap();
    assert!(stopped_at < 75.0);
    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(manager.target_load("m").await, Some(stopped_at));

    let (listener, results) = recorder();
    manager.start_simulation("m", listener).unwrap();
    sleep(Duration::from_millis(10)).await;
    manager.stop_simulation("m");

    let results = results.lock();
    assert_eq!(results[0].target_load, stopped_at - 5.0);
}

#[tokio::test(start_paused = true)]
async fn test_unregister_resets_state() {
    let models = FakeModels::new().with_action(LoadAction::DecreaseLoad).shared();
    let manager = manager_with(models, no_cooldown());
    manager.register_machine("m", MachineSpecs::default());

    manager.start_simulation("m", |_| {}).unwrap();
    sleep(Duration::from_millis(610)).await;

    assert!(manager.unregister_machine("m"));
    assert!(!manager.is_registered("m"));
    assert!(!manager.is_running("m"));
    assert!(!manager.unregister_machine("m"));

    let err = manager.start_simulation("m", |_| {}).unwrap_err();
    assert!(matches!(err, Error::NotRegistered(_)));
    assert!(!manager.is_running("m"));

    assert!(manager.register_machine("m", MachineSpecs::default()));
    assert_eq!(manager.target_load("m").await, Some(75.0));
    assert!(manager.history("m").await.unwrap().samples.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_set_scenario() {
    let manager = manager_with(FakeModels::new().shared(), SimulationConfig::default());
    assert!(!manager.set_scenario("ghost", SimulationScenario::Overheating).await);

    manager.register_machine("m", MachineSpecs::default());
    assert_eq!(manager.scenario("m").await, Some(SimulationScenario::Normal));
    assert!(manager.set_scenario("m", SimulationScenario::Overheating).await);
    assert_eq!(manager.scenario("m").await, Some(SimulationScenario::Overheating));
}

#[tokio::test(start_paused = true)]
async fn test_machines_run_independently() {
    let manager = manager_with(FakeModels::new().shared(), SimulationConfig::default());
    manager.register_machine("b", MachineSpecs::default());
    manager.register_machine("a", MachineSpecs::default());
    assert_eq!(manager.machine_ids(), vec!["a".to_string(), "b".to_string()]);

    manager.start_simulation("a", |_| {}).unwrap();
    manager.start_simulation("b", |_| {}).unwrap();
    sleep(Duration::from_millis(510)).await;

    manager.stop_simulation("a");
    assert!(!manager.is_running("a"));
    assert!(manager.is_running("b"));

    manager.shutdown().await;
    assert!(!manager.is_running("b"));
}

#[tokio::test(start_paused = true)]
async fn test_latest_snapshot_mirrors_last_sample() {
    let manager = manager_with(FakeModels::new().shared(), SimulationConfig::default());
    manager.register_machine("m", MachineSpecs::default());
    assert!(manager.latest_snapshot("m").await.is_none());
    assert!(manager.latest_snapshot("ghost").await.is_none());

    manager.start_simulation("m", |_| {}).unwrap();
    sleep(Duration::from_millis(510)).await;
    manager.stop_simulation("m");

    let snapshot = manager.latest_snapshot("m").await.unwrap();
    let history = manager.history("m").await.unwrap();
    let latest = history.samples.last().unwrap();
    assert_eq!(snapshot.vibration, latest.vibration);
    assert_eq!(snapshot.load, latest.load_percent);
    assert_eq!(snapshot.timestamp, manager.state("m").await.unwrap().timestamp);
}
