// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Task scheduler for timed operations

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Unit of periodic work. One task never runs two ticks at once.
#[async_trait]
pub trait PeriodicTask: Send + 'static {
    async fn tick(&mut self);
}

struct ScheduledTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Registry of named periodic tasks, at most one per name
pub struct Scheduler {
    tasks: Mutex<HashMap<String, ScheduledTask>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn `task` on a fixed period. Returns false if `name` is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn add_task<T: PeriodicTask>(&self, name: &str, period: Duration, mut task: T) -> bool {
        let mut tasks = self.tasks.lock();
        if let Some(existing) = tasks.get(name) {
            if !existing.handle.is_finished() {
                return false;
            }
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task_name = name.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // Stop is only observed between ticks; a tick in progress always completes.
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }
                task.tick().await;
            }
            debug!("Task '{}' stopped", task_name);
        });

        tasks.insert(
            name.to_string(),
            ScheduledTask {
                stop: stop_tx,
                handle,
            },
        );
        debug!("Scheduled task '{}' with interval {:?}", name, period);
        true
    }

    /// Cancel the timer for `name`. Returns false if nothing was scheduled.
    pub fn remove_task(&self, name: &str) -> bool {
        let removed = self.tasks.lock().remove(name);
        match removed {
            Some(task) => {
                let _ = task.stop.send(());
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .get(name)
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.lock().keys().cloned().collect()
    }

    /// Stop every task and wait for in-flight ticks to finish
    pub async fn shutdown(&self) {
        let drained: Vec<(String, ScheduledTask)> = self.tasks.lock().drain().collect();

        for (name, task) in drained {
            let _ = task.stop.send(());
            if let Err(e) = task.handle.await {
                warn!("Task '{}' ended abnormally: {}", name, e);
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
