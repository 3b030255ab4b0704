/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Cooperative job scheduler.
//!
//! One loop task hosts every scheduled job. Bookkeeping (add/modify/remove)
//! is synchronous and non-suspending; fired jobs run as spawned tasks so
//! different keys may overlap, while a per-key guard keeps each key strictly
//! serial (a fire is skipped when the previous run of the same key is still
//! in flight). Shutdown suppresses new triggers and lets in-flight jobs
//! finish naturally.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::cron::OffsetCronTrigger;

/// Arguments handed to a job callable at fire time, modifiable in place.
#[derive(Debug, Clone, PartialEq)]
pub enum JobArgs {
  DataPull {
    provider: String,
    interval: String,
    symbols: Vec<String>,
    exchanges: Vec<Option<String>>,
  },
  IndexSync {
    provider: String,
  },
  None,
}

/// A job body: takes the current [`JobArgs`] and resolves when the run ends.
pub type JobFn = Arc<dyn Fn(JobArgs) -> BoxFuture<'static, ()> + Send + Sync>;

/// Trigger dialects: fixed interval or (signed-offset) crontab.
#[derive(Debug, Clone)]
pub enum Trigger {
  Every(Duration),
  Cron(OffsetCronTrigger),
}

impl Trigger {
  fn next_fire(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match self {
      Trigger::Every(period) => {
        Some(now + chrono::Duration::from_std(*period).unwrap_or(chrono::Duration::seconds(60)))
      }
      Trigger::Cron(trigger) => trigger.next_fire(now),
    }
  }
}

struct Job {
  trigger: Trigger,
  callable: JobFn,
  args: JobArgs,
  next_fire: Option<DateTime<Utc>>,
  running: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
  Stopped,
  Running,
}

struct SchedulerInner {
  jobs: HashMap<String, Job>,
  state: SchedulerState,
}

/// Cooperative scheduler with string-keyed, idempotent job operations.
#[derive(Clone)]
pub struct Scheduler {
  inner: Arc<Mutex<SchedulerInner>>,
  notify: Arc<Notify>,
}

impl Default for Scheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl Scheduler {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(SchedulerInner {
        jobs: HashMap::new(),
        state: SchedulerState::Stopped,
      })),
      notify: Arc::new(Notify::new()),
    }
  }

  /// Schedule a job, replacing any existing job with the same key.
  pub fn add(&self, job_key: &str, trigger: Trigger, callable: JobFn, args: JobArgs) {
    let next_fire = trigger.next_fire(Utc::now());
    let mut inner = self.inner.lock();
    inner.jobs.insert(
      job_key.to_string(),
      Job { trigger, callable, args, next_fire, running: Arc::new(tokio::sync::Mutex::new(())) },
    );
    drop(inner);
    self.notify.notify_one();
  }

  /// Change a job's arguments in place. Returns false for unknown keys.
  pub fn modify_args(&self, job_key: &str, args: JobArgs) -> bool {
    let mut inner = self.inner.lock();
    match inner.jobs.get_mut(job_key) {
      Some(job) => {
        job.args = args;
        true
      }
      None => false,
    }
  }

  /// Remove a job. Removing an unknown key is a no-op.
  pub fn remove(&self, job_key: &str) -> bool {
    let removed = self.inner.lock().jobs.remove(job_key).is_some();
    if removed {
      self.notify.notify_one();
    }
    removed
  }

  pub fn contains(&self, job_key: &str) -> bool {
    self.inner.lock().jobs.contains_key(job_key)
  }

  /// Current arguments of a job, if scheduled.
  pub fn job_args(&self, job_key: &str) -> Option<JobArgs> {
    self.inner.lock().jobs.get(job_key).map(|j| j.args.clone())
  }

  pub fn state(&self) -> SchedulerState {
    self.inner.lock().state
  }

  /// Start the scheduler loop. Starting a running scheduler is a no-op.
  pub fn start(&self) {
    {
      let mut inner = self.inner.lock();
      if inner.state == SchedulerState::Running {
        return;
      }
      inner.state = SchedulerState::Running;
    }
    let scheduler = self.clone();
    tokio::spawn(async move { scheduler.run_loop().await });
  }

  /// Stop the scheduler (wait=false semantics): new triggers are suppressed,
  /// in-flight jobs finish naturally. Safe to invoke repeatedly.
  pub fn stop(&self) {
    let mut inner = self.inner.lock();
    if inner.state == SchedulerState::Stopped {
      return;
    }
    info!("Scheduler shutting down.");
    inner.state = SchedulerState::Stopped;
    drop(inner);
    self.notify.notify_one();
  }

  async fn run_loop(&self) {
    debug!("Scheduler loop started.");
    loop {
      let now = Utc::now();
      let mut due: Vec<(String, JobFn, JobArgs, Arc<tokio::sync::Mutex<()>>)> = Vec::new();
      let nearest = {
        let mut inner = self.inner.lock();
        if inner.state == SchedulerState::Stopped {
          break;
        }
        for (key, job) in inner.jobs.iter_mut() {
          if let Some(fire_at) = job.next_fire {
            if fire_at <= now {
              due.push((key.clone(), job.callable.clone(), job.args.clone(), job.running.clone()));
              job.next_fire = job.trigger.next_fire(now);
            }
          }
        }
        inner.jobs.values().filter_map(|j| j.next_fire).min()
      };

      for (key, callable, args, running) in due {
        tokio::spawn(async move {
          match running.try_lock() {
            Ok(_guard) => callable(args).await,
            Err(_) => warn!("Job {} is still running; skipping this fire.", key),
          }
        });
      }

      let sleep_for = nearest
        .map(|n| (n - Utc::now()).to_std().unwrap_or(Duration::ZERO))
        .unwrap_or(Duration::from_secs(60));
      tokio::select! {
        _ = tokio::time::sleep(sleep_for) => {}
        _ = self.notify.notified() => {}
      }
    }
    debug!("Scheduler loop exited.");
  }
}

/// Safe-job envelope: log and swallow every failure (including panics) inside
/// a scheduled job so a bad run never corrupts the scheduler.
pub async fn safe_job<F, T, E>(name: &str, fut: F) -> Option<T>
where
  F: Future<Output = Result<T, E>>,
  E: std::fmt::Display,
{
  use futures::FutureExt;

  match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
    Ok(Ok(value)) => Some(value),
    Ok(Err(e)) => {
      error!("Job {} failed with error: {}", name, e);
      None
    }
    Err(_) => {
      error!("Job {} panicked.", name);
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn noop_job() -> JobFn {
    Arc::new(|_args| Box::pin(async {}))
  }

  #[tokio::test]
  async fn test_add_replaces_existing_key() {
    let sched = Scheduler::new();
    sched.add(
      "k",
      Trigger::Every(Duration::from_secs(60)),
      noop_job(),
      JobArgs::IndexSync { provider: "A".into() },
    );
    sched.add(
      "k",
      Trigger::Every(Duration::from_secs(60)),
      noop_job(),
      JobArgs::IndexSync { provider: "B".into() },
    );
    assert_eq!(sched.job_args("k"), Some(JobArgs::IndexSync { provider: "B".into() }));
  }

  #[tokio::test]
  async fn test_modify_args_in_place() {
    let sched = Scheduler::new();
    sched.add("k", Trigger::Every(Duration::from_secs(60)), noop_job(), JobArgs::None);
    assert!(sched.modify_args("k", JobArgs::IndexSync { provider: "X".into() }));
    assert_eq!(sched.job_args("k"), Some(JobArgs::IndexSync { provider: "X".into() }));
    assert!(!sched.modify_args("missing", JobArgs::None));
  }

  #[tokio::test]
  async fn test_remove_is_idempotent() {
    let sched = Scheduler::new();
    sched.add("k", Trigger::Every(Duration::from_secs(60)), noop_job(), JobArgs::None);
    assert!(sched.remove("k"));
    assert!(!sched.remove("k"));
    assert!(!sched.contains("k"));
  }

  #[tokio::test]
  async fn test_stop_is_idempotent() {
    let sched = Scheduler::new();
    sched.start();
    assert_eq!(sched.state(), SchedulerState::Running);
    sched.stop();
    sched.stop();
    assert_eq!(sched.state(), SchedulerState::Stopped);
  }

  #[tokio::test]
  async fn test_due_job_fires() {
    let sched = Scheduler::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let job: JobFn = Arc::new(move |_args| {
      let c = c.clone();
      Box::pin(async move {
        c.fetch_add(1, Ordering::SeqCst);
      })
    });
    sched.add("tick", Trigger::Every(Duration::from_millis(10)), job, JobArgs::None);
    sched.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    sched.stop();
    assert!(count.load(Ordering::SeqCst) >= 1);
  }

  #[tokio::test]
  async fn test_safe_job_swallows_errors() {
    let result: Option<()> =
      safe_job("failing", async { Err::<(), _>(crate::error::DataHubError::Provider("boom".into())) })
        .await;
    assert!(result.is_none());
  }

  #[tokio::test]
  async fn test_safe_job_swallows_panics() {
    let result: Option<i32> = safe_job("panicking", async {
      panic!("kaboom");
      #[allow(unreachable_code)]
      Ok::<i32, crate::error::DataHubError>(1)
    })
    .await;
    assert!(result.is_none());
  }

  #[tokio::test]
  async fn test_safe_job_passes_values_through() {
    let result = safe_job("ok", async { Ok::<i32, crate::error::DataHubError>(7) }).await;
    assert_eq!(result, Some(7));
  }
}
