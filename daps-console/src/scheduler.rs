//! Watching a module run until its status changes.
//!
//! [`RunWatcher`] polls `GET /api/status` on an interval in a background
//! task. It stops by itself once the observed running flag differs from the
//! baseline, or when cancelled. Dropping the watcher cancels it.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::interval};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::api::RunControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The running flag flipped to this value.
    Changed { running: bool },
    Cancelled,
}

pub struct RunWatcher {
    module: String,
    token: CancellationToken,
    guard: DropGuard,
    handle: JoinHandle<RunEnd>,
}

impl RunWatcher {
    /// Start polling `module` every `every`.
    ///
    /// With `baseline = None` the first successful poll becomes the baseline.
    /// Poll failures are logged and retried on the next tick.
    pub fn spawn(
        control: Arc<dyn RunControl>,
        module: &str,
        every: Duration,
        baseline: Option<bool>,
    ) -> Self {
        let token = CancellationToken::new();
        let child = token.clone();
        let name = module.to_string();
        let handle = tokio::spawn(async move {
            let mut tick = interval(every);
            let mut baseline = baseline;
            loop {
                tokio::select! {
                    _ = child.cancelled() => {
                        debug!("{name}: status watch cancelled");
                        return RunEnd::Cancelled;
                    }
                    _ = tick.tick() => {
                        match control.status(&name).await {
                            Ok(running) => match baseline {
                                None => baseline = Some(running),
                                Some(prev) if prev != running => {
                                    info!("{name}: running = {running}");
                                    return RunEnd::Changed { running };
                                }
                                Some(_) => {}
                            },
                            Err(e) => warn!("{name}: status poll failed: {e}"),
                        }
                    }
                }
            }
        });
        RunWatcher {
            module: module.to_string(),
            guard: token.clone().drop_guard(),
            token,
            handle,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Token that stops the watch when cancelled, usable after [`join`](Self::join) takes the watcher.
    pub fn canceller(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the watch to end.
    pub async fn join(self) -> RunEnd {
        let RunWatcher { guard, handle, .. } = self;
        // Waiting is not tearing down.
        guard.disarm();
        handle.await.unwrap_or(RunEnd::Cancelled)
    }
}

/// Start `module` and watch it until it stops running.
pub async fn run_and_watch(
    control: Arc<dyn RunControl>,
    module: &str,
    every: Duration,
) -> Result<RunWatcher, crate::api::ApiError> {
    control.run(module).await?;
    info!("{module}: run requested");
    Ok(RunWatcher::spawn(control, module, every, Some(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use async_trait::async_trait;
    use std::{collections::VecDeque, sync::Mutex};

    struct Script {
        statuses: Mutex<VecDeque<Result<bool, String>>>,
        runs: Mutex<Vec<String>>,
    }

    impl Script {
        fn new(seq: Vec<Result<bool, String>>) -> Arc<Self> {
            Arc::new(Script {
                statuses: Mutex::new(seq.into()),
                runs: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RunControl for Script {
        async fn run(&self, module: &str) -> Result<(), ApiError> {
            self.runs.lock().unwrap().push(module.to_string());
            Ok(())
        }

        async fn cancel(&self, _module: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn status(&self, _module: &str) -> Result<bool, ApiError> {
            // Once the script runs out the module keeps running.
            match self.statuses.lock().unwrap().pop_front() {
                Some(Ok(b)) => Ok(b),
                Some(Err(e)) => Err(ApiError::Backend(e)),
                None => Ok(true),
            }
        }
    }

    #[tokio::test]
    async fn test_stops_when_status_flips() {
        let script = Script::new(vec![Ok(true), Err("blip".into()), Ok(true), Ok(false)]);
        let w = run_and_watch(script.clone(), "nohl", Duration::from_millis(2))
            .await
            .unwrap();
        assert_eq!(w.module(), "nohl");
        assert_eq!(w.join().await, RunEnd::Changed { running: false });
        assert_eq!(script.runs.lock().unwrap().as_slice(), ["nohl"]);
    }

    #[tokio::test]
    async fn test_first_poll_is_baseline() {
        let script = Script::new(vec![Ok(false), Ok(false), Ok(true)]);
        let w = RunWatcher::spawn(script, "jduparr", Duration::from_millis(2), None);
        assert_eq!(w.join().await, RunEnd::Changed { running: true });
    }

    #[tokio::test]
    async fn test_cancel() {
        let script = Script::new(vec![]);
        let w = RunWatcher::spawn(script, "nohl", Duration::from_millis(2), Some(true));
        let stop = w.canceller();
        stop.cancel();
        assert_eq!(w.join().await, RunEnd::Cancelled);
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let script = Script::new(vec![]);
        let w = RunWatcher::spawn(script, "nohl", Duration::from_millis(2), Some(true));
        let token = w.token.clone();
        drop(w);
        assert!(token.is_cancelled());
    }
}
