//! Bounded-wait polling for submitted jobs.

use std::sync::Arc;
use std::time::Duration;

use comfy_bridge_common::{JobHandle, JobState};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::engine::ComfyEngine;
use crate::error::{Error, Result};

/// Re-queries a job at a fixed interval until it settles or a deadline passes.
///
/// There is no backoff and no retry cap besides the deadline. Running out of
/// time is a normal outcome reported as a `timeout` state, not an error.
pub struct Poller {
    engine: Arc<dyn ComfyEngine>,
    interval: Duration,
}

impl Poller {
    pub fn new(engine: Arc<dyn ComfyEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `handle` until it is completed or errored, `timeout` elapses, or
    /// `cancel` fires.
    ///
    /// A transport failure on any poll ends the wait with that error. The
    /// inter-poll sleep never extends past the deadline. A timeout too large
    /// to represent as an instant waits without a deadline.
    pub async fn wait(
        &self,
        handle: &JobHandle,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<JobState> {
        let deadline = Instant::now().checked_add(timeout);
        let mut polls = 0u32;

        while deadline.map_or(true, |deadline| Instant::now() < deadline) {
            let state = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                state = self.engine.job_status(handle) => state?,
            };
            polls += 1;

            if state.status.is_settled() {
                tracing::debug!("Job {} settled as {} after {} polls", handle, state.status, polls);
                return Ok(state);
            }

            let pause = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    self.interval.min(remaining)
                }
                None => self.interval,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!(
            "Gave up waiting for job {} after {:?} ({} polls)",
            handle,
            timeout,
            polls
        );
        Ok(JobState::timed_out(handle.clone()))
    }
}
