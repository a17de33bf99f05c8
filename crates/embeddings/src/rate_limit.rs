//! Adaptive rate-limit controller shared by all in-flight embedding calls
//! of one client.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

const INITIAL_BACKOFF: Duration = Duration::from_secs(5);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Consecutive successes required to grow concurrency by one slot.
const GROW_EVERY: u32 = 3;

/// Consecutive successes after which the backoff is halved toward the
/// initial value.
const SHRINK_BACKOFF_EVERY: u32 = 30;

#[derive(Debug)]
struct ControllerState {
    paused: bool,
    in_flight: usize,
    limit: usize,
    consecutive_successes: u32,
    backoff: Duration,
}

/// Pause/resume and concurrency state for one embedding configuration.
///
/// On a rate-limit signal all submissions pause, the current backoff is
/// waited out, and concurrency restarts at one slot, regrowing with
/// sustained success. The next pause waits the doubled backoff.
#[derive(Debug)]
pub struct RateController {
    max_concurrency: usize,
    state: Mutex<ControllerState>,
    wake_tx: watch::Sender<u64>,
}

/// An acquired submission slot; dropping it frees the slot.
pub struct RatePermit {
    controller: Arc<RateController>,
}

impl Drop for RatePermit {
    fn drop(&mut self) {
        let mut state = self.controller.lock_state();
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.controller.wake();
    }
}

impl RateController {
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        let (wake_tx, _) = watch::channel(0);
        Self {
            max_concurrency,
            state: Mutex::new(ControllerState {
                paused: false,
                in_flight: 0,
                limit: max_concurrency,
                consecutive_successes: 0,
                backoff: INITIAL_BACKOFF,
            }),
            wake_tx,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wake(&self) {
        self.wake_tx.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// Wait for a free submission slot while not paused.
    pub async fn acquire(self: &Arc<Self>) -> RatePermit {
        let mut rx = self.wake_tx.subscribe();
        loop {
            {
                let mut state = self.lock_state();
                if !state.paused && state.in_flight < state.limit {
                    state.in_flight += 1;
                    return RatePermit {
                        controller: Arc::clone(self),
                    };
                }
            }
            // A send between the check and this await is still observed.
            if rx.changed().await.is_err() {
                // Sender lives as long as self; unreachable in practice.
                tokio::task::yield_now().await;
            }
        }
    }

    /// Record a successful request: regrow concurrency and relax backoff.
    pub fn note_success(&self) {
        let mut state = self.lock_state();
        state.consecutive_successes = state.consecutive_successes.saturating_add(1);
        if state.consecutive_successes % GROW_EVERY == 0 && state.limit < self.max_concurrency {
            state.limit += 1;
            drop(state);
            self.wake();
            return;
        }
        if state.consecutive_successes % SHRINK_BACKOFF_EVERY == 0 {
            state.backoff = (state.backoff / 2).max(INITIAL_BACKOFF);
        }
    }

    /// Rate-limit pathway: the first caller pauses everyone, waits the
    /// current backoff, then resumes at concurrency 1 with the next backoff
    /// doubled. Concurrent callers just wait for the resume.
    pub async fn pause_and_wait(&self) {
        let wait = {
            let mut state = self.lock_state();
            if state.paused {
                None
            } else {
                state.paused = true;
                state.consecutive_successes = 0;
                Some(state.backoff)
            }
        };

        match wait {
            Some(backoff) => {
                log::warn!(
                    "embedding endpoint rate limited; pausing all requests for {:?}",
                    backoff
                );
                tokio::time::sleep(backoff).await;
                let mut state = self.lock_state();
                state.backoff = (state.backoff * 2).min(MAX_BACKOFF);
                state.limit = 1;
                state.paused = false;
                drop(state);
                self.wake();
            }
            None => {
                let mut rx = self.wake_tx.subscribe();
                loop {
                    if !self.lock_state().paused {
                        return;
                    }
                    if rx.changed().await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    #[cfg(test)]
    fn snapshot(&self) -> (bool, usize, Duration) {
        let state = self.lock_state();
        (state.paused, state.limit, state.backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_pause_resets_concurrency_and_doubles_backoff() {
        let controller = Arc::new(RateController::new(8));
        controller.pause_and_wait().await;

        let (paused, limit, backoff) = controller.snapshot();
        assert!(!paused);
        assert_eq!(limit, 1);
        assert_eq!(backoff, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_caps_at_sixty_seconds() {
        let controller = Arc::new(RateController::new(2));
        for _ in 0..6 {
            controller.pause_and_wait().await;
        }
        let (_, _, backoff) = controller.snapshot();
        assert_eq!(backoff, MAX_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_regrows_one_slot_per_three_successes() {
        let controller = Arc::new(RateController::new(4));
        controller.pause_and_wait().await;
        assert_eq!(controller.snapshot().1, 1);

        for _ in 0..3 {
            controller.note_success();
        }
        assert_eq!(controller.snapshot().1, 2);

        for _ in 0..6 {
            controller.note_success();
        }
        assert_eq!(controller.snapshot().1, 4);

        // Capped at the configured maximum.
        for _ in 0..30 {
            controller.note_success();
        }
        assert_eq!(controller.snapshot().1, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_success_halves_backoff() {
        let controller = Arc::new(RateController::new(1));
        for _ in 0..4 {
            controller.pause_and_wait().await;
        }
        let before = controller.snapshot().2;
        assert!(before > INITIAL_BACKOFF);

        for _ in 0..30 {
            controller.note_success();
        }
        let after = controller.snapshot().2;
        assert_eq!(after, (before / 2).max(INITIAL_BACKOFF));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_respects_limit() {
        let controller = Arc::new(RateController::new(2));
        let first = controller.acquire().await;
        let _second = controller.acquire().await;

        // Third acquire must wait until a permit drops.
        let waiter = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                let _p = controller.acquire().await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_blocks_while_paused() {
        let controller = Arc::new(RateController::new(4));
        {
            let mut state = controller.lock_state();
            state.paused = true;
        }

        let waiter = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                let _p = controller.acquire().await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        {
            let mut state = controller.lock_state();
            state.paused = false;
        }
        controller.wake();
        waiter.await.unwrap();
    }
}
