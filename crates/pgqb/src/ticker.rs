//! One-shot deadline callbacks.
//!
//! A [`Ticker`] runs a callback once when its deadline passes, unless it is
//! cancelled or dropped first. While armed, the deadline may be moved with
//! [`Ticker::reset`].
//!
//! Tickers spawn onto the current tokio runtime, so they must be started from
//! within one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::time::Instant;

// The low two bits hold the state; the rest count deadline changes, so the
// task can only fire for the deadline it is sleeping on.
const ARMED: u64 = 0;
const FIRED: u64 = 1;
const CANCELLED: u64 = 2;
const STATE_MASK: u64 = 0b11;

fn pack(generation: u64, state: u64) -> u64 {
    (generation << 2) | state
}

fn generation_of(raw: u64) -> u64 {
    raw >> 2
}

fn is_armed(raw: u64) -> bool {
    raw & STATE_MASK == ARMED
}

/// Lifecycle of a [`Ticker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerState {
    Armed,
    Fired,
    Cancelled,
}

impl TickerState {
    fn from_raw(raw: u64) -> Self {
        match raw & STATE_MASK {
            ARMED => TickerState::Armed,
            FIRED => TickerState::Fired,
            _ => TickerState::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    generation: u64,
}

/// A pending callback for `id`, due at a deadline.
///
/// Dropping the ticker revokes the callback.
#[derive(Debug)]
pub struct Ticker<T> {
    id: T,
    state: Arc<AtomicU64>,
    deadline: watch::Sender<Option<Deadline>>,
}

impl<T> Ticker<T>
where
    T: Clone + Send + 'static,
{
    /// Arm a ticker that calls `on_finish(id)` at `finish_at`.
    ///
    /// A deadline that has already passed fires right away.
    pub fn start<F>(id: T, finish_at: Instant, on_finish: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        let state = Arc::new(AtomicU64::new(pack(0, ARMED)));
        let (deadline, rx) = watch::channel(Some(Deadline {
            at: finish_at,
            generation: 0,
        }));
        tokio::spawn(run(id.clone(), rx, state.clone(), on_finish));
        Self {
            id,
            state,
            deadline,
        }
    }

    /// Move the deadline. Returns `false` once the ticker has fired or been
    /// cancelled; a `true` return means the callback runs at `finish_at`.
    pub fn reset(&self, finish_at: Instant) -> bool {
        let Ok(prev) = self.state.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
            is_armed(raw).then(|| pack(generation_of(raw) + 1, ARMED))
        }) else {
            return false;
        };
        let generation = generation_of(prev) + 1;
        // concurrent resets may publish out of order; keep the newest
        self.deadline.send_if_modified(|current| {
            if current.is_some_and(|d| d.generation > generation) {
                return false;
            }
            *current = Some(Deadline {
                at: finish_at,
                generation,
            });
            true
        });
        true
    }

    /// Revoke the pending callback. Returns `false` if it already fired.
    pub fn cancel(&self) -> bool {
        let revoked = revoke(&self.state);
        if revoked {
            self.deadline.send_replace(None);
        }
        revoked
    }

    pub fn state(&self) -> TickerState {
        TickerState::from_raw(self.state.load(Ordering::SeqCst))
    }

    pub fn is_fired(&self) -> bool {
        self.state() == TickerState::Fired
    }

    pub fn id(&self) -> &T {
        &self.id
    }
}

fn revoke(state: &AtomicU64) -> bool {
    state
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
            is_armed(raw).then(|| pack(generation_of(raw), CANCELLED))
        })
        .is_ok()
}

async fn run<T, F>(
    id: T,
    mut deadline: watch::Receiver<Option<Deadline>>,
    state: Arc<AtomicU64>,
    on_finish: F,
) where
    F: FnOnce(T),
{
    loop {
        let Some(Deadline { at, generation }) = *deadline.borrow_and_update() else {
            return;
        };
        tokio::select! {
            _ = tokio::time::sleep_until(at) => {
                let due = pack(generation, ARMED);
                let fired = pack(generation, FIRED);
                match state.compare_exchange(due, fired, Ordering::SeqCst, Ordering::SeqCst) {
                    Ok(_) => {
                        on_finish(id);
                        return;
                    }
                    // superseded by a reset whose deadline is still being published
                    Err(raw) if is_armed(raw) => {
                        if deadline.changed().await.is_err() {
                            revoke(&state);
                            return;
                        }
                    }
                    Err(_) => return,
                }
            }
            changed = deadline.changed() => {
                if changed.is_err() {
                    // Ticker dropped.
                    revoke(&state);
                    return;
                }
            }
        }
    }
}
