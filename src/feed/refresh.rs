use std::{fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::infrastructure::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshState {
    Idle,
    Fetching { started_at: DateTime<Utc> },
}

/// Why a refresh request did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSkip {
    InFlight { running_for: Duration },
    CoolingDown { remaining: Duration },
}

impl fmt::Display for RefreshSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshSkip::InFlight { running_for } => write!(
                f,
                "a refresh is already running ({}s so far)",
                running_for.num_seconds().max(0)
            ),
            RefreshSkip::CoolingDown { remaining } => {
                write!(f, "last refresh is too recent; retry in {}s", remaining.num_seconds().max(1))
            }
        }
    }
}

#[derive(Debug)]
struct GateState {
    state: RefreshState,
    last_success: Option<DateTime<Utc>>,
}

/// Single-flight and cooldown guard for feed refreshes.
///
/// `Idle -> Fetching -> Idle`. Only a completed ticket records a success
/// timestamp, so failed refreshes never start a cooldown.
pub struct RefreshGate {
    inner: Arc<Mutex<GateState>>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
}

impl RefreshGate {
    pub fn new(clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GateState {
                state: RefreshState::Idle,
                last_success: None,
            })),
            clock,
            cooldown,
        }
    }

    pub fn try_begin(&self, ignore_cooldown: bool) -> Result<RefreshTicket, RefreshSkip> {
        let now = self.clock.now();
        let mut guard = self.inner.lock();

        if let RefreshState::Fetching { started_at } = guard.state {
            return Err(RefreshSkip::InFlight {
                running_for: now - started_at,
            });
        }
        if !ignore_cooldown {
            if let Some(last) = guard.last_success {
                let elapsed = now - last;
                if elapsed < self.cooldown {
                    return Err(RefreshSkip::CoolingDown {
                        remaining: self.cooldown - elapsed,
                    });
                }
            }
        }

        guard.state = RefreshState::Fetching { started_at: now };
        Ok(RefreshTicket {
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        })
    }
}

/// Held for the duration of one refresh. Dropping it without calling
/// [`RefreshTicket::complete`] returns the gate to idle with no timestamp.
#[must_use = "dropping the ticket ends the refresh immediately"]
pub struct RefreshTicket {
    inner: Arc<Mutex<GateState>>,
    clock: Arc<dyn Clock>,
}

impl RefreshTicket {
    pub fn complete(self) -> DateTime<Utc> {
        let now = self.clock.now();
        self.inner.lock().last_success = Some(now);
        now
    }
}

impl Drop for RefreshTicket {
    fn drop(&mut self) {
        self.inner.lock().state = RefreshState::Idle;
    }
}
