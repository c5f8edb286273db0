//! Timer state machines over a logical millisecond clock.
//!
//! Nothing here reads the wall clock. Every method takes `now` from the
//! caller, which makes the schedules exact and testable: a test advances time
//! by passing a larger number.
//!
//! | Machine | Drives |
//! |---------|--------|
//! | [`AutoAdvance`] | periodic carousel rotation with interaction cooldown |
//! | [`Debouncer`] | search recomputation after typing stops |
//! | [`ClickDisambiguator`] | single click (flip) versus double click (open) |

/// Logical time in milliseconds.
pub type Millis = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoAdvanceState {
    Stopped,
    Running { next_tick: Millis },
    /// Suspended after an interaction until `resume_at`.
    Cooling { resume_at: Millis },
    /// Suspended while the lightbox is open or a pointer interaction is in
    /// progress.
    Held,
}

/// Periodic auto-advance.
///
/// Fires at most once per `interval`. An interaction pushes the next tick out
/// to `cooldown` after it. Holds are counted: ticking stays suspended until
/// every [`hold`](Self::hold) has been matched by a [`release`](Self::release).
#[derive(Debug, Clone)]
pub struct AutoAdvance {
    interval: Millis,
    cooldown: Millis,
    state: AutoAdvanceState,
    holds: u32,
}

impl AutoAdvance {
    pub fn new(interval: Millis, cooldown: Millis) -> Self {
        Self {
            interval,
            cooldown,
            state: AutoAdvanceState::Stopped,
            holds: 0,
        }
    }

    pub fn start(&mut self, now: Millis) {
        self.state = AutoAdvanceState::Running {
            next_tick: now + self.interval,
        };
    }

    pub fn stop(&mut self) {
        self.state = AutoAdvanceState::Stopped;
        self.holds = 0;
    }

    /// Record a user interaction. Cancels the pending tick and resumes after
    /// the cooldown. Has no effect while stopped or held.
    pub fn interact(&mut self, now: Millis) {
        match self.state {
            AutoAdvanceState::Running { .. } | AutoAdvanceState::Cooling { .. } => {
                self.state = AutoAdvanceState::Cooling {
                    resume_at: now + self.cooldown,
                };
            }
            AutoAdvanceState::Stopped | AutoAdvanceState::Held => {}
        }
    }

    /// Suspend until the matching [`release`](Self::release). Ignored while
    /// stopped.
    pub fn hold(&mut self) {
        if self.state != AutoAdvanceState::Stopped {
            self.holds += 1;
            self.state = AutoAdvanceState::Held;
        }
    }

    /// End one hold. When the last hold ends, ticking resumes after the
    /// cooldown.
    pub fn release(&mut self, now: Millis) {
        if self.state != AutoAdvanceState::Held {
            return;
        }
        self.holds = self.holds.saturating_sub(1);
        if self.holds == 0 {
            self.state = AutoAdvanceState::Cooling {
                resume_at: now + self.cooldown,
            };
        }
    }

    /// Returns `true` when a tick is due at `now`.
    ///
    /// A late poll fires once and schedules the following tick a full
    /// interval after `now`, so missed ticks are never replayed.
    pub fn poll(&mut self, now: Millis) -> bool {
        match self.state {
            AutoAdvanceState::Running { next_tick } if now >= next_tick => {
                self.state = AutoAdvanceState::Running {
                    next_tick: now + self.interval,
                };
                true
            }
            AutoAdvanceState::Cooling { resume_at } if now >= resume_at => {
                self.state = AutoAdvanceState::Running {
                    next_tick: resume_at + self.interval,
                };
                self.poll(now)
            }
            _ => false,
        }
    }

    pub fn state(&self) -> AutoAdvanceState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.state == AutoAdvanceState::Held
    }
}

/// Trailing-edge debounce: fires once, `delay` after the last `schedule`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Millis,
    deadline: Option<Millis>,
}

impl Debouncer {
    pub fn new(delay: Millis) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Millis) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn poll(&mut self, now: Millis) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction<T> {
    /// A single click that was not followed by a second one in time.
    Flip(T),
    /// Two clicks on the same target within the delay.
    Open(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickState<T> {
    Idle,
    PendingSingle { target: T, deadline: Millis },
}

/// Tells single clicks from double clicks.
///
/// A first click is held back for `delay`. A second click on the same target
/// inside that window becomes [`ClickAction::Open`] and the single click is
/// dropped. Otherwise the held click resolves to [`ClickAction::Flip`],
/// either when [`poll`](Self::poll) sees the deadline pass or when a click on
/// a different target arrives first.
#[derive(Debug, Clone)]
pub struct ClickDisambiguator<T> {
    delay: Millis,
    state: ClickState<T>,
}

impl<T: Copy + PartialEq> ClickDisambiguator<T> {
    pub fn new(delay: Millis) -> Self {
        Self {
            delay,
            state: ClickState::Idle,
        }
    }

    pub fn click(&mut self, target: T, now: Millis) -> Option<ClickAction<T>> {
        let pending = ClickState::PendingSingle {
            target,
            deadline: now + self.delay,
        };
        match std::mem::replace(&mut self.state, ClickState::Idle) {
            ClickState::PendingSingle {
                target: held,
                deadline,
            } if held == target && now < deadline => Some(ClickAction::Open(target)),
            ClickState::PendingSingle { target: held, .. } => {
                self.state = pending;
                Some(ClickAction::Flip(held))
            }
            ClickState::Idle => {
                self.state = pending;
                None
            }
        }
    }

    pub fn poll(&mut self, now: Millis) -> Option<ClickAction<T>> {
        match self.state {
            ClickState::PendingSingle { target, deadline } if now >= deadline => {
                self.state = ClickState::Idle;
                Some(ClickAction::Flip(target))
            }
            _ => None,
        }
    }

    /// Drop any held click without resolving it.
    pub fn reset(&mut self) {
        self.state = ClickState::Idle;
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ClickState::PendingSingle { .. })
    }
}
