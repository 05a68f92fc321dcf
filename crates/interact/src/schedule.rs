//! Cancellable scheduled actions.
//!
//! A [`Pending`] slot belongs to exactly one behavior instance and holds at
//! most one action. Scheduling replaces whatever was waiting, so two timed
//! sequences never fight over the same state. The owner polls the slot from
//! its per-tick update.

/// When a scheduled action becomes due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delay {
    /// On the owner's next tick.
    NextTick,
    /// After this many seconds of accumulated tick time.
    Seconds(f32),
}

#[derive(Debug, Clone)]
struct Scheduled<A> {
    action: A,
    remaining: f32,
    next_tick: bool,
}

/// Single-slot scheduled action.
#[derive(Debug, Clone)]
pub struct Pending<A> {
    slot: Option<Scheduled<A>>,
}

impl<A> Default for Pending<A> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<A> Pending<A> {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action`, returning the action it displaced, if any.
    pub fn schedule(&mut self, action: A, delay: Delay) -> Option<A> {
        let (remaining, next_tick) = match delay {
            Delay::NextTick => (0.0, true),
            Delay::Seconds(secs) => (secs.max(0.0), false),
        };
        let previous = self.cancel();
        self.slot = Some(Scheduled {
            action,
            remaining,
            next_tick,
        });
        previous
    }

    /// Drop the waiting action.
    pub fn cancel(&mut self) -> Option<A> {
        self.slot.take().map(|scheduled| scheduled.action)
    }

    /// Whether an action is waiting.
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Seconds left before the waiting action is due.
    pub fn remaining(&self) -> Option<f32> {
        self.slot.as_ref().map(|scheduled| scheduled.remaining)
    }

    /// Advance by `dt` and hand back the action if it is now due.
    pub fn poll(&mut self, dt: f32) -> Option<A> {
        let scheduled = self.slot.as_mut()?;
        if !scheduled.next_tick {
            scheduled.remaining -= dt;
            if scheduled.remaining > 1e-6 {
                return None;
            }
        }
        self.cancel()
    }
}
