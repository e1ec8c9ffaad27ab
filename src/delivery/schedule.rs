//! Delivery schedule module.
//!
//! This module contains the delivery loop, which repeats delivery
//! rounds with an adaptive pause until it gets cancelled.

use log::{debug, error, info};
use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};

use crate::{
    delivery::pass::{self, error_chain},
    Deliver, DeliveryConfig, DeliveryTarget, MailboxSession,
};

/// Represents a cooperative cancellation signal shared between the
/// delivery loop and its controller. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<(Mutex<bool>, Condvar)>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes up every waiter. Cancelling twice
    /// is a no-op.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.0;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.0;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the token is cancelled or the timeout elapses.
    /// Returns true if the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.0;
        let cancelled = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (cancelled, _) = cvar
            .wait_timeout_while(cancelled, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled
    }
}

/// Represents the delivery loop.
///
/// Each instance owns its configuration. Several loops may run
/// concurrently as long as each one gets its own session.
#[derive(Debug, Default, Clone)]
pub struct DeliveryLoop {
    config: DeliveryConfig,
    cancel: CancelToken,
}

impl DeliveryLoop {
    pub fn new(config: DeliveryConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::default(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Gets a handle able to stop the loop from another thread or
    /// from the delivery callback.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs one delivery round, see [`pass::deliver_one`].
    pub fn run_once<S, D>(
        &self,
        session: &mut S,
        target: &DeliveryTarget,
        deliver: &mut D,
    ) -> pass::Result<usize>
    where
        S: MailboxSession + ?Sized,
        D: Deliver + ?Sized,
    {
        pass::deliver_one(session, target, &self.config, deliver)
    }

    /// Runs delivery rounds until the loop gets cancelled.
    ///
    /// A round in progress always runs to completion. Round errors
    /// are logged and followed by the long pause, like empty rounds;
    /// rounds that delivered something are followed by the short
    /// pause. Returns the total number of delivered emails.
    pub fn run<S, D>(&self, session: &mut S, target: &DeliveryTarget, deliver: &mut D) -> usize
    where
        S: MailboxSession + ?Sized,
        D: Deliver + ?Sized,
    {
        let mut total = 0;

        loop {
            let pause = match self.run_once(session, target, deliver) {
                Ok(0) => {
                    info!("delivered 0 email(s) from {}", target.inbox_folder());
                    self.config.long_sleep()
                }
                Ok(n) => {
                    info!("delivered {} email(s) from {}", n, target.inbox_folder());
                    total += n;
                    self.config.short_sleep()
                }
                Err(err) => {
                    error!("{}", error_chain(&err));
                    self.config.long_sleep()
                }
            };

            if self.cancel.is_cancelled() {
                break;
            }

            debug!("next delivery round in {:?}", pause);
            if self.cancel.wait_timeout(pause) {
                break;
            }
        }

        debug!("delivery loop cancelled");
        total
    }
}
