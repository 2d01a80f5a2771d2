// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Callback chain
//!
//! Acknowledgement plumbing between the queue consumer and the rule engine.
//! Each consumed message carries a [`MsgCallback`]; whoever finishes the
//! message (terminal rule node, error sink, dispatch failure path) resolves
//! it exactly once. [`BranchingCallback`] splits a callback across fan-out
//! branches and resolves the parent only when every branch has reported.
//!

use crate::Error;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type SuccessFn = Box<dyn FnOnce() + Send>;
type FailureFn = Box<dyn FnOnce(Error) + Send>;

struct CallbackInner {
    resolved: AtomicBool,
    on_success: Mutex<Option<SuccessFn>>,
    on_failure: Mutex<Option<FailureFn>>,
}

/// Exactly-once completion handle for one in-flight message.
///
/// Cloning shares the handle; the first resolution wins and every later
/// call on any clone is a no-op. Both closures are dropped once either has
/// run.
#[derive(Clone)]
pub struct MsgCallback(Arc<CallbackInner>);

impl MsgCallback {
    pub fn new(
        on_success: impl FnOnce() + Send + 'static,
        on_failure: impl FnOnce(Error) + Send + 'static,
    ) -> Self {
        MsgCallback(Arc::new(CallbackInner {
            resolved: AtomicBool::new(false),
            on_success: Mutex::new(Some(Box::new(on_success))),
            on_failure: Mutex::new(Some(Box::new(on_failure))),
        }))
    }

    /// Handle that ignores both outcomes.
    pub fn noop() -> Self {
        MsgCallback::new(|| {}, |_| {})
    }

    /// Resolves the message as processed.
    pub fn on_success(&self) {
        if self.0.resolved.swap(true, Ordering::AcqRel) {
            return;
        }
        let callback = self
            .0
            .on_success
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Ok(mut slot) = self.0.on_failure.lock() {
            slot.take();
        }
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Resolves the message as failed.
    pub fn on_failure(&self, error: Error) {
        if self.0.resolved.swap(true, Ordering::AcqRel) {
            return;
        }
        let callback = self
            .0
            .on_failure
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Ok(mut slot) = self.0.on_success.lock() {
            slot.take();
        }
        if let Some(callback) = callback {
            callback(error);
        }
    }

    /// Wraps the handle so `hook` runs after either resolution. Used by
    /// submit strategies to observe completion without consuming the
    /// outcome.
    pub fn with_hook(self, hook: impl FnOnce() + Send + 'static) -> Self {
        let hook: Arc<Mutex<Option<SuccessFn>>> =
            Arc::new(Mutex::new(Some(Box::new(hook))));
        let hook_on_failure = hook.clone();
        let success_target = self.clone();
        let failure_target = self;
        MsgCallback::new(
            move || {
                success_target.on_success();
                if let Some(h) =
                    hook.lock().ok().and_then(|mut slot| slot.take())
                {
                    h();
                }
            },
            move |error| {
                failure_target.on_failure(error);
                if let Some(h) = hook_on_failure
                    .lock()
                    .ok()
                    .and_then(|mut slot| slot.take())
                {
                    h();
                }
            },
        )
    }
}

impl fmt::Debug for MsgCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsgCallback")
            .field("resolved", &self.0.resolved.load(Ordering::Acquire))
            .finish()
    }
}

struct BranchState {
    remaining: AtomicUsize,
    // First branch failure wins; later failures only decrement.
    first_error: Mutex<Option<Error>>,
    parent: MsgCallback,
}

impl BranchState {
    fn resolve(self: &Arc<Self>, error: Option<Error>) {
        if let Some(error) = error {
            if let Ok(mut slot) = self.first_error.lock() {
                slot.get_or_insert(error);
            }
        }
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let first_error = self
                .first_error
                .lock()
                .ok()
                .and_then(|mut slot| slot.take());
            match first_error {
                Some(error) => self.parent.on_failure(error),
                None => self.parent.on_success(),
            }
        }
    }
}

/// Splits one callback across concurrent fan-out branches.
pub struct BranchingCallback;

impl BranchingCallback {
    /// Returns one child handle per branch. The parent resolves once all
    /// children have resolved: success if every branch succeeded, otherwise
    /// failure with the first recorded error. Zero branches resolve the
    /// parent successfully right away.
    pub fn fork(parent: MsgCallback, branches: usize) -> Vec<MsgCallback> {
        if branches == 0 {
            parent.on_success();
            return Vec::new();
        }
        let state = Arc::new(BranchState {
            remaining: AtomicUsize::new(branches),
            first_error: Mutex::new(None),
            parent,
        });
        (0..branches)
            .map(|_| {
                let on_success = state.clone();
                let on_failure = state.clone();
                MsgCallback::new(
                    move || on_success.resolve(None),
                    move |error| on_failure.resolve(Some(error)),
                )
            })
            .collect()
    }
}
