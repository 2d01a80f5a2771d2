// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! Supervision strategies applied when an actor fails to start.
//!

use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
    time::Duration,
};

use backoff::backoff::Backoff as InnerBackoff;

/// Retry policy used by [`SupervisionStrategy::Retry`]. Implement this to
/// plug a custom backoff pattern into the runtime.
pub trait RetryStrategy: Debug + Send + Sync {
    /// Maximum number of attempts before the actor is permanently stopped.
    fn max_retries(&self) -> usize;
    /// Wait duration before the next attempt. `None` retries immediately.
    fn next_backoff(&mut self) -> Option<Duration>;
}

/// What to do when an actor fails at startup: give up, or retry according
/// to a [`RetryStrategy`].
#[derive(Debug)]
pub enum SupervisionStrategy {
    /// Stop the actor on the first startup error.
    Stop,
    /// Retry starting the actor.
    Retry(Box<dyn RetryStrategy>),
}

/// Retries immediately, without waiting between attempts.
#[derive(Debug, Default)]
pub struct NoIntervalStrategy {
    max_retries: usize,
}

impl NoIntervalStrategy {
    pub fn new(max_retries: usize) -> Self {
        NoIntervalStrategy { max_retries }
    }
}

impl RetryStrategy for NoIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        None
    }
}

/// Retries with a fixed wait period between attempts.
#[derive(Debug, Default)]
pub struct FixedIntervalStrategy {
    max_retries: usize,
    duration: Duration,
}

impl FixedIntervalStrategy {
    pub fn new(max_retries: usize, duration: Duration) -> Self {
        FixedIntervalStrategy {
            max_retries,
            duration,
        }
    }
}

impl RetryStrategy for FixedIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        Some(self.duration)
    }
}

/// Retries with an exponential backoff wait period between attempts.
#[derive(Debug, Default)]
pub struct ExponentialBackoffStrategy {
    max_retries: usize,
    inner: Arc<Mutex<backoff::ExponentialBackoff>>,
}

impl ExponentialBackoffStrategy {
    pub fn new(max_retries: usize) -> Self {
        ExponentialBackoffStrategy {
            max_retries,
            inner: Arc::new(Mutex::new(backoff::ExponentialBackoff::default())),
        }
    }
}

impl RetryStrategy for ExponentialBackoffStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.inner.lock().ok().and_then(|mut eb| eb.next_backoff())
    }
}
