// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Actor runtime
//!
//! Typed actor runtime underpinning the rule-engine routing core. Actors
//! live in a supervised tree addressed by [`ActorPath`], own exactly one
//! ordered mailbox each and process it single-threaded, while different
//! actors run fully concurrently on the tokio scheduler. A runner drains a
//! bounded chunk of an actor's mailbox before yielding its worker, so a hot
//! actor cannot starve its siblings.
//!
//! ## Messaging
//!
//! [`ActorRef::tell`] enqueues fire-and-forget; [`ActorRef::ask`] waits for
//! the handler's response. Handler errors are contained: they are returned
//! to the asker (or dropped for tell) and the actor continues with the next
//! mailbox entry. Escalation to the parent happens only through
//! [`ActorContext::emit_fail`].
//!
//! ## Lifecycle and supervision
//!
//! `pre_start` → message loop → `pre_stop` → `post_stop`. A failing
//! `pre_start` is retried according to the actor's
//! [`SupervisionStrategy`]; parents decide the fate of faulted children via
//! [`Handler::on_child_fault`].
//!
//! ## Events
//!
//! Every actor owns a broadcast event channel. External components observe
//! it through the [`Sink`]/[`Subscriber`] pair.
//!
//! ```ignore
//! let (system, mut runner) = ActorSystem::create(CancellationToken::new());
//! tokio::spawn(async move { runner.run().await });
//!
//! let gate: ActorRef<Gate> = system.create_root_actor("gate", Gate::new()).await?;
//! gate.tell(Open).await?;
//! ```

mod actor;
mod error;
mod mailbox;
mod path;
mod runner;
mod sink;
mod supervision;
mod system;

pub use actor::{
    Actor, ActorContext, ActorRef, ChildAction, Event, Handler, Message,
    Response,
};
pub use error::Error;
pub use path::ActorPath;
pub use sink::{Sink, Subscriber};
pub use supervision::{
    ExponentialBackoffStrategy, FixedIntervalStrategy, NoIntervalStrategy,
    RetryStrategy, SupervisionStrategy,
};
pub use system::{ActorSystem, SystemEvent, SystemRef, SystemRunner};
