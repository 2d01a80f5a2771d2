// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Queue-to-engine dispatch
//!

use crate::actors::{EngineActor, EngineMsg, RuleEngineMsg};

use actor::ActorRef;
use async_trait::async_trait;
use queue::{Error as QueueError, Msg, MsgCallback, MsgDispatcher};

/// Bridges the queue consumers to the engine root actor. A failed hand-off
/// resolves the callback as failed immediately so the pack never waits on a
/// message that was never delivered.
pub struct RuleEngineDispatcher {
    engine: ActorRef<EngineActor>,
}

impl RuleEngineDispatcher {
    pub fn new(engine: ActorRef<EngineActor>) -> Self {
        RuleEngineDispatcher { engine }
    }
}

#[async_trait]
impl MsgDispatcher for RuleEngineDispatcher {
    async fn dispatch(&self, msg: Msg, callback: MsgCallback) {
        let envelope = RuleEngineMsg::new(msg, callback.clone());
        if let Err(error) =
            self.engine.tell(EngineMsg::Route(envelope)).await
        {
            callback.on_failure(QueueError::Dispatch(error.to_string()));
        }
    }
}
