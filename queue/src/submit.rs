// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Submit strategies
//!
//! How a polled pack is handed to the rule engine: all at once, strictly
//! one after another, or one lane per originator. Strategies only shape
//! dispatch order and backpressure; completion accounting for the pack as a
//! whole stays with the consumer's pack context.
//!

use crate::{Msg, MsgCallback};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

/// Hands one message to the processing side.
///
/// Implementations must resolve the callback eventually, also when the
/// hand-off itself fails; a dropped callback stalls its pack until the
/// pack-processing timeout.
#[async_trait]
pub trait MsgDispatcher: Send + Sync {
    async fn dispatch(&self, msg: Msg, callback: MsgCallback);
}

/// Dispatch discipline for one pack.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SubmitStrategyKind {
    /// Dispatch everything, then wait for the whole pack.
    Batch,
    /// Dispatch everything without waiting.
    Burst,
    /// One message at a time, next only after the previous resolved.
    Sequential,
    /// Per-originator lanes: messages of one originator are serialized,
    /// different originators run concurrently.
    SequentialByOriginator,
}

/// Dispatches a pack according to `kind`. Returns when the strategy's own
/// ordering obligations are met, which for [`SubmitStrategyKind::Burst`] is
/// right after the last hand-off.
pub async fn submit_pack(
    kind: SubmitStrategyKind,
    entries: Vec<(Msg, MsgCallback)>,
    dispatcher: &dyn MsgDispatcher,
) {
    match kind {
        SubmitStrategyKind::Burst => {
            for (msg, callback) in entries {
                dispatcher.dispatch(msg, callback).await;
            }
        }
        SubmitStrategyKind::Batch => {
            let mut completions = Vec::with_capacity(entries.len());
            for (msg, callback) in entries {
                let (tx, rx) = oneshot::channel();
                let callback = callback.with_hook(move || {
                    let _ = tx.send(());
                });
                dispatcher.dispatch(msg, callback).await;
                completions.push(rx);
            }
            join_all(completions).await;
        }
        SubmitStrategyKind::Sequential => {
            for (msg, callback) in entries {
                let (tx, rx) = oneshot::channel();
                let callback = callback.with_hook(move || {
                    let _ = tx.send(());
                });
                dispatcher.dispatch(msg, callback).await;
                let _ = rx.await;
            }
        }
        SubmitStrategyKind::SequentialByOriginator => {
            submit_by_originator(entries, dispatcher).await;
        }
    }
}

/// Head-of-lane scheduling: the first message of every originator is
/// dispatched up front, each completion releases the next message of that
/// originator only.
async fn submit_by_originator(
    entries: Vec<(Msg, MsgCallback)>,
    dispatcher: &dyn MsgDispatcher,
) {
    let total = entries.len();
    let mut lanes: HashMap<Uuid, VecDeque<(Msg, MsgCallback)>> =
        HashMap::new();
    for (msg, callback) in entries {
        lanes
            .entry(msg.originator.id)
            .or_default()
            .push_back((msg, callback));
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Uuid>();
    for lane in lanes.values_mut() {
        if let Some((msg, callback)) = lane.pop_front() {
            dispatch_lane_head(dispatcher, msg, callback, &tx).await;
        }
    }

    let mut completed = 0;
    while completed < total {
        let Some(lane_key) = rx.recv().await else {
            break;
        };
        completed += 1;
        if let Some((msg, callback)) =
            lanes.get_mut(&lane_key).and_then(VecDeque::pop_front)
        {
            dispatch_lane_head(dispatcher, msg, callback, &tx).await;
        }
    }
}

async fn dispatch_lane_head(
    dispatcher: &dyn MsgDispatcher,
    msg: Msg,
    callback: MsgCallback,
    tx: &mpsc::UnboundedSender<Uuid>,
) {
    let lane_key = msg.originator.id;
    let tx = tx.clone();
    let callback = callback.with_hook(move || {
        let _ = tx.send(lane_key);
    });
    dispatcher.dispatch(msg, callback).await;
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{EntityId, Metadata, TenantId};

    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Completes every message on a background task after a short delay,
    /// logging `start`/`done` events.
    struct RecordingDispatcher {
        log: Arc<Mutex<Vec<String>>>,
        delay: Duration,
    }

    #[async_trait]
    impl MsgDispatcher for RecordingDispatcher {
        async fn dispatch(&self, msg: Msg, callback: MsgCallback) {
            let tag = msg
                .metadata
                .get("tag")
                .unwrap_or_default()
                .to_owned();
            self.log.lock().unwrap().push(format!("start {}", tag));
            let log = self.log.clone();
            let delay = self.delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                log.lock().unwrap().push(format!("done {}", tag));
                callback.on_success();
            });
        }
    }

    fn tagged(originator: EntityId, tag: &str) -> (Msg, MsgCallback) {
        let msg = Msg::new(
            originator,
            "POST_TELEMETRY_REQUEST",
            Vec::new(),
            [("tag", tag)].into_iter().collect::<Metadata>(),
        );
        (msg, MsgCallback::noop())
    }

    fn device() -> EntityId {
        EntityId::device(TenantId::random(), Uuid::new_v4())
    }

    #[tokio::test]
    async fn sequential_serializes_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = RecordingDispatcher {
            log: log.clone(),
            delay: Duration::from_millis(10),
        };
        let d = device();
        let entries = vec![
            tagged(d, "a"),
            tagged(device(), "b"),
            tagged(device(), "c"),
        ];
        submit_pack(SubmitStrategyKind::Sequential, entries, &dispatcher)
            .await;
        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec!["start a", "done a", "start b", "done b", "start c",
                 "done c"]
        );
    }

    #[tokio::test]
    async fn by_originator_serializes_per_lane_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = RecordingDispatcher {
            log: log.clone(),
            delay: Duration::from_millis(10),
        };
        let d1 = device();
        let d2 = device();
        let entries = vec![
            tagged(d1, "d1-0"),
            tagged(d1, "d1-1"),
            tagged(d1, "d1-2"),
            tagged(d2, "d2-0"),
        ];
        submit_pack(
            SubmitStrategyKind::SequentialByOriginator,
            entries,
            &dispatcher,
        )
        .await;
        let log = log.lock().unwrap().clone();
        let pos = |event: &str| {
            log.iter().position(|e| e == event).unwrap_or_else(|| {
                panic!("missing {} in {:?}", event, log)
            })
        };
        // Lane d1 strictly ordered.
        assert!(pos("done d1-0") < pos("start d1-1"));
        assert!(pos("done d1-1") < pos("start d1-2"));
        // Lane d2 started before lane d1 drained.
        assert!(pos("start d2-0") < pos("done d1-2"));
    }

    #[tokio::test]
    async fn batch_waits_for_all_before_returning() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = RecordingDispatcher {
            log: log.clone(),
            delay: Duration::from_millis(10),
        };
        let entries =
            vec![tagged(device(), "a"), tagged(device(), "b")];
        submit_pack(SubmitStrategyKind::Batch, entries, &dispatcher).await;
        let log = log.lock().unwrap().clone();
        assert!(log.contains(&"done a".to_owned()));
        assert!(log.contains(&"done b".to_owned()));
        // Both dispatched before either completion was awaited.
        let starts: Vec<_> =
            log.iter().filter(|e| e.starts_with("start")).collect();
        assert_eq!(starts.len(), 2);
    }

    #[tokio::test]
    async fn burst_returns_without_waiting() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = RecordingDispatcher {
            log: log.clone(),
            delay: Duration::from_millis(50),
        };
        let entries =
            vec![tagged(device(), "a"), tagged(device(), "b")];
        submit_pack(SubmitStrategyKind::Burst, entries, &dispatcher).await;
        let snapshot = log.lock().unwrap().clone();
        assert_eq!(snapshot, vec!["start a", "start b"]);
    }
}
