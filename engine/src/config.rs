// Copyright 2026 Ruleflow Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Engine configuration
//!

use queue::ConsumerConfig;

use serde::Deserialize;

/// Bootstrap configuration for a rule engine instance.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Identity of this instance in the service roster.
    pub instance_id: String,
    /// Deployment-wide topic prefix; empty for none.
    pub topic_prefix: String,
    /// Ceiling on message traversals through rule nodes. A message routed
    /// more times than this fails instead of looping forever.
    pub max_hops: u32,
    /// One consumer per queue.
    pub queues: Vec<ConsumerConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            instance_id: "ruleflow-0".to_owned(),
            topic_prefix: "tb".to_owned(),
            max_hops: 30,
            queues: vec![ConsumerConfig::default()],
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn defaults_carry_one_queue() {
        let config = EngineConfig::default();
        assert_eq!(config.queues.len(), 1);
        assert_eq!(config.max_hops, 30);
    }
}
