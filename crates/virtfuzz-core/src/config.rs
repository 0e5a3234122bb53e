//! Harness configuration shared by the decoder, replay engine, and drivers.

use serde::{Deserialize, Serialize};

/// Default upper bound on decoded messages per input.
pub const DEFAULT_MAX_MESSAGES: usize = 512;

/// Default upper bound on a single DMA payload.
pub const DEFAULT_MAX_DMA_TRANSFER: u16 = 256;

/// Default generated input buffer size.
pub const DEFAULT_INPUT_BYTES: usize = 4096;

/// Replay behavior after the device model reports a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultPolicy {
    /// Abort the iteration at the first fault, like a crashing fuzz target.
    #[default]
    StopOnFirstFault,
    /// Replay every message and record all faults.
    Continue,
}

/// Top-level immutable configuration for one decode/replay iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Upper bound on decoded messages.
    pub max_messages: usize,
    /// Upper bound on one DMA payload; zero is treated as one.
    pub max_dma_transfer: u16,
    /// Replay fault policy.
    pub fault_policy: FaultPolicy,
    /// Size of generated fuzz input buffers.
    pub input_len: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            max_dma_transfer: DEFAULT_MAX_DMA_TRANSFER,
            fault_policy: FaultPolicy::StopOnFirstFault,
            input_len: DEFAULT_INPUT_BYTES,
        }
    }
}

impl HarnessConfig {
    /// Returns a copy with `fault_policy` replaced.
    #[must_use]
    pub const fn with_fault_policy(mut self, fault_policy: FaultPolicy) -> Self {
        self.fault_policy = fault_policy;
        self
    }

    /// Returns a copy with `max_messages` replaced.
    #[must_use]
    pub const fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{FaultPolicy, HarnessConfig, DEFAULT_INPUT_BYTES, DEFAULT_MAX_MESSAGES};

    #[test]
    fn default_config_matches_driver_contract() {
        let config = HarnessConfig::default();
        assert_eq!(config.max_messages, DEFAULT_MAX_MESSAGES);
        assert_eq!(config.input_len, DEFAULT_INPUT_BYTES);
        assert_eq!(config.fault_policy, FaultPolicy::StopOnFirstFault);
    }

    #[test]
    fn partial_json_overrides_keep_defaults() {
        let config: HarnessConfig =
            serde_json::from_str(r#"{ "max_messages": 8, "fault_policy": "continue" }"#)
                .expect("valid harness json");
        assert_eq!(config.max_messages, 8);
        assert_eq!(config.fault_policy, FaultPolicy::Continue);
        assert_eq!(config.input_len, DEFAULT_INPUT_BYTES);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = serde_json::from_str::<HarnessConfig>(r#"{ "max_msgs": 8 }"#);
        assert!(error.is_err());
    }

    #[test]
    fn builders_replace_single_fields() {
        let config = HarnessConfig::default()
            .with_fault_policy(FaultPolicy::Continue)
            .with_max_messages(3);
        assert_eq!(config.fault_policy, FaultPolicy::Continue);
        assert_eq!(config.max_messages, 3);
    }
}
