//! Policy engine
//!
//! Holds a mutable, process-level configuration of required fields per
//! operation and a global minimum-confidence floor. `PolicyEngine` is
//! meant to be wrapped in a single shared instance (typically inside
//! `Arc<RwLock<_>>` by the caller) the same way the teacher treats
//! `ModelRouter` as a process-wide, test-resettable singleton rather than
//! a per-call argument.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::error::{Error, Result};

/// Configuration for the policy engine: required fields per operation and
/// a global minimum confidence floor.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    required_fields: HashMap<String, HashSet<String>>,
    min_confidence: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            required_fields: HashMap::new(),
            min_confidence: 0.0,
        }
    }
}

/// Checks mutation params against the configured policy before any
/// storage I/O happens.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    config: PolicyConfig,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to default configuration (no required fields, zero
    /// confidence floor). Intended for test setup, not runtime mutation.
    pub fn reset_to_defaults(&mut self) {
        self.config = PolicyConfig::default();
    }

    /// Set the global minimum confidence floor.
    pub fn set_min_confidence(&mut self, floor: f64) {
        self.config.min_confidence = floor;
    }

    /// Mark a field as required for a given operation name (e.g. `"store"`,
    /// `"relate"`).
    pub fn require_field(&mut self, op: &str, field: &str) {
        self.config
            .required_fields
            .entry(op.to_string())
            .or_default()
            .insert(field.to_string());
    }

    /// Check params (a JSON object) for `op` against the configured
    /// policy. Rejects with a policy error when a required field is
    /// missing or empty, or when `confidence` is numerically present and
    /// below the floor. Missing confidence is allowed unless the
    /// operation's required list names it.
    pub fn check_policy(&self, op: &str, params: &Value) -> Result<()> {
        if let Some(required) = self.config.required_fields.get(op) {
            for field in required {
                match params.get(field) {
                    None | Some(Value::Null) => {
                        return Err(Error::Policy(format!(
                            "field `{field}` is required for operation `{op}`"
                        )));
                    }
                    Some(Value::String(s)) if s.is_empty() => {
                        return Err(Error::Policy(format!(
                            "field `{field}` is required for operation `{op}`"
                        )));
                    }
                    _ => {}
                }
            }
        }

        if let Some(confidence) = params.get("confidence").and_then(Value::as_f64) {
            if confidence < self.config.min_confidence {
                return Err(Error::Policy(format!(
                    "confidence {confidence} is below the minimum floor {}",
                    self.config.min_confidence
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_required_field_rejected() {
        let mut policy = PolicyEngine::new();
        policy.require_field("store", "source");
        let err = policy
            .check_policy("store", &json!({"topic": "x"}))
            .unwrap_err();
        assert_eq!(err.kind(), "policy");
    }

    #[test]
    fn empty_required_field_rejected() {
        let mut policy = PolicyEngine::new();
        policy.require_field("store", "source");
        let err = policy
            .check_policy("store", &json!({"source": ""}))
            .unwrap_err();
        assert_eq!(err.kind(), "policy");
    }

    #[test]
    fn confidence_below_floor_rejected() {
        let mut policy = PolicyEngine::new();
        policy.set_min_confidence(0.5);
        assert!(policy.check_policy("store", &json!({"confidence": 0.3})).is_err());
        assert!(policy.check_policy("store", &json!({"confidence": 0.8})).is_ok());
    }

    #[test]
    fn missing_confidence_allowed_unless_required() {
        let mut policy = PolicyEngine::new();
        policy.set_min_confidence(0.5);
        assert!(policy.check_policy("store", &json!({})).is_ok());

        policy.require_field("store", "confidence");
        assert!(policy.check_policy("store", &json!({})).is_err());
    }

    #[test]
    fn reset_clears_configuration() {
        let mut policy = PolicyEngine::new();
        policy.require_field("store", "source");
        policy.set_min_confidence(0.9);
        policy.reset_to_defaults();
        assert!(policy.check_policy("store", &json!({})).is_ok());
    }
}
