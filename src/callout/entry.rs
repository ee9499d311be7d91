/// Call-out entries and lookup results

use crate::callout::alarm::AlarmHandle;
use crate::core::objects::OwnerId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which method on which object a call-out invokes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackRef {
    pub owner: OwnerId,
    pub method: String,
}

impl CallbackRef {
    pub fn new(owner: OwnerId, method: impl Into<String>) -> Self {
        Self {
            owner,
            method: method.into(),
        }
    }
}

/// Payload stored in the alarm table for each call-out
#[derive(Debug, Clone, PartialEq)]
pub struct CallOut {
    pub callback: CallbackRef,
    /// `None` when registered without an argument; `Some(Value::Null)` is
    /// a real argument.
    pub arg: Option<Value>,
}

/// Result of a name or handle lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallOutLookup {
    Found {
        handle: AlarmHandle,
        /// Seconds until it fires
        remaining: f64,
    },
    NotFound,
}

impl CallOutLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, CallOutLookup::Found { .. })
    }

    pub fn remaining(&self) -> Option<f64> {
        match self {
            CallOutLookup::Found { remaining, .. } => Some(*remaining),
            CallOutLookup::NotFound => None,
        }
    }

    pub fn handle(&self) -> Option<AlarmHandle> {
        match self {
            CallOutLookup::Found { handle, .. } => Some(*handle),
            CallOutLookup::NotFound => None,
        }
    }

    /// Remaining time, or `-1.0` when nothing matched
    pub fn as_legacy(&self) -> f64 {
        self.remaining().unwrap_or(-1.0)
    }
}

/// Snapshot of a live call-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutInfo {
    pub handle: AlarmHandle,
    pub owner: OwnerId,
    pub method: String,
    pub remaining: f64,
    /// 0.0 for one-shot
    pub repeat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_accessors() {
        let found = CallOutLookup::Found {
            handle: AlarmHandle(4),
            remaining: 2.5,
        };

        assert!(found.is_found());
        assert_eq!(found.remaining(), Some(2.5));
        assert_eq!(found.handle(), Some(AlarmHandle(4)));
        assert_eq!(found.as_legacy(), 2.5);
    }

    #[test]
    fn test_not_found_legacy_sentinel() {
        let missing = CallOutLookup::NotFound;

        assert!(!missing.is_found());
        assert_eq!(missing.remaining(), None);
        assert_eq!(missing.handle(), None);
        assert_eq!(missing.as_legacy(), -1.0);
    }

    #[test]
    fn test_info_json_omits_absent_argument() {
        let mut info = CallOutInfo {
            handle: AlarmHandle(1),
            owner: OwnerId::new(),
            method: "clean_up".to_string(),
            remaining: 10.0,
            repeat: 0.0,
            arg: None,
        };

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("arg").is_none());

        info.arg = Some(json!(0));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json.get("arg"), Some(&json!(0)));
    }
}
