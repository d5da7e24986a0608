//! Error types for the Trapflow correlation engine.
//!
//! Three families matter to callers: value-resolution errors are always local
//! to one Select or Mod evaluation and never propagate past the owning rule;
//! mod-application errors are policy-controlled (`send` swallows, `drop`
//! halts the remaining mods for that map); configuration-integrity errors
//! surface at build/load time and are fatal to process startup.

use thiserror::Error;

/// Error type for all core engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrapflowError {
    /// The event carries no binding for the requested OID.
    #[error("OID not found in trap variables: {oid}")]
    OidNotFound {
        /// OID that was looked up.
        oid: String,
    },

    /// A resolution mode required the bound value to itself be a dotted
    /// numeric OID, and it was not.
    #[error("value of {oid} is not a numeric OID: {value:?}")]
    NotNumericOid {
        /// OID whose value failed validation.
        oid: String,
        /// The offending value.
        value: String,
    },

    /// A resolution-mode string did not name one of the six known modes.
    #[error("unknown resolution mode: {mode:?}")]
    UnknownResolveMode {
        /// The unrecognized mode string.
        mode: String,
    },

    /// A mod was missing a key it requires (`key` for set, `oid`/`to_key`
    /// for copy).
    #[error("mod is missing required field: {field}")]
    ModKeyMissing {
        /// Name of the absent field.
        field: &'static str,
    },

    /// A mod was dispatched to an operation that does not match its kind.
    #[error("invalid mod operation: expected {expected}")]
    InvalidModOp {
        /// The operation the mod should have been routed to.
        expected: &'static str,
    },

    /// A MIB entry with an empty name was rejected at load time.
    #[error("MIB name can't be empty for OID {oid}")]
    EmptyMibName {
        /// OID of the rejected entry.
        oid: String,
    },

    /// The lookup produced a rule-group name that is not in the loaded set.
    #[error("rule group not found: {name}")]
    RuleGroupNotFound {
        /// The missing group name.
        name: String,
    },

    /// A rule's Select list did not match the event. Internal control flow;
    /// callers treat it as "no alert", never as a failure.
    #[error("no select matched")]
    NoSelectMatch,

    /// A rule or MIB source could not be read or parsed at startup.
    #[error("config error: {message}")]
    Config {
        /// Human-readable description including the offending path.
        message: String,
    },
}

impl TrapflowError {
    /// Error category for logging and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            TrapflowError::OidNotFound { .. }
            | TrapflowError::NotNumericOid { .. }
            | TrapflowError::UnknownResolveMode { .. } => "resolution",
            TrapflowError::ModKeyMissing { .. } | TrapflowError::InvalidModOp { .. } => "mod",
            TrapflowError::EmptyMibName { .. }
            | TrapflowError::RuleGroupNotFound { .. }
            | TrapflowError::Config { .. } => "config",
            TrapflowError::NoSelectMatch => "match",
        }
    }

    /// True for errors that are local to a single Select/Mod evaluation and
    /// must not abort sibling rules or sibling events.
    pub fn is_local(&self) -> bool {
        matches!(self.category(), "resolution" | "match")
    }

    /// Create a config error with path context.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}

/// Result type alias for core engine operations.
pub type TrapflowResult<T> = Result<T, TrapflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = TrapflowError::OidNotFound { oid: ".1.2.3".to_string() };
        assert_eq!(err.category(), "resolution");
        assert!(err.is_local());

        let err = TrapflowError::EmptyMibName { oid: "1.2.3".to_string() };
        assert_eq!(err.category(), "config");
        assert!(!err.is_local());

        let err = TrapflowError::ModKeyMissing { field: "key" };
        assert_eq!(err.category(), "mod");
        assert!(!err.is_local());
    }
}
