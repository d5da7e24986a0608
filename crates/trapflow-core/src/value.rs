//! Per-event value resolution.
//!
//! A [`ValueResolver`] is built fresh from one trap's variable bindings and
//! answers six resolution modes over an OID, including one level of
//! indirection ("the OID whose value is itself an OID"). Indirection is a
//! two-step resolve so the numeric-OID syntax validation lives in one place.

use crate::error::{TrapflowError, TrapflowResult};
use crate::mib::MibRegistry;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use trapflow_types::VarBinding;

/// The six ways a Select or Copy mod may resolve an OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolveAs {
    /// Literal value of the OID's binding.
    #[default]
    Value,
    /// Full symbolic name of the bound value (which must be a numeric OID).
    ValueStr,
    /// Short name of the bound value (which must be a numeric OID).
    ValueStrShort,
    /// Literal value of the OID pointed at by this OID's value.
    OidValue,
    /// Full symbolic name of the pointed-at OID's value.
    OidValueStr,
    /// Short name of the pointed-at OID's value.
    OidValueStrShort,
}

impl ResolveAs {
    /// The wire spelling used in rule files and the lookup index.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveAs::Value => "value",
            ResolveAs::ValueStr => "value-str",
            ResolveAs::ValueStrShort => "value-str-short",
            ResolveAs::OidValue => "oid.value",
            ResolveAs::OidValueStr => "oid.value-str",
            ResolveAs::OidValueStrShort => "oid.value-str-short",
        }
    }
}

impl fmt::Display for ResolveAs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolveAs {
    type Err = TrapflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value" => Ok(ResolveAs::Value),
            "value-str" => Ok(ResolveAs::ValueStr),
            "value-str-short" => Ok(ResolveAs::ValueStrShort),
            "oid.value" => Ok(ResolveAs::OidValue),
            "oid.value-str" => Ok(ResolveAs::OidValueStr),
            "oid.value-str-short" => Ok(ResolveAs::OidValueStrShort),
            other => Err(TrapflowError::UnknownResolveMode { mode: other.to_string() }),
        }
    }
}

impl Serialize for ResolveAs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResolveAs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Resolves values for one event's variable bindings.
///
/// The binding list is projected into an OID-to-value map; duplicate OIDs
/// collapse last-write-wins, matching the upstream collector's projection.
#[derive(Debug)]
pub struct ValueResolver<'a> {
    vars: HashMap<String, String>,
    registry: &'a MibRegistry,
}

impl<'a> ValueResolver<'a> {
    /// Build a resolver over `bindings` backed by `registry` for naming.
    pub fn new(bindings: &[VarBinding], registry: &'a MibRegistry) -> Self {
        let mut vars = HashMap::with_capacity(bindings.len());
        for binding in bindings {
            vars.insert(binding.oid.clone(), binding.value.clone());
        }
        Self { vars, registry }
    }

    /// Resolve `oid` under `mode`.
    pub fn resolve_as(&self, oid: &str, mode: ResolveAs) -> TrapflowResult<String> {
        match mode {
            ResolveAs::Value => self.value(oid),
            ResolveAs::ValueStr => self.value_str(oid),
            ResolveAs::ValueStrShort => self.value_str_short(oid),
            ResolveAs::OidValue => self.oid_value(oid),
            ResolveAs::OidValueStr => self.oid_value_str(oid),
            ResolveAs::OidValueStrShort => self.oid_value_str_short(oid),
        }
    }

    /// Literal value bound to `oid`.
    pub fn value(&self, oid: &str) -> TrapflowResult<String> {
        self.vars
            .get(oid)
            .cloned()
            .ok_or_else(|| TrapflowError::OidNotFound { oid: oid.to_string() })
    }

    /// Full symbolic name of the value bound to `oid`.
    pub fn value_str(&self, oid: &str) -> TrapflowResult<String> {
        let val = self.num_oid(oid)?;
        Ok(self.registry.string(&val))
    }

    /// Short name of the value bound to `oid`.
    pub fn value_str_short(&self, oid: &str) -> TrapflowResult<String> {
        let val = self.num_oid(oid)?;
        Ok(self.registry.short_string(&val))
    }

    /// Literal value of the OID pointed at by `ptr`'s value.
    pub fn oid_value(&self, ptr: &str) -> TrapflowResult<String> {
        let oid = self.value(ptr)?;
        self.value(&oid)
    }

    /// Full symbolic name of the pointed-at OID's value.
    pub fn oid_value_str(&self, ptr: &str) -> TrapflowResult<String> {
        let oid = self.num_oid(ptr)?;
        self.value_str(&oid)
    }

    /// Short name of the pointed-at OID's value.
    pub fn oid_value_str_short(&self, ptr: &str) -> TrapflowResult<String> {
        let oid = self.num_oid(ptr)?;
        self.value_str_short(&oid)
    }

    /// Validate that the value bound to `oid` is itself a dotted numeric
    /// OID and return it. The token before the first dot is ignored so
    /// values with a leading dot validate on their numeric tail.
    fn num_oid(&self, oid: &str) -> TrapflowResult<String> {
        let val = self.value(oid)?;
        let not_numeric = || TrapflowError::NotNumericOid {
            oid: oid.to_string(),
            value: val.clone(),
        };

        let nodes: Vec<&str> = val.split('.').skip(1).collect();
        if nodes.len() <= 1 {
            return Err(not_numeric());
        }
        for node in &nodes {
            if node.parse::<i64>().is_err() {
                return Err(not_numeric());
            }
        }
        Ok(val)
    }
}
