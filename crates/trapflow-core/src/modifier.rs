//! Label and annotation mutation.
//!
//! A [`Modifier`] applies ordered Set/Copy directives to one string map
//! (labels or annotations) using the event's value resolver. Mods run in
//! declared order; the first failure under `drop` policy halts the rest of
//! the list, while a `send` failure skips only the failing mod.

use crate::error::{TrapflowError, TrapflowResult};
use crate::rules::{Mod, ModKind, OnError};
use crate::value::ValueResolver;
use std::collections::HashMap;
use tracing::debug;

/// Applies mods to one label or annotation map.
pub struct Modifier<'a> {
    map: &'a mut HashMap<String, String>,
    resolver: &'a ValueResolver<'a>,
}

impl<'a> Modifier<'a> {
    /// Create a modifier over `map`, resolving copy sources with `resolver`.
    pub fn new(map: &'a mut HashMap<String, String>, resolver: &'a ValueResolver<'a>) -> Self {
        Self { map, resolver }
    }

    /// Apply `mods` in declared order, stopping at the first propagated
    /// failure.
    pub fn apply(&mut self, mods: &[Mod]) -> TrapflowResult<()> {
        for m in mods {
            match m.kind {
                ModKind::Set => self.set(m)?,
                ModKind::Copy => self.copy(m)?,
            }
        }
        Ok(())
    }

    /// Write `mod.value` under `mod.key` unconditionally. An empty value is
    /// valid; it intentionally clears the key's content.
    pub fn set(&mut self, m: &Mod) -> TrapflowResult<()> {
        if m.kind != ModKind::Set {
            return Err(TrapflowError::InvalidModOp { expected: "set" });
        }
        if m.key.is_empty() {
            return Err(TrapflowError::ModKeyMissing { field: "key" });
        }

        self.map.insert(m.key.clone(), m.value.clone());
        Ok(())
    }

    /// Resolve `mod.oid` under `mod.as` and write the result under
    /// `mod.to_key`, honoring the mod's error policy and optional value map.
    pub fn copy(&mut self, m: &Mod) -> TrapflowResult<()> {
        if m.kind != ModKind::Copy {
            return Err(TrapflowError::InvalidModOp { expected: "copy" });
        }
        if m.oid.is_empty() {
            return Err(TrapflowError::ModKeyMissing { field: "oid" });
        }
        if m.to_key.is_empty() {
            return Err(TrapflowError::ModKeyMissing { field: "to_key" });
        }

        let value = match self.resolver.resolve_as(&m.oid, m.resolve_as) {
            Ok(v) => v,
            Err(err) => {
                if m.on_error == OnError::Drop {
                    return Err(err);
                }
                debug!(oid = %m.oid, to_key = %m.to_key, error = %err, "Copy mod skipped");
                return Ok(());
            }
        };

        if m.map.is_empty() {
            self.map.insert(m.to_key.clone(), value);
            return Ok(());
        }

        // A translation map is present: write only mapped values.
        if let Some(mapped) = m.map.get(&value) {
            self.map.insert(m.to_key.clone(), mapped.clone());
        }
        Ok(())
    }
}
