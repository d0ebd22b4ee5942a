use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Sentinel returned by [`SymbolInterner::name_of`] for ids that were never
/// registered.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Dense small-integer handle for a symbol. Comparing and hashing ids is a
/// single integer op, vs O(n) for the string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Inner {
    by_name: HashMap<String, SymbolId>,
    names: Vec<String>,
}

/// Bidirectional string <-> id mapping for symbols. Ids are assigned
/// sequentially from 0 on first registration and are stable for the process
/// lifetime.
///
/// Registration is expected during startup; after warmup the hot path only
/// performs reads, so the read-biased lock is effectively uncontended.
#[derive(Debug, Default)]
pub struct SymbolInterner {
    inner: RwLock<Inner>,
}

impl SymbolInterner {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` if absent and return its id.
    pub fn intern(&self, name: &str) -> SymbolId {
        if let Some(&id) = self.inner.read().by_name.get(name) {
            return id;
        }

        let mut inner = self.inner.write();
        // Another thread may have registered between the read and the write.
        if let Some(&id) = inner.by_name.get(name) {
            return id;
        }
        let id = SymbolId(inner.names.len() as u32);
        inner.names.push(name.to_string());
        inner.by_name.insert(name.to_string(), id);
        id
    }

    /// Resolve an id back to its symbol string; `"UNKNOWN"` for foreign ids.
    pub fn name_of(&self, id: SymbolId) -> String {
        self.inner
            .read()
            .names
            .get(id.index())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string())
    }

    /// Look up an id without registering.
    #[inline]
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.inner.read().by_name.get(name).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read().names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
