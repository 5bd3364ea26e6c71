//! Identity registry
//!
//! Maps each original object to the proxy handed out for it, one table per
//! [`ProxyKind`]. Entries hold weak handles on both sides, so the registry
//! never keeps an original (or its proxy) alive. Dead entries are replaced
//! when requested again and swept every `sweep_threshold` insertions.

use hashbrown::HashMap;
use membrane_object::{Object, WeakObject};
use membrane_types::{ObjectId, ProxyKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct Entry {
    original: WeakObject,
    proxy: WeakObject,
}

impl Entry {
    fn live_proxy(&self) -> Option<Object> {
        if !self.original.is_alive() {
            return None;
        }
        self.proxy.upgrade()
    }

    fn is_dead(&self) -> bool {
        !self.original.is_alive() || !self.proxy.is_alive()
    }
}

#[derive(Debug, Default)]
struct Tables {
    reactive: HashMap<ObjectId, Entry>,
    read_only: HashMap<ObjectId, Entry>,
    inserts_since_sweep: usize,
}

impl Tables {
    fn table(&mut self, kind: ProxyKind) -> &mut HashMap<ObjectId, Entry> {
        match kind {
            ProxyKind::Reactive => &mut self.reactive,
            ProxyKind::ReadOnly => &mut self.read_only,
        }
    }

    fn sweep(&mut self) -> usize {
        let before = self.reactive.len() + self.read_only.len();
        self.reactive.retain(|_, entry| !entry.is_dead());
        self.read_only.retain(|_, entry| !entry.is_dead());
        self.inserts_since_sweep = 0;
        before - (self.reactive.len() + self.read_only.len())
    }
}

/// Result of [`Registry::get_or_create`]
#[derive(Debug, Clone)]
pub struct Acquired {
    pub proxy: Object,

    /// True if the proxy came from the registry
    pub hit: bool,

    /// Dead entries dropped by a sweep during this call
    pub swept: usize,
}

/// Statistics about registry usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Entries in the reactive table, dead ones included until swept
    pub reactive_entries: usize,
    /// Entries in the read-only table
    pub read_only_entries: usize,
    /// Requests answered from the registry
    pub hits: u64,
    /// Requests that built a proxy
    pub misses: u64,
}

impl RegistryStats {
    /// Get hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Entries across both tables
    pub fn entries(&self) -> usize {
        self.reactive_entries + self.read_only_entries
    }
}

impl std::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Registry Statistics:")?;
        writeln!(
            f,
            "  Hits: {} | Misses: {} | Hit Rate: {:.1}%",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0
        )?;
        writeln!(
            f,
            "  Entries: {} reactive | {} read-only",
            self.reactive_entries, self.read_only_entries
        )?;
        Ok(())
    }
}

/// Original-to-proxy tables for one membrane
pub struct Registry {
    tables: Mutex<Tables>,
    sweep_threshold: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Registry {
    pub fn new(sweep_threshold: usize) -> Self {
        Registry {
            tables: Mutex::new(Tables::default()),
            sweep_threshold: sweep_threshold.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The live proxy of `kind` registered for `original`, if any
    pub fn lookup(&self, kind: ProxyKind, original: &Object) -> Option<Object> {
        let mut tables = self.tables.lock();
        tables
            .table(kind)
            .get(&original.id())
            .and_then(Entry::live_proxy)
    }

    /// Is `candidate` the registered proxy of `kind` for `original`?
    pub fn is_proxy_of(&self, kind: ProxyKind, original: &Object, candidate: &Object) -> bool {
        self.lookup(kind, original)
            .is_some_and(|proxy| proxy.ptr_eq(candidate))
    }

    /// Return the registered proxy, or build and register one
    ///
    /// Lookup and insertion happen under one lock, so two callers racing on
    /// the same original observe the same proxy. `build` must not call back
    /// into the registry.
    pub fn get_or_create(
        &self,
        kind: ProxyKind,
        original: &Object,
        build: impl FnOnce() -> Object,
    ) -> Acquired {
        let mut tables = self.tables.lock();

        if let Some(proxy) = tables.table(kind).get(&original.id()).and_then(Entry::live_proxy) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Acquired {
                proxy,
                hit: true,
                swept: 0,
            };
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let proxy = build();
        tables.table(kind).insert(
            original.id(),
            Entry {
                original: original.downgrade(),
                proxy: proxy.downgrade(),
            },
        );

        tables.inserts_since_sweep += 1;
        let swept = if tables.inserts_since_sweep >= self.sweep_threshold {
            let swept = tables.sweep();
            tracing::debug!(
                swept,
                reactive = tables.reactive.len(),
                read_only = tables.read_only.len(),
                "swept membrane registry"
            );
            swept
        } else {
            0
        };

        Acquired {
            proxy,
            hit: false,
            swept,
        }
    }

    /// Drop every dead entry now; returns how many were removed
    pub fn purge(&self) -> usize {
        let mut tables = self.tables.lock();
        let swept = tables.sweep();
        tracing::debug!(swept, "purged membrane registry");
        swept
    }

    pub fn stats(&self) -> RegistryStats {
        let tables = self.tables.lock();
        RegistryStats {
            reactive_entries: tables.reactive.len(),
            read_only_entries: tables.read_only.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sweep_threshold", &self.sweep_threshold)
            .field("stats", &self.stats())
            .finish()
    }
}
