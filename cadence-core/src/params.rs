//! Shared parameter registry.
//!
//! A cloneable handle over one lock-protected table, passed explicitly to
//! every subsystem that reads or writes parameters. Lookups that miss return
//! `None` and are treated by callers as "not configured".

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cadence_types::{paths, ParamSpec, ParamValue};

#[derive(Debug, Default)]
struct RegistryInner {
    params: HashMap<String, ParamSpec>,
    /// Directed edges: a change to the key is mirrored onto each target.
    mappings: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ParamRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a parameter. An existing registration keeps its value and
    /// `false` is returned.
    pub fn register(&self, spec: ParamSpec) -> bool {
        let mut inner = self.write();
        if inner.params.contains_key(&spec.path) {
            return false;
        }
        log::debug!(target: "params", "registered {} = {:?}", spec.path, spec.value);
        inner.params.insert(spec.path.clone(), spec);
        true
    }

    pub fn contains(&self, path: &str) -> bool {
        self.read().params.contains_key(path)
    }

    pub fn spec(&self, path: &str) -> Option<ParamSpec> {
        self.read().params.get(path).cloned()
    }

    pub fn get(&self, path: &str) -> Option<ParamValue> {
        self.read().params.get(path).map(|p| p.value.clone())
    }

    pub fn get_f32(&self, path: &str) -> Option<f32> {
        self.read().params.get(path).map(|p| p.value.to_f32())
    }

    /// Set a parameter, coercing to its registered type and bounds. Returns
    /// the stored value, or `None` if the path is not registered.
    pub fn set(&self, path: &str, value: ParamValue) -> Option<ParamValue> {
        let mut inner = self.write();
        let Some(param) = inner.params.get_mut(path) else {
            log::debug!(target: "params", "set on unknown param {}", path);
            return None;
        };
        param.value = param.coerce(value);
        Some(param.value.clone())
    }

    /// Set `path` and every parameter reachable from it through mappings.
    /// Returns the paths that were updated, starting with `path`.
    pub fn set_with_mapped(&self, path: &str, value: ParamValue) -> Vec<String> {
        let mut updated = Vec::new();
        if self.set(path, value.clone()).is_none() {
            return updated;
        }
        updated.push(path.to_string());
        for target in self.mapped_params(path) {
            if self.set(&target, value.clone()).is_some() {
                updated.push(target);
            }
        }
        updated
    }

    pub fn add_mapping(&self, from: &str, to: &str) {
        let mut inner = self.write();
        let targets = inner.mappings.entry(from.to_string()).or_default();
        if !targets.iter().any(|t| t == to) {
            targets.push(to.to_string());
        }
    }

    /// All parameters transitively mapped from `path`, breadth-first, without
    /// `path` itself. Cycles are cut by a visited set.
    pub fn mapped_params(&self, path: &str) -> Vec<String> {
        let inner = self.read();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut out = Vec::new();
        visited.insert(path);
        queue.push_back(path);
        while let Some(current) = queue.pop_front() {
            let Some(targets) = inner.mappings.get(current) else {
                continue;
            };
            for target in targets {
                if visited.insert(target.as_str()) {
                    out.push(target.clone());
                    queue.push_back(target.as_str());
                }
            }
        }
        out
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.read().params.keys().cloned().collect();
        paths.sort();
        paths
    }
}

pub fn is_midi_clock_in(path: &str) -> bool {
    path == paths::MIDI_CLOCK_IN
}

pub fn is_arp_param(path: &str) -> bool {
    paths::ARP_PARAMS.contains(&path)
}

pub fn is_layer_1_param(path: &str) -> bool {
    path.starts_with(paths::LAYER_1_PREFIX)
}
