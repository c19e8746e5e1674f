//! Dependency graph operations over the installed set: closures, leaves, the `obsolete`
//! ignore-closure, and the full uninstall-planning algorithm (the steps in §4.D:
//! actively-ignored closure, raw/hidden/secondary/skipped partition, primary-marker
//! cascade, fixed-point skip propagation).

use std::collections::{HashMap, HashSet};

/// A directed graph of `pkg -> direct dependencies`, plus its reverse (`pkg -> direct
/// dependents`), computed once at construction. Only installed packages appear as keys;
/// an edge's target may or may not itself be a key (a missing dependency).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    forward: HashMap<String, HashSet<String>>,
    reverse: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    pub fn build(edges: HashMap<String, HashSet<String>>) -> Self {
        let mut reverse: HashMap<String, HashSet<String>> = HashMap::new();
        for (pkg, deps) in &edges {
            reverse.entry(pkg.clone()).or_default();
            for dep in deps {
                reverse.entry(dep.clone()).or_default().insert(pkg.clone());
            }
        }
        Self {
            forward: edges,
            reverse,
        }
    }

    fn direct(&self, key: &str) -> HashSet<String> {
        self.forward.get(key).cloned().unwrap_or_default()
    }

    fn direct_dependents(&self, key: &str) -> HashSet<String> {
        self.reverse.get(key).cloned().unwrap_or_default()
    }

    /// Public wrapper for a key's direct dependencies (the `deps --direct` verb).
    pub fn direct_dependencies(&self, key: &str) -> HashSet<String> {
        self.direct(key)
    }

    /// Public wrapper for a key's direct dependents (the `uses` verb).
    pub fn dependents_of(&self, key: &str) -> HashSet<String> {
        self.direct_dependents(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.forward.contains_key(key)
    }

    /// Transitive closure of dependencies reachable from `keys`. `incl_input` decides
    /// whether `keys` themselves are included in the result.
    pub fn get_all(&self, keys: &HashSet<String>, incl_input: bool) -> HashSet<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = keys.iter().cloned().collect();
        if incl_input {
            seen.extend(keys.iter().cloned());
        }
        while let Some(node) = stack.pop() {
            for dep in self.direct(&node) {
                if seen.insert(dep.clone()) {
                    stack.push(dep);
                }
            }
        }
        seen
    }

    /// Nodes in the closure of `keys` with no further dependencies of their own.
    pub fn get_leaves(&self, keys: &HashSet<String>) -> HashSet<String> {
        self.get_all(keys, true)
            .into_iter()
            .filter(|n| self.direct(n).is_empty())
            .collect()
    }

    /// Keys with an empty direct dependency set — nothing they need.
    pub fn direct_end(&self) -> HashSet<String> {
        self.forward
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Installed packages nothing else depends on — the `leaves` verb's result.
    pub fn user_leaves(&self) -> HashSet<String> {
        self.forward
            .keys()
            .filter(|k| self.direct_dependents(k).is_empty())
            .cloned()
            .collect()
    }

    /// Names in `keys` absent from the graph entirely (not installed, not anyone's
    /// dependency).
    pub fn missing(&self, keys: &HashSet<String>) -> HashSet<String> {
        keys.iter()
            .filter(|k| !self.forward.contains_key(k.as_str()))
            .cloned()
            .collect()
    }

    /// Dependency names that appear in `reverse` (something needs them) but not in
    /// `forward` (not actually installed) — broken/missing dependencies.
    pub fn get_missing_dependencies(&self) -> HashSet<String> {
        self.reverse
            .keys()
            .filter(|k| !self.forward.contains_key(k.as_str()))
            .cloned()
            .collect()
    }

    fn filter_difference(&self, keys: &HashSet<String>, other: &HashSet<String>) -> HashSet<String> {
        keys.iter()
            .filter(|k| self.direct(k).difference(other).next().is_some())
            .cloned()
            .collect()
    }

    fn filter_intersection(&self, keys: &HashSet<String>, other: &HashSet<String>) -> HashSet<String> {
        keys.iter()
            .filter(|k| self.direct(k).intersection(other).next().is_some())
            .cloned()
            .collect()
    }

    /// Every node whose entire upward path lies inside `ignore`'s dependency closure —
    /// i.e. safe to treat as if it didn't exist when planning an uninstall. Always a
    /// superset of `ignore` itself.
    pub fn obsolete(&self, ignore: &HashSet<String>) -> HashSet<String> {
        let raw = self.get_all(ignore, true);
        let candidates: HashSet<String> = raw.difference(ignore).cloned().collect();
        let multi_parents = self.filter_difference(&candidates, &raw);
        raw.difference(&multi_parents).cloned().collect()
    }

    /// Plan an uninstall of `delete`, treating `ignore` as already absent. `no_dependencies`
    /// removes exactly `delete` with no orphan cleanup. `is_primary` marks packages the
    /// cascade must never implicitly remove (step 4).
    pub fn collect_uninstall(
        &self,
        delete: &HashSet<String>,
        ignore: &HashSet<String>,
        no_dependencies: bool,
        is_primary: &dyn Fn(&str) -> bool,
    ) -> UninstallPlan {
        let actively_ignored = self.obsolete(ignore);

        if no_dependencies {
            let hidden: HashSet<String> = actively_ignored.union(delete).cloned().collect();
            let warnings: HashSet<String> = delete
                .iter()
                .flat_map(|d| self.direct_dependents(d))
                .filter(|dep| !hidden.contains(dep))
                .collect();
            return UninstallPlan {
                removed: delete.clone(),
                skipped: HashSet::new(),
                warnings,
            };
        }

        let raw_uninstall = self.get_all(delete, true);
        let hidden: HashSet<String> = actively_ignored.union(&raw_uninstall).cloned().collect();
        let secondary: HashSet<String> = raw_uninstall.difference(delete).cloned().collect();
        let mut skipped = self.filter_difference(&secondary, &hidden);
        let mut removed: HashSet<String> = raw_uninstall.difference(&skipped).cloned().collect();

        // step 4: never implicitly remove a primary-marked package pulled in only as an
        // orphaned dependency.
        let demoted: Vec<String> = removed
            .iter()
            .filter(|p| !delete.contains(p.as_str()) && is_primary(p))
            .cloned()
            .collect();
        for p in demoted {
            removed.remove(&p);
            skipped.insert(p);
        }

        // step 5: fixed point — anything remaining in `removed` that now depends on a
        // skipped package must itself become skipped.
        loop {
            let cascade = self.filter_intersection(&removed, &skipped);
            if cascade.is_empty() {
                break;
            }
            for p in &cascade {
                removed.remove(p);
                skipped.insert(p.clone());
            }
        }

        // step 6: drop anything not currently installed.
        removed.retain(|p| self.forward.contains_key(p));

        let warnings: HashSet<String> = delete
            .iter()
            .flat_map(|d| self.direct_dependents(d))
            .filter(|dep| !hidden.contains(dep))
            .collect();

        UninstallPlan {
            removed,
            skipped,
            warnings,
        }
    }
}

/// The result of [`DependencyGraph::collect_uninstall`].
#[derive(Debug, Clone, Default)]
pub struct UninstallPlan {
    /// Packages safe to remove.
    pub removed: HashSet<String>,
    /// Dependencies pulled in transitively but kept back (still needed, or primary).
    pub skipped: HashSet<String>,
    /// Non-ignored dependents of a `delete` member — hard errors unless `force`.
    pub warnings: HashSet<String>,
}
