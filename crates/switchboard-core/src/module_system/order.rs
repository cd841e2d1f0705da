use std::collections::HashMap;

use crate::module_system::handle::{ModuleHandle, ModuleKey};
use crate::module_system::registry::ModuleRegistry;

/// Modules in dependency order, indexed by key for constant-time lookup.
#[derive(Debug, Clone, Default)]
pub struct OrderedModules<'a> {
    sequence: Vec<&'a ModuleHandle>,
    index: HashMap<ModuleKey, usize>,
}

impl<'a> OrderedModules<'a> {
    fn from_sequence(sequence: Vec<&'a ModuleHandle>) -> Self {
        let index = sequence
            .iter()
            .enumerate()
            .map(|(position, handle)| (handle.key().clone(), position))
            .collect();
        Self { sequence, index }
    }

    /// Dependencies before dependents
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &'a ModuleHandle> + '_ {
        self.sequence.iter().copied()
    }

    /// Dependents before dependencies
    pub fn iter_rev(&self) -> impl Iterator<Item = &'a ModuleHandle> + '_ {
        self.sequence.iter().rev().copied()
    }

    pub fn get(&self, key: &ModuleKey) -> Option<&'a ModuleHandle> {
        self.index.get(key).map(|&position| self.sequence[position])
    }

    pub fn position(&self, key: &ModuleKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn keys(&self) -> Vec<ModuleKey> {
        self.sequence.iter().map(|handle| handle.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Order modules so that every module comes after the modules it depends on.
///
/// Modules start out together in the first of N slots. Each pass moves every
/// module that depends on another module of its slot (without that module
/// depending back on it) down to the next slot; the rest stay. Passes stop at
/// the first empty slot or after N-1 passes, then the slots are concatenated.
/// Unrelated modules keep their input order. Mutually dependent modules
/// never separate and stay side by side; longer cycles end up in the last
/// slot, which always terminates but leaves their relative order arbitrary.
pub fn order_modules<'a>(
    registry: &ModuleRegistry,
    modules: Vec<&'a ModuleHandle>,
) -> OrderedModules<'a> {
    let n = modules.len();
    if n < 2 {
        return OrderedModules::from_sequence(modules);
    }

    let mut slots: Vec<Vec<&'a ModuleHandle>> = vec![Vec::new(); n];
    slots[0] = modules;

    for i in 0..n - 1 {
        if slots[i].is_empty() {
            break;
        }

        let mut survivors = Vec::new();
        let mut moved = Vec::new();
        for &a in &slots[i] {
            let depends_within_slot = slots[i].iter().any(|&b| {
                a.key() != b.key()
                    && a.depends_on(b, registry)
                    && !b.depends_on(a, registry)
            });
            if depends_within_slot {
                moved.push(a);
            } else {
                survivors.push(a);
            }
        }

        slots[i] = survivors;
        slots[i + 1].extend(moved);
    }

    let ordered = OrderedModules::from_sequence(slots.into_iter().flatten().collect());
    warn_on_cycles(registry, &ordered);
    ordered
}

fn warn_on_cycles(registry: &ModuleRegistry, ordered: &OrderedModules<'_>) {
    let mut suspects: Vec<String> = Vec::new();
    for (position, a) in ordered.iter().enumerate() {
        let ahead_of_dependency = ordered
            .sequence
            .iter()
            .skip(position + 1)
            .any(|b| a.depends_on(b, registry));
        if ahead_of_dependency {
            suspects.push(a.key().to_string());
        }
    }
    if !suspects.is_empty() {
        log::warn!(
            "Possible module dependency cycle, ordering among these is arbitrary: {}",
            suspects.join(", ")
        );
    }
}
