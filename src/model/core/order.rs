//! Dependency-ordered scheduling of coordinate keys.
//!
//! Conditional data gives some coordinates' distributions runtime inputs
//! computed from other coordinates, which constrains the order in which
//! coordinates can be sampled: every dependency must be drawn before its
//! dependent. [`resolve_order`] computes such an order with Kahn's
//! algorithm using declaration-order tie-breaking, so the result is
//! deterministic and keys without dependencies come first in declaration
//! order. Cycles are reported explicitly, naming the keys left
//! unresolved; there is no iteration budget — termination follows from
//! the no-progress test, sized to the graph.
//!
//! Direct 2-cycles are additionally rejected at component construction
//! through [`check_two_cycles`], before any order is ever requested.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::core::coords::CoordKey;
use crate::model::core::naming::coord_label;
use crate::model::errors::{ModelError, ModelResult};

/// The conditional-data wiring: per dependent key, argument → source
/// coordinate name.
pub type ConditionalWiring = BTreeMap<CoordKey, BTreeMap<String, String>>;

/// Names a key depends on through the wiring (empty if unwired).
fn dependencies<'a>(wiring: &'a ConditionalWiring, key: &CoordKey) -> BTreeSet<&'a str> {
    wiring.get(key).map(|args| args.values().map(String::as_str).collect()).unwrap_or_default()
}

/// Reject direct 2-cycles (including self-dependencies) at construction.
///
/// A 2-cycle exists when key `A` reads a coordinate of key `B` while `B`
/// reads a coordinate of `A`; a key reading one of its own coordinates
/// is the degenerate `A == B` case.
pub fn check_two_cycles(keys: &[CoordKey], wiring: &ConditionalWiring) -> ModelResult<()> {
    for a in keys {
        for source in dependencies(wiring, a) {
            let b = keys
                .iter()
                .find(|k| k.contains(source))
                .expect("conditional sources are validated against declared coordinates");
            if b == a {
                return Err(ModelError::CircularDependency { keys: vec![coord_label(a)] });
            }
            let b_reads_a = dependencies(wiring, b).iter().any(|s| a.contains(s));
            if b_reads_a {
                return Err(ModelError::CircularDependency {
                    keys: vec![coord_label(a), coord_label(b)],
                });
            }
        }
    }
    Ok(())
}

/// Total order over `keys` in which every dependency precedes its
/// dependents.
///
/// Keys with no dependencies are placed first, in declaration order;
/// remaining keys are appended by repeated declaration-order scans as
/// their dependencies become satisfied.
///
/// # Errors
/// - [`ModelError::CircularDependency`] naming the unresolved keys when
///   a scan makes no progress while keys remain.
pub fn resolve_order(keys: &[CoordKey], wiring: &ConditionalWiring) -> ModelResult<Vec<CoordKey>> {
    let mut order: Vec<CoordKey> = Vec::with_capacity(keys.len());
    let mut placed_names: BTreeSet<&str> = BTreeSet::new();
    let mut remaining: Vec<&CoordKey> = Vec::new();

    for key in keys {
        if dependencies(wiring, key).is_empty() {
            order.push(key.clone());
            placed_names.extend(key.names().iter().map(String::as_str));
        } else {
            remaining.push(key);
        }
    }

    while !remaining.is_empty() {
        let mut progressed = false;
        remaining.retain(|key| {
            let satisfied = dependencies(wiring, key).iter().all(|dep| placed_names.contains(dep));
            if satisfied {
                order.push((*key).clone());
                placed_names.extend(key.names().iter().map(String::as_str));
                progressed = true;
            }
            !satisfied
        });
        if !progressed {
            return Err(ModelError::CircularDependency {
                keys: remaining.iter().map(|k| coord_label(k)).collect(),
            });
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(entries: &[(&CoordKey, &[(&str, &str)])]) -> ConditionalWiring {
        entries
            .iter()
            .map(|(key, args)| {
                let map =
                    args.iter().map(|(a, s)| (a.to_string(), s.to_string())).collect::<BTreeMap<_, _>>();
                ((*key).clone(), map)
            })
            .collect()
    }

    #[test]
    fn unwired_keys_keep_declaration_order() {
        let keys = vec![CoordKey::single("phi1"), CoordKey::single("phi2"), CoordKey::single("pm1")];
        let order = resolve_order(&keys, &ConditionalWiring::new()).unwrap();
        assert_eq!(order, keys);
    }

    #[test]
    fn dependencies_precede_their_dependents() {
        // pm1 reads phi1; phi2 reads pm1. Declared in the reverse order.
        let phi2 = CoordKey::single("phi2");
        let pm1 = CoordKey::single("pm1");
        let phi1 = CoordKey::single("phi1");
        let keys = vec![phi2.clone(), pm1.clone(), phi1.clone()];
        let wiring = wire(&[(&phi2, &[("loc_x", "pm1")]), (&pm1, &[("loc_x", "phi1")])]);

        let order = resolve_order(&keys, &wiring).unwrap();
        assert_eq!(order, vec![phi1, pm1, phi2]);
    }

    #[test]
    fn joint_keys_satisfy_dependencies_on_any_member_name() {
        let joint = CoordKey::joint(["phi1", "phi2"]);
        let pm1 = CoordKey::single("pm1");
        let keys = vec![pm1.clone(), joint.clone()];
        let wiring = wire(&[(&pm1, &[("loc_x", "phi1")])]);

        let order = resolve_order(&keys, &wiring).unwrap();
        assert_eq!(order, vec![joint, pm1]);
    }

    #[test]
    fn a_longer_cycle_is_reported_when_ordering_is_requested() {
        let a = CoordKey::single("a");
        let b = CoordKey::single("b");
        let c = CoordKey::single("c");
        let keys = vec![a.clone(), b.clone(), c.clone()];
        let wiring =
            wire(&[(&a, &[("x", "c")]), (&b, &[("x", "a")]), (&c, &[("x", "b")])]);

        // The 3-cycle passes the construction-time 2-cycle check...
        check_two_cycles(&keys, &wiring).unwrap();
        // ...but ordering fails, naming every unresolved key.
        let err = resolve_order(&keys, &wiring).unwrap_err();
        match err {
            ModelError::CircularDependency { keys } => {
                assert_eq!(keys, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }
    }

    #[test]
    fn direct_two_cycles_fail_the_construction_time_check() {
        let a = CoordKey::single("a");
        let b = CoordKey::single("b");
        let keys = vec![a.clone(), b.clone()];
        let wiring = wire(&[(&a, &[("x", "b")]), (&b, &[("x", "a")])]);
        let err = check_two_cycles(&keys, &wiring).unwrap_err();
        assert!(matches!(err, ModelError::CircularDependency { .. }));
    }

    #[test]
    fn self_dependency_is_a_degenerate_two_cycle() {
        let joint = CoordKey::joint(["u", "v"]);
        let keys = vec![joint.clone()];
        let wiring = wire(&[(&joint, &[("x", "u")])]);
        let err = check_two_cycles(&keys, &wiring).unwrap_err();
        assert!(matches!(err, ModelError::CircularDependency { .. }));
    }
}
