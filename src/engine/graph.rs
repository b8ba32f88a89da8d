//! Bundle dependency graph and topological ordering.

use std::collections::HashMap;

use crate::error::RegistryError;
use crate::registry::BundleRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    Visiting,
    Visited,
}

/// Directed graph over bundle names, built from registry dependency edges.
///
/// Edges point from a bundle to the bundles it depends on.  Node and edge
/// iteration follow registry declaration order, which makes every ordering
/// produced here reproducible.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    adjacency: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Snapshot the dependency edges of every registered bundle.
    #[must_use]
    pub fn new(registry: &BundleRegistry) -> Self {
        let nodes = registry.names().map(str::to_string).collect();
        let adjacency = registry
            .iter()
            .map(|b| (b.name.clone(), b.dependencies.clone()))
            .collect();
        Self { nodes, adjacency }
    }

    /// Order `subset` so that every bundle follows all of its transitive
    /// dependencies.
    ///
    /// Dependencies outside `subset` are pulled in.  Bundles are visited in
    /// the order given, and their dependencies in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownBundle`] if the subset or any reached
    /// edge names an unregistered bundle, and
    /// [`RegistryError::CyclicDependency`] (carrying the cycle path) if a
    /// cycle is reachable.
    pub fn topological_order<S: AsRef<str>>(
        &self,
        subset: &[S],
    ) -> Result<Vec<String>, RegistryError> {
        let mut states: HashMap<&str, VisitState> = self
            .nodes
            .iter()
            .map(|n| (n.as_str(), VisitState::Unvisited))
            .collect();
        let mut stack = Vec::new();
        let mut order = Vec::new();

        for name in subset {
            let name = name.as_ref();
            let Some((key, _)) = self.adjacency.get_key_value(name) else {
                return Err(RegistryError::UnknownBundle(name.to_string()));
            };
            self.visit(key, &mut states, &mut stack, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'g>(
        &'g self,
        name: &'g str,
        states: &mut HashMap<&'g str, VisitState>,
        stack: &mut Vec<&'g str>,
        order: &mut Vec<String>,
    ) -> Result<(), RegistryError> {
        match states.get(name).copied() {
            Some(VisitState::Visited) => return Ok(()),
            Some(VisitState::Visiting) => {
                let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<String> = stack
                    .get(start..)
                    .unwrap_or_default()
                    .iter()
                    .map(|n| (*n).to_string())
                    .collect();
                cycle.push(name.to_string());
                return Err(RegistryError::CyclicDependency(cycle));
            }
            Some(VisitState::Unvisited) => {}
            None => return Err(RegistryError::UnknownBundle(name.to_string())),
        }

        states.insert(name, VisitState::Visiting);
        stack.push(name);
        for dep in self.dependencies_of(name).unwrap_or_default() {
            self.visit(dep, states, stack, order)?;
        }
        stack.pop();
        states.insert(name, VisitState::Visited);
        order.push(name.to_string());
        Ok(())
    }

    /// Direct dependencies of `name`, in declaration order.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Option<&[String]> {
        self.adjacency.get(name).map(Vec::as_slice)
    }

    /// Bundles that depend directly on `name`, in declaration order.
    #[must_use]
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| {
                self.adjacency
                    .get(n.as_str())
                    .is_some_and(|deps| deps.iter().any(|d| d == name))
            })
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::registry::Bundle;

    fn graph(bundles: Vec<Bundle>) -> DependencyGraph {
        DependencyGraph::new(&BundleRegistry::load(bundles).unwrap())
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    // -----------------------------------------------------------------------
    // topological_order
    // -----------------------------------------------------------------------

    #[test]
    fn pulls_in_dependencies_outside_subset() {
        let g = graph(vec![
            Bundle::new("base"),
            Bundle::new("shell").depends_on(&["base"]),
        ]);
        assert_eq!(g.topological_order(&["shell"]).unwrap(), vec!["base", "shell"]);
    }

    #[test]
    fn diamond_orders_each_bundle_once() {
        let g = graph(vec![
            Bundle::new("d").depends_on(&["b", "c"]),
            Bundle::new("b").depends_on(&["a"]),
            Bundle::new("c").depends_on(&["a"]),
            Bundle::new("a"),
        ]);
        insta::assert_debug_snapshot!(g.topological_order(&["d"]).unwrap(), @r#"
        [
            "a",
            "b",
            "c",
            "d",
        ]
        "#);
    }

    #[test]
    fn every_bundle_follows_its_dependencies() {
        let g = graph(vec![
            Bundle::new("desktop").depends_on(&["shell", "fonts"]),
            Bundle::new("fonts"),
            Bundle::new("shell").depends_on(&["base"]),
            Bundle::new("base"),
            Bundle::new("editor").depends_on(&["base"]),
        ]);
        let all = ["desktop", "fonts", "shell", "base", "editor"];
        let order = g.topological_order(&all).unwrap();
        assert_eq!(order.len(), all.len());
        for name in all {
            for dep in g.dependencies_of(name).unwrap() {
                assert!(
                    position(&order, dep) < position(&order, name),
                    "{dep} must precede {name} in {order:?}"
                );
            }
        }
    }

    #[test]
    fn order_is_deterministic() {
        let make = || {
            graph(vec![
                Bundle::new("x").depends_on(&["z", "y"]),
                Bundle::new("y"),
                Bundle::new("z"),
            ])
        };
        let first = make().topological_order(&["x"]).unwrap();
        for _ in 0..10 {
            assert_eq!(make().topological_order(&["x"]).unwrap(), first);
        }
        assert_eq!(first, vec!["z", "y", "x"]);
    }

    #[test]
    fn two_node_cycle_reports_full_path() {
        let g = graph(vec![
            Bundle::new("a").depends_on(&["b"]),
            Bundle::new("b").depends_on(&["a"]),
        ]);
        assert_eq!(
            g.topological_order(&["a"]).unwrap_err(),
            RegistryError::CyclicDependency(vec!["a".into(), "b".into(), "a".into()])
        );
    }

    #[test]
    fn cycle_path_starts_at_reentered_node() {
        let g = graph(vec![
            Bundle::new("top").depends_on(&["x"]),
            Bundle::new("x").depends_on(&["y"]),
            Bundle::new("y").depends_on(&["z"]),
            Bundle::new("z").depends_on(&["x"]),
        ]);
        let err = g.topological_order(&["top"]).unwrap_err();
        assert_eq!(err.to_string(), "dependency cycle detected: x → y → z → x");
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let g = graph(vec![Bundle::new("a").depends_on(&["a"])]);
        assert_eq!(
            g.topological_order(&["a"]).unwrap_err(),
            RegistryError::CyclicDependency(vec!["a".into(), "a".into()])
        );
    }

    #[test]
    fn dangling_edge_is_unknown_bundle() {
        let g = graph(vec![Bundle::new("a").depends_on(&["ghost"])]);
        assert_eq!(
            g.topological_order(&["a"]).unwrap_err(),
            RegistryError::UnknownBundle("ghost".to_string())
        );
    }

    #[test]
    fn unreached_dangling_edge_is_ignored() {
        let g = graph(vec![
            Bundle::new("a"),
            Bundle::new("broken").depends_on(&["ghost"]),
        ]);
        assert_eq!(g.topological_order(&["a"]).unwrap(), vec!["a"]);
    }

    #[test]
    fn unknown_requested_bundle() {
        let g = graph(vec![Bundle::new("a")]);
        assert!(matches!(
            g.topological_order(&["nope"]),
            Err(RegistryError::UnknownBundle(name)) if name == "nope"
        ));
    }

    // -----------------------------------------------------------------------
    // queries
    // -----------------------------------------------------------------------

    #[test]
    fn dependents_of_lists_direct_dependents() {
        let g = graph(vec![
            Bundle::new("base"),
            Bundle::new("shell").depends_on(&["base"]),
            Bundle::new("editor").depends_on(&["base"]),
            Bundle::new("desktop").depends_on(&["shell"]),
        ]);
        assert_eq!(g.dependents_of("base"), vec!["shell", "editor"]);
        assert!(g.dependents_of("desktop").is_empty());
        assert_eq!(g.dependencies_of("desktop").unwrap(), ["shell"]);
        assert!(g.dependencies_of("missing").is_none());
    }
}
