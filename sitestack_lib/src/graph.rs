use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::intrinsics::referenced_ids;
use crate::template::Template;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("'{from}' references '{to}', which is not declared")]
    UnknownReference { from: String, to: String },
    #[error("Dependency cycle between: {}", .0.join(", "))]
    Cycle(Vec<String>),
    #[error("'{0}' is declared more than once")]
    DuplicateNode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeKind {
    /// a template parameter. Values that were looked up
    /// (eg: an existing hosted zone) are carried as parameters.
    Parameter,
    Resource,
    /// work performed after the stack is applied, eg: uploading assets.
    Action,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    depends_on: BTreeSet<String>,
}

/// dependency graph over the logical ids of a declaration.
/// Edges point from a node to the nodes it depends on.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: BTreeMap<String, Node>,
}

impl ResourceGraph {
    pub fn from_template(template: &Template) -> Result<Self, GraphError> {
        let mut graph = Self::default();
        for name in template.parameters.keys() {
            graph.add_node(name, NodeKind::Parameter, std::iter::empty())?;
        }
        for (name, resource) in template.resources.iter() {
            let mut deps = referenced_ids(&resource.properties);
            deps.extend(resource.depends_on.iter().cloned());
            graph.add_node(name, NodeKind::Resource, deps)?;
        }
        for (name, output) in template.outputs.iter() {
            for to in referenced_ids(&output.value) {
                if !graph.nodes.contains_key(&to) {
                    return Err(GraphError::UnknownReference { from: format!("Outputs.{name}"), to });
                }
            }
        }
        Ok(graph)
    }

    pub fn add_node<I: IntoIterator<Item = String>>(&mut self, name: &str, kind: NodeKind, depends_on: I) -> Result<(), GraphError> {
        if self.nodes.contains_key(name) {
            return Err(GraphError::DuplicateNode(name.to_string()));
        }
        let depends_on = depends_on.into_iter().collect();
        self.nodes.insert(name.to_string(), Node { kind, depends_on });
        Ok(())
    }

    pub fn kind(&self, name: &str) -> Option<NodeKind> {
        self.nodes.get(name).map(|n| n.kind)
    }

    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.nodes.get(name).map(|n| &n.depends_on)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// every node, ordered such that each node comes after everything it depends on.
    /// Ties are broken by name so the order is stable across runs.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        let mut remaining: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (name, node) in self.nodes.iter() {
            for dep in node.depends_on.iter() {
                if !self.nodes.contains_key(dep) {
                    return Err(GraphError::UnknownReference { from: name.clone(), to: dep.clone() });
                }
                dependents.entry(dep.as_str()).or_default().push(name.as_str());
            }
            remaining.insert(name.as_str(), node.depends_on.len());
        }

        let mut ready: BTreeSet<&str> = remaining.iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(next) = ready.pop_first() {
            order.push(next.to_string());
            for &dependent in dependents.get(next).map(Vec::as_slice).unwrap_or_default() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck = remaining.into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(GraphError::Cycle(stuck));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn orders_dependencies_first() {
        let mut g = ResourceGraph::default();
        g.add_node("Records", NodeKind::Resource, deps(&["Dist"])).unwrap();
        g.add_node("Dist", NodeKind::Resource, deps(&["Bucket", "Cert"])).unwrap();
        g.add_node("Cert", NodeKind::Resource, deps(&["Zone"])).unwrap();
        g.add_node("Zone", NodeKind::Parameter, deps(&[])).unwrap();
        g.add_node("Bucket", NodeKind::Resource, deps(&[])).unwrap();
        let order = g.topological_order().unwrap();
        assert_eq!(order, vec!["Bucket", "Zone", "Cert", "Dist", "Records"]);
    }

    #[test]
    fn detects_cycles() {
        let mut g = ResourceGraph::default();
        g.add_node("A", NodeKind::Resource, deps(&["B"])).unwrap();
        g.add_node("B", NodeKind::Resource, deps(&["A"])).unwrap();
        g.add_node("C", NodeKind::Resource, deps(&[])).unwrap();
        assert_eq!(g.topological_order().unwrap_err(), GraphError::Cycle(deps(&["A", "B"])));
    }

    #[test]
    fn detects_unknown_references() {
        let mut g = ResourceGraph::default();
        g.add_node("A", NodeKind::Resource, deps(&["Missing"])).unwrap();
        assert_eq!(g.topological_order().unwrap_err(), GraphError::UnknownReference {
            from: "A".into(), to: "Missing".into(),
        });
    }

    #[test]
    fn rejects_duplicate_nodes() {
        let mut g = ResourceGraph::default();
        g.add_node("A", NodeKind::Resource, deps(&[])).unwrap();
        assert!(g.add_node("A", NodeKind::Action, deps(&[])).is_err());
    }
}
