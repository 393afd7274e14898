//! The static dependency graph between the process-wide services.
//!
//! Accessors resolve their dependencies by calling each other, so a cycle in
//! this graph would show up as a deadlock on first use. The table below is the
//! single place the edges are declared; [resolution_order] checks it for
//! cycles and yields the order in which [crate::Services::warm_up] resolves.

use std::fmt;

use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::Error;

/// Names one of the process-wide services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceName {
    Config,
    Classify,
    NsfwDetector,
    Convert,
    Files,
    Index,
}

impl ServiceName {
    pub const ALL: [ServiceName; 6] = [
        ServiceName::Config,
        ServiceName::Classify,
        ServiceName::NsfwDetector,
        ServiceName::Convert,
        ServiceName::Files,
        ServiceName::Index,
    ];

    /// The services that must be resolved before this one can be constructed.
    pub fn dependencies(self) -> &'static [ServiceName] {
        match self {
            ServiceName::Config => &[],
            ServiceName::Classify
            | ServiceName::NsfwDetector
            | ServiceName::Convert
            | ServiceName::Files => &[ServiceName::Config],
            ServiceName::Index => &[
                ServiceName::Config,
                ServiceName::Classify,
                ServiceName::NsfwDetector,
                ServiceName::Convert,
                ServiceName::Files,
            ],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceName::Config => "config",
            ServiceName::Classify => "classify",
            ServiceName::NsfwDetector => "nsfw_detector",
            ServiceName::Convert => "convert",
            ServiceName::Files => "files",
            ServiceName::Index => "index",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the dependency graph. Edges point from a dependency to the service
/// depending on it.
pub fn dependency_graph() -> DiGraph<ServiceName, ()> {
    build_graph(&ServiceName::ALL, ServiceName::dependencies)
}

/// Returns all services ordered so that every service comes after its
/// dependencies, or [Error::Cycle] if the declared edges contain a cycle.
pub fn resolution_order() -> Result<Vec<ServiceName>, Error> {
    order(&ServiceName::ALL, ServiceName::dependencies)
}

/// Checks a dependency table for cycles. [crate::Services::new] runs this on
/// the declared table.
pub(crate) fn check(dependencies: fn(ServiceName) -> &'static [ServiceName]) -> Result<(), Error> {
    order(&ServiceName::ALL, dependencies).map(drop)
}

fn build_graph(
    nodes: &[ServiceName],
    dependencies: impl Fn(ServiceName) -> &'static [ServiceName],
) -> DiGraph<ServiceName, ()> {
    let mut graph = DiGraph::new();
    let ix: Vec<(ServiceName, NodeIndex)> = nodes
        .iter()
        .map(|name| (*name, graph.add_node(*name)))
        .collect();
    let lookup = |name: ServiceName| ix.iter().find(|(n, _)| *n == name).map(|(_, i)| *i);

    for (name, node) in ix.iter() {
        for dep in dependencies(*name) {
            // dependencies outside the node set are not part of this graph
            if let Some(dep_node) = lookup(*dep) {
                graph.add_edge(dep_node, *node, ());
            }
        }
    }
    graph
}

fn order(
    nodes: &[ServiceName],
    dependencies: impl Fn(ServiceName) -> &'static [ServiceName],
) -> Result<Vec<ServiceName>, Error> {
    let graph = build_graph(nodes, dependencies);
    toposort(&graph, None)
        .map(|sorted| sorted.into_iter().map(|ix| graph[ix]).collect())
        .map_err(|cycle| {
            // report every service on the strongly connected component the
            // offending node belongs to
            let component = kosaraju_scc(&graph)
                .into_iter()
                .find(|scc| scc.contains(&cycle.node_id()))
                .unwrap_or_else(|| vec![cycle.node_id()]);
            let mut names: Vec<ServiceName> = component.into_iter().map(|ix| graph[ix]).collect();
            names.sort();
            Error::Cycle(names)
        })
}
