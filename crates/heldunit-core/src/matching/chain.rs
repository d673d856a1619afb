//! Chain assembly and the path invariant.
//!
//! Held pairs restricted to one identity must form a simple path through
//! the sessions: every unit has at most one held predecessor and at most
//! one held successor. The chain graph makes that checkable instead of
//! assumed.

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

use crate::error::{HeldUnitError, HeldUnitResult};
use crate::types::{CandidatePair, ChainMember, HeldUnitChain, HeldUnitId, UnitKey};

/// Assemble held pairs into per-identity chains, validating that each
/// identity's units form a simple path ordered by session.
///
/// # Errors
/// `MultipleMatches` if any unit participates in more than two held pairs,
/// if a chain closes into a cycle, or if one identity spans disconnected
/// or inconsistently labeled pairs. `Configuration` if a held pair has no
/// identity yet.
pub fn build_chains(pairs: &[CandidatePair]) -> HeldUnitResult<Vec<HeldUnitChain>> {
    let mut graph: UnGraph<(UnitKey, u32), HeldUnitId> = UnGraph::new_undirected();
    let mut nodes: HashMap<UnitKey, NodeIndex> = HashMap::new();

    for pair in pairs.iter().filter(|p| p.held) {
        let id = pair.held_unit_id.ok_or_else(|| {
            HeldUnitError::Configuration(format!(
                "held pair {} -> {} has no identity; assign identities before chaining",
                pair.unit1, pair.unit2
            ))
        })?;
        let a = *nodes
            .entry(pair.unit1.clone())
            .or_insert_with(|| graph.add_node((pair.unit1.clone(), pair.ordinal1)));
        let b = *nodes
            .entry(pair.unit2.clone())
            .or_insert_with(|| graph.add_node((pair.unit2.clone(), pair.ordinal2)));
        graph.add_edge(a, b, id);
    }

    for node in graph.node_indices() {
        let degree = graph.edges(node).count();
        if degree > 2 {
            return Err(HeldUnitError::multiple_matches(format!(
                "unit {} participates in {} held pairs",
                graph[node].0, degree
            )));
        }
    }

    // Group nodes into connected components.
    let mut components = UnionFind::new(graph.node_count());
    for edge in graph.edge_references() {
        components.union(edge.source().index(), edge.target().index());
    }
    let mut by_root: HashMap<usize, Vec<NodeIndex>> = HashMap::new();
    for node in graph.node_indices() {
        by_root
            .entry(components.find(node.index()))
            .or_default()
            .push(node);
    }

    let mut chains = Vec::with_capacity(by_root.len());
    for (root, members) in by_root {
        let edge_count = graph
            .edge_references()
            .filter(|e| components.find(e.source().index()) == root)
            .count();
        if edge_count != members.len() - 1 {
            return Err(HeldUnitError::multiple_matches(format!(
                "held chain with {} units closes into a cycle",
                members.len()
            )));
        }

        let mut ids: Vec<HeldUnitId> = graph
            .edge_references()
            .filter(|e| components.find(e.source().index()) == root)
            .map(|e| *e.weight())
            .collect();
        ids.sort();
        ids.dedup();
        let [id] = ids.as_slice() else {
            return Err(HeldUnitError::multiple_matches(format!(
                "one held chain carries {} identities",
                ids.len()
            )));
        };

        let mut chain_members: Vec<ChainMember> = members
            .iter()
            .map(|&n| ChainMember {
                key: graph[n].0.clone(),
                session_ordinal: graph[n].1,
            })
            .collect();
        chain_members.sort_by(|a, b| (a.session_ordinal, &a.key).cmp(&(b.session_ordinal, &b.key)));
        chains.push(HeldUnitChain {
            id: *id,
            members: chain_members,
        });
    }

    // One path per identity: the same id appearing in two components is a
    // propagation defect.
    chains.sort_by_key(|c| c.id);
    if chains.windows(2).any(|w| w[0].id == w[1].id) {
        return Err(HeldUnitError::multiple_matches(
            "one identity spans disconnected chains",
        ));
    }
    Ok(chains)
}
