//! Bounded A* search with beam pruning over the layered graph.
//!
//! The frontier is ordered by `f = g + h` with ties going to the earlier
//! insertion. Expanded search nodes live in an arena ([`SearchTree`]); each
//! stores only its parent's index, so a path is rebuilt by chasing parents.
//!
//! Equivalent partial states are deduplicated by (item, position): a node is
//! only pushed when it improves the best `g` seen for that pair.
//!
//! Beam pruning expands only the `beam_width` cheapest successors of a node.
//! On large pools this can miss the optimum; it keeps the branching factor
//! bounded.

use crate::config::OptimizerConfig;
use crate::constraints::{ConstraintSet, PrefixMembers};
use crate::cost::{total_score, CostModel};
use crate::graph::{GraphNode, PlaylistGraph};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

/// How a search run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Nothing to search
    Empty,
    /// Frontier drained
    Completed,
    /// A complete sequence reached the near-optimal threshold
    EarlyTerminated,
    /// Node budget ran out
    BudgetExhausted,
    /// Set by the optimizer when its chosen sequence still breaks a hard
    /// rule; [`search`] itself never reports it
    Unsatisfiable,
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchOutcome::Empty => "empty",
            SearchOutcome::Completed => "completed",
            SearchOutcome::EarlyTerminated => "early terminated",
            SearchOutcome::BudgetExhausted => "budget exhausted",
            SearchOutcome::Unsatisfiable => "unsatisfiable",
        })
    }
}

/// Search bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub max_nodes: usize,
    pub beam_width: usize,
    pub early_termination_score: f64,
}

impl From<&OptimizerConfig> for SearchParams {
    fn from(config: &OptimizerConfig) -> Self {
        Self {
            max_nodes: config.max_nodes,
            beam_width: config.beam_width,
            early_termination_score: config.early_termination_score,
        }
    }
}

/// An expanded or queued search node
#[derive(Debug, Clone, Copy)]
pub struct SearchNode {
    pub item: usize,
    pub position: usize,
    pub parent: Option<usize>,
    /// Accumulated cost from the first position
    pub g: f64,
    /// Estimated remaining cost
    pub h: f64,
}

impl SearchNode {
    pub fn f(&self) -> f64 {
        self.g + self.h
    }
}

/// Arena of search nodes addressed by index
#[derive(Debug, Default)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
}

impl SearchTree {
    fn push(&mut self, node: SearchNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&SearchNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Items from the root to `index`, in sequence order
    pub fn path(&self, index: usize) -> Vec<usize> {
        let mut path = Vec::new();
        self.path_into(index, &mut path);
        path
    }

    /// Like [`SearchTree::path`], reusing `path`'s allocation
    pub fn path_into(&self, index: usize, path: &mut Vec<usize>) {
        path.clear();
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            let Some(node) = self.nodes.get(i) else { break };
            path.push(node.item);
            cursor = node.parent;
        }
        path.reverse();
    }
}

/// A complete sequence reached by the search
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    /// Arena index of the last node
    pub node: usize,
    pub path_cost: f64,
    /// Path cost plus constraint violation penalty
    pub cost: f64,
    pub hard_violations: usize,
}

#[derive(Debug)]
pub struct SearchReport {
    pub tree: SearchTree,
    /// Complete sequences in discovery order
    pub terminals: Vec<Terminal>,
    pub nodes_explored: usize,
    pub outcome: SearchOutcome,
}

impl SearchReport {
    /// Cheapest terminal, earliest on ties
    pub fn best(&self) -> Option<&Terminal> {
        self.terminals
            .iter()
            .min_by(|a, b| a.cost.total_cmp(&b.cost))
    }
}

/// Frontier entry; ordered so the max-heap pops lowest `f`, then lowest `seq`
#[derive(Debug, Clone, Copy)]
struct FrontierEntry {
    f: f64,
    seq: u64,
    node: usize,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Allowed float drift when comparing accumulated costs
const COST_EPSILON: f64 = 1e-12;

/// Search for low-cost complete sequences.
///
/// Hard constraints prune extended prefixes; soft and preference constraints
/// only add to the terminal cost. The budget is checked once per expansion.
pub fn search(
    graph: &PlaylistGraph,
    cost: &CostModel<'_>,
    constraints: &ConstraintSet,
    params: SearchParams,
) -> SearchReport {
    let mut report = SearchReport {
        tree: SearchTree::default(),
        terminals: Vec::new(),
        nodes_explored: 0,
        outcome: SearchOutcome::Empty,
    };
    if graph.is_empty() {
        return report;
    }

    let length = graph.length();
    let context = cost.context();
    let mut frontier = BinaryHeap::new();
    let mut best_g: HashMap<(usize, usize), f64> = HashMap::new();
    let mut seq: u64 = 0;

    for start in graph.layer(0) {
        let node = SearchNode {
            item: start.item,
            position: 0,
            parent: None,
            g: cost.position_cost(start.item, 0),
            h: cost.heuristic(start.item, 0),
        };
        if !constraints.satisfies_hard(&[start.item], context) {
            continue;
        }
        best_g.insert((node.item, 0), node.g);
        let index = report.tree.push(node);
        frontier.push(FrontierEntry {
            f: node.f(),
            seq,
            node: index,
        });
        seq += 1;
    }

    let mut prefix = Vec::with_capacity(length);
    let mut members = PrefixMembers::new(context.tracks.len());
    let mut candidates = Vec::new();

    report.outcome = loop {
        if report.nodes_explored >= params.max_nodes {
            break SearchOutcome::BudgetExhausted;
        }
        let Some(entry) = frontier.pop() else {
            break SearchOutcome::Completed;
        };
        let index = entry.node;
        let node = report.tree.nodes[index];

        // Superseded by a cheaper route to the same (item, position)
        if best_g
            .get(&(node.item, node.position))
            .is_some_and(|&best| best + COST_EPSILON < node.g)
        {
            continue;
        }
        report.nodes_explored += 1;

        members.remove_all(&prefix);
        report.tree.path_into(index, &mut prefix);
        members.insert_all(&prefix);

        if node.position + 1 == length {
            let penalty = constraints.violation_penalty(&prefix, context);
            let terminal = Terminal {
                node: index,
                path_cost: node.g,
                cost: node.g + penalty,
                hard_violations: constraints.hard_violations(&prefix, context),
            };
            let score = total_score(terminal.cost, length);
            log::trace!("Terminal at node {index}: cost {:.4}, score {score:.4}", terminal.cost);
            report.terminals.push(terminal);
            if score >= params.early_termination_score {
                break SearchOutcome::EarlyTerminated;
            }
            continue;
        }

        let here = GraphNode {
            item: node.item,
            position: node.position,
        };
        candidates.clear();
        for next in graph.successors(here) {
            prefix.push(next.item);
            let allowed = constraints.admits(&prefix, &members, context);
            prefix.pop();
            if allowed {
                let step = cost.edge_cost(&prefix, next.item, next.position);
                candidates.push((step, next.item, next.position));
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        candidates.truncate(params.beam_width);

        log::trace!(
            "Expanding item {} at position {} (g {:.4}): {} successors",
            node.item,
            node.position,
            node.g,
            candidates.len()
        );

        for &(step, item, position) in &candidates {
            let g = node.g + step;
            if best_g
                .get(&(item, position))
                .is_some_and(|&best| best <= g + COST_EPSILON)
            {
                continue;
            }
            best_g.insert((item, position), g);
            let child = SearchNode {
                item,
                position,
                parent: Some(index),
                g,
                h: cost.heuristic(item, position),
            };
            let child_index = report.tree.push(child);
            frontier.push(FrontierEntry {
                f: child.f(),
                seq,
                node: child_index,
            });
            seq += 1;
        }
    };

    log::debug!(
        "Search {}: {} nodes explored, {} complete sequences, best cost {}",
        report.outcome,
        report.nodes_explored,
        report.terminals.len(),
        report
            .best()
            .map_or_else(|| "-".to_string(), |t| format!("{:.4}", t.cost))
    );
    report
}
