//! Strongly connected components
//!
//! Tarjan's algorithm with an explicit call stack. Single-wallet components
//! are discarded, so every returned component holds at least two mutually
//! reachable wallets.

use super::graph_builder::TransactionGraph;
use petgraph::graph::NodeIndex;
use tracing::debug;

/// Component analyzer over a transaction graph
#[derive(Debug, Default, Clone, Copy)]
pub struct ComponentAnalyzer;

/// Per-run Tarjan bookkeeping
struct Tarjan {
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    next_index: usize,
    stack: Vec<NodeIndex>,
}

impl Tarjan {
    fn new(n: usize) -> Self {
        Self {
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            next_index: 0,
            stack: Vec::new(),
        }
    }

    fn visit(&mut self, node: NodeIndex) {
        let i = node.index();
        self.index[i] = Some(self.next_index);
        self.lowlink[i] = self.next_index;
        self.next_index += 1;
        self.on_stack[i] = true;
        self.stack.push(node);
    }

    /// Pop the component rooted at `root`
    fn pop_component(&mut self, root: NodeIndex) -> Vec<NodeIndex> {
        let mut component = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack[member.index()] = false;
            component.push(member);
            if member == root {
                break;
            }
        }
        component
    }
}

impl ComponentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Strongly connected components of size >= 2, in completion order.
    /// Members of each component are sorted by node index.
    pub fn strongly_connected(&self, graph: &TransactionGraph) -> Vec<Vec<NodeIndex>> {
        let mut tarjan = Tarjan::new(graph.node_count());
        let mut components = Vec::new();

        for root in graph.node_indices() {
            if tarjan.index[root.index()].is_some() {
                continue;
            }

            // (node, successors, next successor position)
            let mut call_stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
            tarjan.visit(root);
            call_stack.push((root, graph.successors(root), 0));

            while let Some(top) = call_stack.len().checked_sub(1) {
                let (node, pos) = (call_stack[top].0, call_stack[top].2);
                if let Some(&succ) = call_stack[top].1.get(pos) {
                    call_stack[top].2 += 1;

                    match tarjan.index[succ.index()] {
                        None => {
                            tarjan.visit(succ);
                            call_stack.push((succ, graph.successors(succ), 0));
                        }
                        Some(succ_index) if tarjan.on_stack[succ.index()] => {
                            let low = &mut tarjan.lowlink[node.index()];
                            *low = (*low).min(succ_index);
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                call_stack.pop();
                let low = tarjan.lowlink[node.index()];
                if let Some(&(parent, _, _)) = call_stack.last() {
                    let parent_low = &mut tarjan.lowlink[parent.index()];
                    *parent_low = (*parent_low).min(low);
                }

                if Some(low) == tarjan.index[node.index()] {
                    let mut component = tarjan.pop_component(node);
                    if component.len() >= 2 {
                        component.sort();
                        components.push(component);
                    }
                }
            }
        }

        debug!("Found {} non-trivial strongly connected components", components.len());
        components
    }

    /// Components as wallet addresses
    pub fn strongly_connected_addresses(&self, graph: &TransactionGraph) -> Vec<Vec<String>> {
        self.strongly_connected(graph)
            .into_iter()
            .map(|c| c.into_iter().map(|n| graph.address(n).to_string()).collect())
            .collect()
    }
}
