//! A weighted AND/OR derivation forest, the input and output format of the
//! intersection pipeline.

mod vocab;

pub use self::vocab::Vocabulary;

use crate::util::{product, Weight};
use agenda::{BinaryHeap, Weighted};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A symbol in a right-hand side. Positive values are terminals, values
/// `w <= 0` refer to a nonterminal by `-w`.
pub type WordId = i32;
pub type NodeHandle = usize;
pub type EdgeHandle = usize;

/// Sparse feature values, keyed by feature id.
pub type FeatureVector = BTreeMap<usize, f64>;

pub fn is_terminal(symbol: WordId) -> bool {
    symbol > 0
}

/// The (tail or nonterminal) index of a nonterminal symbol.
pub fn nt_index(symbol: WordId) -> usize {
    (-symbol) as usize
}

/// The symbol that refers to nonterminal (or tail) `index`.
pub fn nt_symbol(index: usize) -> WordId {
    -(index as WordId)
}

/// The synchronous rule of an edge: source side `f`, target side `e`.
/// A symbol `w <= 0` refers to the edge's tail at position `-w`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HgRule {
    pub f: Vec<WordId>,
    pub e: Vec<WordId>,
}

impl HgRule {
    pub fn new(f: Vec<WordId>, e: Vec<WordId>) -> Self {
        HgRule { f, e }
    }

    /// A rule whose source side equals its target side.
    pub fn monolingual(e: Vec<WordId>) -> Self {
        HgRule { f: e.clone(), e }
    }

    pub fn side(&self, target: bool) -> &[WordId] {
        if target {
            &self.e
        } else {
            &self.f
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub in_edges: Vec<EdgeHandle>,
    pub out_edges: Vec<EdgeHandle>,
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge<W> {
    pub head: NodeHandle,
    pub tails: Vec<NodeHandle>,
    pub rule: HgRule,
    pub weight: W,
    pub features: FeatureVector,
}

/// A hypergraph whose last node is the goal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hypergraph<W> {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge<W>>,
}

impl<W> Default for Hypergraph<W> {
    fn default() -> Self {
        Hypergraph {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

/// A tentative best derivation of `node` through `edge`.
struct Candidate<W> {
    node: NodeHandle,
    edge: EdgeHandle,
    weight: W,
}

impl<W: Weight> Weighted for Candidate<W> {
    type Weight = W;

    fn get_weight(&self) -> W {
        self.weight
    }
}

/// A pending piece of the best yield.
enum Yield {
    Word(WordId),
    Node(NodeHandle),
}

impl<W: Weight> Hypergraph<W> {
    pub fn new() -> Self {
        Hypergraph::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn goal(&self) -> Option<NodeHandle> {
        self.nodes.len().checked_sub(1)
    }

    pub fn add_node(&mut self, label: Option<String>) -> NodeHandle {
        self.nodes.push(Node {
            label,
            ..Node::default()
        });
        self.nodes.len() - 1
    }

    /// Adds an edge and links it to its head and tails.
    /// Panics if a node handle is out of range.
    pub fn add_edge(
        &mut self,
        head: NodeHandle,
        tails: Vec<NodeHandle>,
        rule: HgRule,
        weight: W,
    ) -> EdgeHandle {
        let id = self.edges.len();
        self.nodes[head].in_edges.push(id);
        for &t in &tails {
            self.nodes[t].out_edges.push(id);
        }
        self.edges.push(Edge {
            head,
            tails,
            rule,
            weight,
            features: FeatureVector::new(),
        });
        id
    }

    /// Best inside weight of every node together with the edge that achieves
    /// it. Nodes are finished best first, an edge becomes a candidate once
    /// all of its tails are finished. This is exact as long as no weight
    /// exceeds `one`, cycles included.
    pub fn viterbi_inside_edges(&self) -> (Vec<W>, Vec<Option<EdgeHandle>>) {
        let n = self.nodes.len();
        let mut inside = vec![W::zero(); n];
        let mut best = vec![None; n];
        let mut done = vec![false; n];
        let mut missing: Vec<usize> = self.edges.iter().map(|edge| edge.tails.len()).collect();
        let mut uses: Vec<Vec<EdgeHandle>> = vec![Vec::new(); n];
        let mut agenda = BinaryHeap::new();
        for (e, edge) in self.edges.iter().enumerate() {
            for &t in &edge.tails {
                uses[t].push(e);
            }
            if edge.tails.is_empty() && !edge.weight.is_zero() {
                agenda.push(Candidate {
                    node: edge.head,
                    edge: e,
                    weight: edge.weight,
                });
            }
        }

        while let Some(Candidate { node, edge, weight }) = agenda.pop() {
            if done[node] {
                continue;
            }
            done[node] = true;
            inside[node] = weight;
            best[node] = Some(edge);
            for &e in &uses[node] {
                missing[e] -= 1;
                let edge = &self.edges[e];
                if missing[e] > 0 || done[edge.head] {
                    continue;
                }
                let weight = edge.weight * product(edge.tails.iter().map(|&t| inside[t]));
                if !weight.is_zero() {
                    agenda.push(Candidate {
                        node: edge.head,
                        edge: e,
                        weight,
                    });
                }
            }
        }
        (inside, best)
    }

    pub fn viterbi_inside(&self) -> Vec<W> {
        self.viterbi_inside_edges().0
    }

    /// Weight of the best derivation of the goal, zero for an empty forest.
    pub fn viterbi(&self) -> W {
        match self.goal() {
            Some(goal) => self.viterbi_inside()[goal],
            None => W::zero(),
        }
    }

    /// Target string of the best derivation of the goal and its weight.
    pub fn viterbi_yield(&self) -> Option<(Vec<WordId>, W)> {
        let goal = self.goal()?;
        let (inside, best) = self.viterbi_inside_edges();
        if inside[goal].is_zero() {
            return None;
        }
        let mut words = Vec::new();
        let mut stack = vec![Yield::Node(goal)];
        while let Some(top) = stack.pop() {
            let node = match top {
                Yield::Word(w) => {
                    words.push(w);
                    continue;
                }
                Yield::Node(node) => node,
            };
            if let Some(e) = best[node] {
                let edge = &self.edges[e];
                for &symbol in edge.rule.e.iter().rev() {
                    if is_terminal(symbol) {
                        stack.push(Yield::Word(symbol));
                    } else if let Some(&tail) = edge.tails.get(nt_index(symbol)) {
                        stack.push(Yield::Node(tail));
                    }
                }
            }
        }
        Some((words, inside[goal]))
    }
}
