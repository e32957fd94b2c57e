//! A prefix trie over the right-hand sides of a grammar, stored in an arena.
//!
//! Every nonterminal has an entry node below the shared root. Walking the
//! symbols of a right-hand side from the entry node ends in a node with a
//! final edge for the rule. Each node knows the best rule weight reachable
//! from it; once built, edge weights are *telescoped*: an edge stores the
//! ratio between the bound of its destination (or its rule weight, for a
//! final edge) and the bound of its source, so the product of the deltas
//! along a path times the entry bound is the weight of what the path reaches.

use crate::cfg::{Cfg, NtHandle, RuleHandle};
use crate::error::{Error, Result};
use crate::hypergraph::{nt_index, nt_symbol, WordId};
use crate::util::{ratio, Weight};
use agenda::{BinaryHeap, Weighted};
use fnv::FnvHashMap;
use std::cmp::Ordering;
use tracing::{debug, debug_span};

pub type NodeId = usize;

pub const ROOT: NodeId = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrieLhs {
    Root,
    Nt(NtHandle),
}

#[derive(Clone, Debug, PartialEq)]
pub enum TrieEdge<W> {
    Symbol { symbol: WordId, dest: NodeId, p: W },
    /// A rule completes here.
    Final { rule: RuleHandle, p: W },
}

impl<W: Weight> TrieEdge<W> {
    pub fn p(&self) -> W {
        match *self {
            TrieEdge::Symbol { p, .. } | TrieEdge::Final { p, .. } => p,
        }
    }

    pub fn is_final(&self) -> bool {
        match self {
            TrieEdge::Final { .. } => true,
            TrieEdge::Symbol { .. } => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PrefixTrieNode<W> {
    pub lhs: TrieLhs,
    /// Best weight of a rule reachable from here.
    pub p: W,
    /// Sorted from best to worst delta once the trie is built.
    pub edges: Vec<TrieEdge<W>>,
    children: FnvHashMap<WordId, usize>,
}

impl<W: Weight> PrefixTrieNode<W> {
    fn new(lhs: TrieLhs) -> Self {
        PrefixTrieNode {
            lhs,
            p: W::zero(),
            edges: Vec::new(),
            children: FnvHashMap::default(),
        }
    }

    fn improve(&mut self, p: W) {
        if p > self.p {
            self.p = p;
        }
    }

    /// The nonterminal whose rules this node belongs to.
    pub fn nt(&self) -> Option<NtHandle> {
        match self.lhs {
            TrieLhs::Nt(nt) => Some(nt),
            TrieLhs::Root => None,
        }
    }
}

/// The prefix trie of one grammar. Dropping it drops every node.
#[derive(Clone, Debug)]
pub struct PrefixTrie<W> {
    nodes: Vec<PrefixTrieNode<W>>,
    lhs2: Vec<Option<NodeId>>,
    names: Vec<String>,
}

impl<W: Weight> PrefixTrie<W> {
    /// An empty trie for the nonterminals of `cfg`.
    pub fn new(cfg: &Cfg<W>) -> Self {
        PrefixTrie {
            nodes: vec![PrefixTrieNode::new(TrieLhs::Root)],
            lhs2: Vec::new(),
            names: (0..cfg.nts.len()).map(|nt| cfg.nt_name(nt)).collect(),
        }
    }

    fn malformed(&self, nt: NtHandle) -> Error {
        Error::MalformedGrammar {
            nt,
            name: self.names.get(nt).cloned().unwrap_or_else(|| nt.to_string()),
        }
    }

    /// Compiles every rule of every nonterminal that has rules.
    pub fn from_cfg(cfg: &Cfg<W>) -> Result<Self> {
        let _span = debug_span!("trie_build", nts = cfg.nts.len(), rules = cfg.rules.len()).entered();
        let mut trie = PrefixTrie::new(cfg);
        for nt in 0..cfg.nts.len() {
            if cfg.rules_of(nt).next().is_none() {
                continue;
            }
            let entry = trie.build_lhs(cfg, nt)?;
            for (r, rule) in cfg.rules_of(nt) {
                let mut node = entry;
                trie.nodes[node].improve(rule.p);
                for &w in &rule.rhs {
                    node = trie.build(node, w, rule.p);
                }
                trie.set_final(node, r, rule.p);
            }
        }
        trie.done_building();
        trie.index_lhs();
        debug!(nodes = trie.nodes.len(), "built prefix trie");
        Ok(trie)
    }

    /// The root's child for `nt`, created if needed. Fails without touching
    /// the trie if `nt` has no rules.
    pub fn build_lhs(&mut self, cfg: &Cfg<W>, nt: NtHandle) -> Result<NodeId> {
        if nt >= cfg.nts.len() || cfg.rules_of(nt).next().is_none() {
            return Err(self.malformed(nt));
        }
        Ok(self.child(ROOT, nt_symbol(nt), TrieLhs::Nt(nt)))
    }

    fn child(&mut self, node: NodeId, symbol: WordId, lhs: TrieLhs) -> NodeId {
        if let Some(&e) = self.nodes[node].children.get(&symbol) {
            if let TrieEdge::Symbol { dest, .. } = self.nodes[node].edges[e] {
                return dest;
            }
        }
        let dest = self.nodes.len();
        self.nodes.push(PrefixTrieNode::new(lhs));
        let parent = &mut self.nodes[node];
        parent.children.insert(symbol, parent.edges.len());
        parent.edges.push(TrieEdge::Symbol {
            symbol,
            dest,
            p: W::zero(),
        });
        dest
    }

    /// Follows (or adds) the edge for `symbol` on the way to a rule of
    /// weight `p`.
    pub fn build(&mut self, node: NodeId, symbol: WordId, p: W) -> NodeId {
        let lhs = self.nodes[node].lhs;
        let dest = self.child(node, symbol, lhs);
        self.nodes[dest].improve(p);
        dest
    }

    pub fn set_final(&mut self, node: NodeId, rule: RuleHandle, p: W) {
        let node = &mut self.nodes[node];
        node.improve(p);
        node.edges.push(TrieEdge::Final { rule, p });
    }

    /// Telescopes and sorts the edges of every node, children before parents.
    pub fn done_building(&mut self) {
        // children always have larger ids than their parents
        for id in (0..self.nodes.len()).rev() {
            let bound = self.nodes[id].p;
            let mut edges = std::mem::replace(&mut self.nodes[id].edges, Vec::new());
            for edge in &mut edges {
                match edge {
                    TrieEdge::Symbol { dest, p, .. } => *p = ratio(self.nodes[*dest].p, bound),
                    TrieEdge::Final { p, .. } => *p = ratio(*p, bound),
                }
            }
            edges.sort_by(|a, b| b.p().cmp(&a.p()));
            let node = &mut self.nodes[id];
            node.edges = edges;
            node.children = FnvHashMap::default();
        }
    }

    /// Fills the direct entry table from the root's children.
    pub fn index_lhs(&mut self) {
        self.lhs2 = vec![None; self.names.len()];
        for edge in &self.nodes[ROOT].edges {
            if let TrieEdge::Symbol { symbol, dest, .. } = *edge {
                if let Some(slot) = self.lhs2.get_mut(nt_index(symbol)) {
                    *slot = Some(dest);
                }
            }
        }
    }

    /// The entry node of `nt`.
    pub fn entry(&self, nt: NtHandle) -> Result<NodeId> {
        self.lhs2
            .get(nt)
            .cloned()
            .flatten()
            .ok_or_else(|| self.malformed(nt))
    }

    pub fn node(&self, id: NodeId) -> &PrefixTrieNode<W> {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// The rules of `nt` whose right-hand side is exactly `rhs`, with their
    /// weights recovered from the deltas along the path.
    pub fn lookup(&self, nt: NtHandle, rhs: &[WordId]) -> Result<Vec<(RuleHandle, W)>> {
        let entry = self.entry(nt)?;
        let mut node = entry;
        let mut w = self.nodes[entry].p;
        for &symbol in rhs {
            let next = self.nodes[node].edges.iter().find_map(|edge| match *edge {
                TrieEdge::Symbol { symbol: s, dest, p } if s == symbol => Some((dest, p)),
                _ => None,
            });
            match next {
                Some((dest, p)) => {
                    node = dest;
                    w = w * p;
                }
                None => return Ok(Vec::new()),
            }
        }
        Ok(self.nodes[node]
            .edges
            .iter()
            .filter_map(|edge| match *edge {
                TrieEdge::Final { rule, p } => Some((rule, w * p)),
                TrieEdge::Symbol { .. } => None,
            })
            .collect())
    }

    /// The rules of `nt`, best first.
    pub fn completions(&self, nt: NtHandle) -> Result<Completions<'_, W>> {
        let entry = self.entry(nt)?;
        let mut heap = BinaryHeap::new();
        heap.push(Pending::Node(entry, self.nodes[entry].p));
        Ok(Completions { trie: self, heap })
    }
}

enum Pending<W> {
    Node(NodeId, W),
    Rule(RuleHandle, W),
}

impl<W: Weight> Weighted for Pending<W> {
    type Weight = PendingPriority<W>;

    fn get_weight(&self) -> PendingPriority<W> {
        match *self {
            Pending::Node(_, w) => PendingPriority(w, false),
            Pending::Rule(_, w) => PendingPriority(w, true),
        }
    }
}

/// Completed rules win ties against nodes with the same bound.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PendingPriority<W>(W, bool);

impl<W: Ord> PartialOrd for PendingPriority<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<W: Ord> Ord for PendingPriority<W> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Best-first enumeration of the rules of one nonterminal, see
/// `PrefixTrie::completions`.
pub struct Completions<'a, W: Weight> {
    trie: &'a PrefixTrie<W>,
    heap: BinaryHeap<Pending<W>>,
}

impl<'a, W: Weight> Iterator for Completions<'a, W> {
    type Item = (RuleHandle, W);

    fn next(&mut self) -> Option<(RuleHandle, W)> {
        while let Some(pending) = self.heap.pop() {
            match pending {
                Pending::Rule(rule, w) => return Some((rule, w)),
                Pending::Node(node, w) => {
                    for edge in &self.trie.nodes[node].edges {
                        self.heap.push(match *edge {
                            TrieEdge::Symbol { dest, p, .. } => Pending::Node(dest, w * p),
                            TrieEdge::Final { rule, p } => Pending::Rule(rule, w * p),
                        });
                    }
                }
            }
        }
        None
    }
}
