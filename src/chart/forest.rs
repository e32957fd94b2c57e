use super::{ActiveBack, Chart, ItemKey, PassiveKey};
use crate::cfg::RuleHandle;
use crate::fsa::FsaScorer;
use crate::hypergraph::{nt_symbol, EdgeHandle, HgRule, Hypergraph, NodeHandle, WordId};
use crate::util::Weight;
use fnv::FnvHashMap;

/// One symbol of a recognized right-hand side.
#[derive(Clone, Copy)]
enum Piece<W> {
    Word(WordId, W),
    Child(PassiveKey),
}

struct ForestEdge<W> {
    tails: Vec<NodeHandle>,
    e: Vec<WordId>,
    weight: W,
    rule: RuleHandle,
}

/// A passive item whose node is under construction.
struct Frame<W> {
    key: PassiveKey,
    rank: usize,
    alternatives: Vec<(RuleHandle, Vec<Piece<W>>)>,
    /// The first alternative not yet turned into an edge or skipped.
    next: usize,
    edges: Vec<ForestEdge<W>>,
}

struct ForestBuilder<'c, 'a, W: Weight, S: FsaScorer<W>> {
    chart: &'c Chart<'a, W, S>,
    hg: Hypergraph<W>,
    nodes: FnvHashMap<PassiveKey, Option<NodeHandle>>,
    alternatives: FnvHashMap<ItemKey, Vec<Vec<Piece<W>>>>,
}

impl<'a, W: Weight, S: FsaScorer<W>> Chart<'a, W, S> {
    /// The forest of derivations found by the search: one node per finished
    /// nonterminal item reachable from a goal and one edge per way it was
    /// completed. The last node is a new goal whose edges carry the end of
    /// sentence score and the weight pushed out of the grammar.
    /// `None` if no goal was reached.
    pub fn to_hypergraph(&self) -> Option<Hypergraph<W>> {
        if self.goals.is_empty() {
            return None;
        }
        let mut builder = ForestBuilder {
            chart: self,
            hg: Hypergraph::new(),
            nodes: FnvHashMap::default(),
            alternatives: FnvHashMap::default(),
        };
        let mut tops = Vec::with_capacity(self.goals.len());
        for goal in &self.goals {
            let key = PassiveKey {
                nt: self.cfg.goal_nt,
                q: self.start,
                r: goal.r,
            };
            if let Some(node) = builder.visit(key) {
                tops.push((node, goal.finish));
            }
        }
        if tops.is_empty() {
            return None;
        }
        let mut hg = builder.hg;
        let label = format!("{}[goal]", self.cfg.nt_name(self.cfg.goal_nt));
        let goal = hg.add_node(Some(label));
        for (node, finish) in tops {
            hg.add_edge(
                goal,
                vec![node],
                HgRule::monolingual(vec![nt_symbol(0)]),
                finish * self.cfg.pushed_inside,
            );
        }
        Some(hg)
    }
}

impl<'c, 'a, W: Weight, S: FsaScorer<W>> ForestBuilder<'c, 'a, W, S> {
    /// Adds the node for `key` after the nodes of its children. Only
    /// completions by children finished before `key` become edges, which
    /// keeps every best derivation and leaves the forest acyclic.
    fn visit(&mut self, key: PassiveKey) -> Option<NodeHandle> {
        if let Some(&node) = self.nodes.get(&key) {
            return node;
        }
        let mut stack = vec![self.open_frame(key)];
        while let Some(top) = stack.last() {
            let (rule, pieces) = match top.alternatives.get(top.next) {
                Some(alternative) => alternative,
                None => {
                    if let Some(frame) = stack.pop() {
                        self.close_frame(frame);
                    }
                    continue;
                }
            };
            let mut unvisited = None;
            let mut dead = false;
            for piece in pieces {
                if let Piece::Child(child) = *piece {
                    let earlier = match self.chart.passive.get(&child) {
                        Some(entry) => entry.rank < top.rank,
                        None => false,
                    };
                    match self.nodes.get(&child) {
                        _ if !earlier => dead = true,
                        Some(Some(_)) => (),
                        Some(None) => dead = true,
                        None => unvisited = Some(child),
                    }
                    if dead || unvisited.is_some() {
                        break;
                    }
                }
            }
            if let Some(child) = unvisited {
                let frame = self.open_frame(child);
                stack.push(frame);
                continue;
            }
            let edge = if dead {
                None
            } else {
                Some(self.edge_of(*rule, pieces))
            };
            if let Some(top) = stack.last_mut() {
                top.edges.extend(edge);
                top.next += 1;
            }
        }
        self.nodes.get(&key).cloned().flatten()
    }

    fn open_frame(&mut self, key: PassiveKey) -> Frame<W> {
        let chart = self.chart;
        let mut alternatives = Vec::new();
        let mut rank = 0;
        if let Some(entry) = chart.passive.get(&key) {
            rank = entry.rank;
            for &(active, rule) in &entry.backs {
                for pieces in self.unfold(active) {
                    alternatives.push((rule, pieces));
                }
            }
        }
        Frame {
            key,
            rank,
            alternatives,
            next: 0,
            edges: Vec::new(),
        }
    }

    /// The edge for one alternative whose children all have nodes.
    fn edge_of(&self, rule: RuleHandle, pieces: &[Piece<W>]) -> ForestEdge<W> {
        let mut tails = Vec::new();
        let mut e = Vec::with_capacity(pieces.len());
        let mut weight = self.chart.cfg.rules[rule].p;
        for piece in pieces {
            match *piece {
                Piece::Word(word, score) => {
                    e.push(word);
                    weight = weight * score;
                }
                Piece::Child(child) => {
                    if let Some(&Some(node)) = self.nodes.get(&child) {
                        e.push(nt_symbol(tails.len()));
                        tails.push(node);
                    }
                }
            }
        }
        ForestEdge {
            tails,
            e,
            weight,
            rule,
        }
    }

    fn close_frame(&mut self, frame: Frame<W>) {
        let node = if frame.edges.is_empty() {
            None
        } else {
            let chart = self.chart;
            let key = frame.key;
            let label = format!("{}[{},{}]", chart.cfg.nt_name(key.nt), key.q, key.r);
            let node = self.hg.add_node(Some(label));
            for edge in frame.edges {
                let id: EdgeHandle =
                    self.hg
                        .add_edge(node, edge.tails, HgRule::monolingual(edge.e), edge.weight);
                self.hg.edges[id].features = chart.cfg.rules[edge.rule].f.clone();
            }
            Some(node)
        };
        self.nodes.insert(frame.key, node);
    }

    /// Every sequence of words and completed children that leads to `key`.
    fn unfold(&mut self, key: ItemKey) -> Vec<Vec<Piece<W>>> {
        if let Some(known) = self.alternatives.get(&key) {
            return known.clone();
        }
        let chart = self.chart;
        let mut out = Vec::new();
        if let Some(entry) = chart.active.get(&key) {
            for back in &entry.backs {
                match *back {
                    ActiveBack::Predicted => out.push(Vec::new()),
                    ActiveBack::Scanned { prev, word, score } => {
                        for mut alternative in self.unfold(prev) {
                            alternative.push(Piece::Word(word, score));
                            out.push(alternative);
                        }
                    }
                    ActiveBack::Completed { prev, child } => {
                        for mut alternative in self.unfold(prev) {
                            alternative.push(Piece::Child(child));
                            out.push(alternative);
                        }
                    }
                }
            }
        }
        self.alternatives.insert(key, out.clone());
        out
    }
}
