//! An index-based context-free grammar projected from a hypergraph.
//!
//! Nonterminals and rules live in two tables and refer to each other by
//! index. Inside a right-hand side a symbol `w > 0` is a terminal and `w <= 0`
//! is the nonterminal `-w` (see `hypergraph::nt_index`).

pub mod binarize;
mod display;
mod order;

pub use self::display::{CfgDisplay, RuleDisplay};

use crate::error::{Error, Result};
use crate::hypergraph::{
    is_terminal, nt_index, nt_symbol, EdgeHandle, FeatureVector, Hypergraph, WordId,
};
use crate::util::{product, ratio, Weight};
use fnv::FnvHashMap;
use serde::Deserialize;
use tracing::{debug, debug_span};

pub type NtHandle = usize;
pub type RuleHandle = usize;
pub type Rhs = Vec<WordId>;

/// `lhs` of a rule that has been removed from the grammar.
pub const NULL_LHS: NtHandle = NtHandle::max_value();

/// A symbol of a right-hand side, decoded from its sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RhsSymbol {
    Terminal(WordId),
    Nt(NtHandle),
}

impl From<WordId> for RhsSymbol {
    fn from(w: WordId) -> Self {
        if is_terminal(w) {
            RhsSymbol::Terminal(w)
        } else {
            RhsSymbol::Nt(nt_index(w))
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rule<W> {
    pub lhs: NtHandle,
    pub rhs: Rhs,
    pub p: W,
    pub f: FeatureVector,
    /// The hypergraph edge this rule was read from.
    pub edge: Option<EdgeHandle>,
}

impl<W: Weight> Rule<W> {
    pub fn new(lhs: NtHandle, rhs: Rhs, p: W) -> Self {
        Rule {
            lhs,
            rhs,
            p,
            f: FeatureVector::new(),
            edge: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.lhs == NULL_LHS
    }

    pub fn set_null(&mut self) {
        self.lhs = NULL_LHS;
        self.rhs.clear();
        self.f.clear();
    }

    pub fn symbols(&self) -> impl Iterator<Item = RhsSymbol> + '_ {
        self.rhs.iter().map(|&w| RhsSymbol::from(w))
    }

    pub fn rhs_nts(&self) -> impl Iterator<Item = NtHandle> + '_ {
        self.rhs.iter().filter(|&&w| !is_terminal(w)).map(|&w| nt_index(w))
    }

    /// Renames the nonterminals of the rule by `map`. A nonterminal mapped to
    /// `None` nulls the rule. Returns whether the rule survived.
    fn remap(&mut self, map: &[Option<NtHandle>]) -> bool {
        if self.is_null() {
            return false;
        }
        let lhs = match map.get(self.lhs).cloned().flatten() {
            Some(lhs) => lhs,
            None => {
                self.set_null();
                return false;
            }
        };
        let mut rhs = Vec::with_capacity(self.rhs.len());
        for &w in &self.rhs {
            if is_terminal(w) {
                rhs.push(w);
            } else {
                match map.get(nt_index(w)).cloned().flatten() {
                    Some(n) => rhs.push(nt_symbol(n)),
                    None => {
                        self.set_null();
                        return false;
                    }
                }
            }
        }
        self.lhs = lhs;
        self.rhs = rhs;
        true
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Nt {
    pub ruleids: Vec<RuleHandle>,
    /// Label of the hypergraph node this nonterminal was read from.
    pub from: Option<String>,
    /// Debug name of a virtual nonterminal.
    pub name: Option<String>,
    pub is_virtual: bool,
}

/// How to read a grammar off a hypergraph.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CfgOptions {
    /// Use the target projection of each edge rule (otherwise the source).
    pub target_side: bool,
    pub copy_features: bool,
    /// Normalize rule weights by the best inside weights.
    pub push_weights: bool,
}

impl Default for CfgOptions {
    fn default() -> Self {
        CfgOptions {
            target_side: true,
            copy_features: false,
            push_weights: true,
        }
    }
}

/// A weighted context-free grammar with a single goal nonterminal.
#[derive(Clone, Debug, PartialEq)]
pub struct Cfg<W> {
    pub nts: Vec<Nt>,
    pub rules: Vec<Rule<W>>,
    pub goal_nt: NtHandle,
    /// Best inside weight of the goal in the source hypergraph.
    pub goal_inside: W,
    /// Weight removed from the grammar by pushing, `one` if nothing was pushed.
    pub pushed_inside: W,
    /// Bottom-up order of the nonterminals reachable from the goal.
    pub topo: Vec<NtHandle>,
}

impl<W: Weight> Default for Cfg<W> {
    fn default() -> Self {
        Cfg {
            nts: Vec::new(),
            rules: Vec::new(),
            goal_nt: 0,
            goal_inside: W::one(),
            pushed_inside: W::one(),
            topo: Vec::new(),
        }
    }
}

impl<W: Weight> Cfg<W> {
    pub fn new() -> Self {
        Cfg::default()
    }

    /// Builds a grammar isomorphic to `hg`: nonterminal `i` is node `i`, rule
    /// `j` is edge `j`, and the goal is the last node.
    pub fn from_hypergraph(hg: &Hypergraph<W>, options: &CfgOptions) -> Result<Self> {
        let _span = debug_span!("cfg_init", nodes = hg.nodes.len(), edges = hg.edges.len()).entered();
        let goal_nt = hg.goal().ok_or(Error::EmptyHypergraph)?;

        let nts = hg
            .nodes
            .iter()
            .map(|node| Nt {
                ruleids: node.in_edges.clone(),
                from: node.label.clone(),
                name: None,
                is_virtual: false,
            })
            .collect();

        let inside = if options.push_weights {
            Some(hg.viterbi_inside())
        } else {
            None
        };

        let mut rules = Vec::with_capacity(hg.edges.len());
        for (ei, edge) in hg.edges.iter().enumerate() {
            let mut rhs = Vec::with_capacity(edge.rule.e.len());
            for &w in edge.rule.side(options.target_side) {
                if is_terminal(w) {
                    rhs.push(w);
                } else {
                    let tail = edge.tails.get(nt_index(w)).ok_or(Error::DanglingTail {
                        edge: ei,
                        tail: nt_index(w),
                    })?;
                    rhs.push(nt_symbol(*tail));
                }
            }
            let p = match inside {
                Some(ref inside) => ratio(
                    edge.weight * product(edge.tails.iter().map(|&t| inside[t])),
                    inside[edge.head],
                ),
                None => edge.weight,
            };
            rules.push(Rule {
                lhs: edge.head,
                rhs,
                p,
                f: if options.copy_features {
                    edge.features.clone()
                } else {
                    FeatureVector::new()
                },
                edge: Some(ei),
            });
        }

        let goal_inside = match inside {
            Some(ref inside) => inside[goal_nt],
            None => hg.viterbi(),
        };
        let pushed_inside = if options.push_weights {
            goal_inside
        } else {
            W::one()
        };
        debug!(nts = hg.nodes.len(), rules = rules.len(), "extracted grammar");

        Ok(Cfg {
            nts,
            rules,
            goal_nt,
            goal_inside,
            pushed_inside,
            topo: Vec::new(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.nts.is_empty()
    }

    pub fn add_nt(&mut self, label: Option<String>) -> NtHandle {
        self.nts.push(Nt {
            from: label,
            ..Nt::default()
        });
        self.nts.len() - 1
    }

    /// Appends a rule and indexes it under its lhs.
    pub fn add_rule(&mut self, lhs: NtHandle, rhs: Rhs, p: W) -> RuleHandle {
        self.rules.push(Rule::new(lhs, rhs, p));
        let id = self.rules.len() - 1;
        self.nts[lhs].ruleids.push(id);
        id
    }

    /// Name of a nonterminal: its node label, its virtual name, or its index.
    pub fn nt_name(&self, nt: NtHandle) -> String {
        match self.nts.get(nt) {
            Some(Nt { from: Some(label), .. }) => label.clone(),
            Some(Nt { name: Some(name), .. }) => name.clone(),
            _ => nt.to_string(),
        }
    }

    /// The rules of `nt`, skipping null ones.
    pub fn rules_of(&self, nt: NtHandle) -> impl Iterator<Item = (RuleHandle, &Rule<W>)> + '_ {
        self.nts[nt]
            .ruleids
            .iter()
            .map(move |&r| (r, &self.rules[r]))
            .filter(|(_, rule)| !rule.is_null())
    }

    /// Keeps only the best rule for each right-hand side of `nt`. The best
    /// rule takes the position of the first rule with that right-hand side.
    /// Rules are not removed from the rule table. Returns the number kept.
    pub fn uniq_rules(&mut self, nt: NtHandle) -> usize {
        let rules = &self.rules;
        let ruleids = &mut self.nts[nt].ruleids;
        let mut position: FnvHashMap<&[WordId], usize> = FnvHashMap::default();
        let mut kept: Vec<RuleHandle> = Vec::with_capacity(ruleids.len());
        for &r in ruleids.iter() {
            let rule = &rules[r];
            if rule.is_null() {
                continue;
            }
            match position.get(rule.rhs.as_slice()) {
                Some(&i) => {
                    if rule.p > rules[kept[i]].p {
                        kept[i] = r;
                    }
                }
                None => {
                    position.insert(rule.rhs.as_slice(), kept.len());
                    kept.push(r);
                }
            }
        }
        *ruleids = kept;
        ruleids.len()
    }

    pub fn uniq_rules_all(&mut self) -> usize {
        (0..self.nts.len()).map(|nt| self.uniq_rules(nt)).sum()
    }

    /// Orders the rules of `nt` from highest to lowest weight, keeping the
    /// relative order of ties.
    pub fn sort_local_best_first(&mut self, nt: NtHandle) {
        let rules = &self.rules;
        self.nts[nt]
            .ruleids
            .sort_by(|&a, &b| rules[b].p.cmp(&rules[a].p));
    }

    pub fn sort_local_best_first_all(&mut self) {
        for nt in 0..self.nts.len() {
            self.sort_local_best_first(nt);
        }
    }

    /// Rebuilds every `ruleids` list from the rule table.
    pub fn reindex_rules(&mut self) {
        self.unindex_rules();
        for (r, rule) in self.rules.iter().enumerate() {
            if !rule.is_null() {
                self.nts[rule.lhs].ruleids.push(r);
            }
        }
    }

    pub fn unindex_rules(&mut self) {
        for nt in &mut self.nts {
            nt.ruleids.clear();
        }
    }

    /// Number of rules plus the total length of their right-hand sides.
    pub fn rules_size(&self) -> usize {
        self.rules.len() + self.rules.iter().map(|r| r.rhs.len()).sum::<usize>()
    }

    /// Renames nonterminal `old` to `map[old]` in every rule; rules touching
    /// a nonterminal mapped to `None` become null. Returns the number of
    /// surviving rules.
    pub fn remap_rules(&mut self, map: &[Option<NtHandle>]) -> usize {
        self.rules
            .iter_mut()
            .map(|rule| rule.remap(map))
            .filter(|&kept| kept)
            .count()
    }

    /// Renumbers the nonterminals so that `order[i]` becomes `i`.
    /// Nonterminals missing from `order` are removed and rules touching them
    /// become null. Returns the number of surviving rules.
    pub fn reorder_nts(&mut self, order: &[NtHandle]) -> Result<usize> {
        let mut map = vec![None; self.nts.len()];
        for (new, &old) in order.iter().enumerate() {
            match map.get_mut(old) {
                Some(slot) if slot.is_none() => *slot = Some(new),
                Some(_) => return Err(Error::invalid("order", "repeats a nonterminal")),
                None => return Err(Error::invalid("order", "names an unknown nonterminal")),
            }
        }
        let goal_nt = map[self.goal_nt]
            .ok_or_else(|| Error::invalid("order", "must contain the goal nonterminal"))?;

        let mut old_nts: Vec<Option<Nt>> = self.nts.drain(..).map(Some).collect();
        self.nts = order
            .iter()
            .map(|&old| old_nts[old].take().unwrap_or_default())
            .collect();
        self.goal_nt = goal_nt;
        self.topo = self.topo.iter().filter_map(|&n| map[n]).collect();
        let kept = self.remap_rules(&map);
        let rules = &self.rules;
        for nt in &mut self.nts {
            nt.ruleids.retain(|&r| !rules[r].is_null());
        }
        Ok(kept)
    }

    /// Renumbers the nonterminals bottom-up from the goal; unreachable ones
    /// are removed.
    pub fn reorder_nts_topo(&mut self, warn_cycles: bool) -> Result<usize> {
        let order = self.order_nts_topo(warn_cycles);
        let kept = self.reorder_nts(&order)?;
        self.topo = (0..self.nts.len()).collect();
        Ok(kept)
    }

    /// Renders one rule, naming terminals through `vocab` if given.
    pub fn display_rule<'a>(
        &'a self,
        rule: RuleHandle,
        vocab: Option<&'a crate::hypergraph::Vocabulary>,
    ) -> RuleDisplay<'a, W> {
        RuleDisplay::new(self, rule, vocab)
    }

    pub fn display<'a>(&'a self, vocab: Option<&'a crate::hypergraph::Vocabulary>) -> CfgDisplay<'a, W> {
        CfgDisplay::new(self, vocab)
    }
}
