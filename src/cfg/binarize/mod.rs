//! Rewriting a grammar into rules of bounded arity.
//!
//! Every strategy introduces *virtual* nonterminals with a single rule of
//! weight `one` that stand for a sub-sequence of some right-hand side.
//! Virtual nonterminals are hash-consed on the sequence of original symbols
//! they cover, so equal sub-sequences share one nonterminal, also across
//! strategies and repeated calls. New nonterminals and rules are only ever
//! appended; existing indices keep their meaning.

mod l2r;
mod split;

use super::{Cfg, Nt, NtHandle, Rhs, Rule};
use crate::error::{Error, Result};
use crate::hypergraph::{is_terminal, nt_index, nt_symbol, WordId};
use crate::util::Weight;
use fnv::FnvHashMap;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, debug_span};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum BinarizeStrategy {
    /// Greedy binarization of the most frequent adjacent pair.
    #[serde(rename = "thresh")]
    Threshold,
    #[serde(rename = "l2r")]
    LeftToRight,
    /// Split each right-hand side in two, preferring halves that already
    /// have a virtual nonterminal.
    #[serde(rename = "split")]
    Split,
}

impl FromStr for BinarizeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "thresh" => Ok(BinarizeStrategy::Threshold),
            "l2r" => Ok(BinarizeStrategy::LeftToRight),
            "split" => Ok(BinarizeStrategy::Split),
            _ => Err(Error::InvalidConfig {
                field: "strategy".to_string(),
                reason: format!("unknown binarization strategy {:?}", s),
            }),
        }
    }
}

impl fmt::Display for BinarizeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BinarizeStrategy::Threshold => write!(f, "thresh"),
            BinarizeStrategy::LeftToRight => write!(f, "l2r"),
            BinarizeStrategy::Split => write!(f, "split"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BinarizeConfig {
    /// `None` leaves the rules as they are.
    pub strategy: Option<BinarizeStrategy>,
    /// Minimum pair count for the threshold strategy.
    pub threshold: usize,
    /// Pass budget of the split phase that reuses both halves.
    pub split_passes: usize,
    /// Pass budget of the split phase that reuses at least one half.
    pub share1_passes: usize,
    /// Pass budget of the split phase that may create two new nonterminals.
    pub free_passes: usize,
    /// Reduce original rules to at most one symbol.
    pub bin_unary: bool,
    /// Name virtual nonterminals after the symbols they cover.
    pub name_nts: bool,
    /// Store a bottom-up order of all nonterminals in `Cfg::topo`.
    pub topo: bool,
}

impl Default for BinarizeConfig {
    fn default() -> Self {
        BinarizeConfig {
            strategy: None,
            threshold: 0,
            split_passes: 10,
            share1_passes: 10,
            free_passes: 10,
            bin_unary: false,
            name_nts: false,
            topo: false,
        }
    }
}

impl BinarizeConfig {
    pub fn new(strategy: BinarizeStrategy) -> Self {
        BinarizeConfig {
            strategy: Some(strategy),
            ..BinarizeConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.strategy == Some(BinarizeStrategy::Threshold) {
            return Err(Error::Unsupported(
                "threshold binarization is not implemented".to_string(),
            ));
        }
        Ok(())
    }

    /// Most symbols an original rule may keep.
    fn max_arity(&self) -> usize {
        if self.bin_unary {
            1
        } else {
            2
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinarizeStats {
    pub nts_added: usize,
    pub rules_added: usize,
    /// Rules whose right-hand side was shortened.
    pub rules_rewritten: usize,
    /// Passes run by the split strategy.
    pub passes: usize,
}

/// The hash-consing index of virtual nonterminals, keyed by the original
/// symbols each one covers.
pub(crate) struct VirtualNts {
    by_span: FnvHashMap<Rhs, NtHandle>,
    spans: FnvHashMap<NtHandle, Rhs>,
    name_nts: bool,
    pub(crate) stats: BinarizeStats,
}

impl VirtualNts {
    /// Indexes the virtual nonterminals `cfg` already has.
    pub(crate) fn seed<W: Weight>(cfg: &Cfg<W>, name_nts: bool) -> Self {
        let mut index = VirtualNts {
            by_span: FnvHashMap::default(),
            spans: FnvHashMap::default(),
            name_nts,
            stats: BinarizeStats::default(),
        };
        for nt in 0..cfg.nts.len() {
            if cfg.nts[nt].is_virtual {
                let span = index.span_of(cfg, nt);
                index.by_span.entry(span).or_insert(nt);
            }
        }
        index
    }

    fn span_of<W: Weight>(&mut self, cfg: &Cfg<W>, nt: NtHandle) -> Rhs {
        if let Some(span) = self.spans.get(&nt) {
            return span.clone();
        }
        let mut span = Vec::new();
        if let Some((_, rule)) = cfg.rules_of(nt).next() {
            for &w in &rule.rhs {
                let child = nt_index(w);
                if !is_terminal(w) && child != nt && cfg.nts[child].is_virtual {
                    span.extend(self.span_of(cfg, child));
                } else {
                    span.push(w);
                }
            }
        }
        self.spans.insert(nt, span.clone());
        span
    }

    /// `symbols` with every virtual nonterminal expanded.
    pub(crate) fn flatten(&self, symbols: &[WordId]) -> Rhs {
        let mut out = Vec::with_capacity(symbols.len());
        for &w in symbols {
            match self.spans.get(&nt_index(w)) {
                Some(span) if !is_terminal(w) => out.extend_from_slice(span),
                _ => out.push(w),
            }
        }
        out
    }

    /// The symbol that stands for `symbols` if no new nonterminal is needed.
    pub(crate) fn find(&self, symbols: &[WordId]) -> Option<WordId> {
        match symbols {
            [w] => Some(*w),
            _ => self.by_span.get(&self.flatten(symbols)).map(|&nt| nt_symbol(nt)),
        }
    }

    /// The symbol that stands for `symbols`, adding a virtual nonterminal
    /// with the rule `V -> symbols` if there is none.
    pub(crate) fn get_or_add<W: Weight>(&mut self, cfg: &mut Cfg<W>, symbols: &[WordId]) -> WordId {
        if let Some(w) = self.find(symbols) {
            return w;
        }
        let span = self.flatten(symbols);
        let nt = cfg.nts.len();
        let name = if self.name_nts {
            Some(virtual_name(cfg, &span))
        } else {
            None
        };
        cfg.rules.push(Rule::new(nt, symbols.to_vec(), W::one()));
        cfg.nts.push(Nt {
            ruleids: vec![cfg.rules.len() - 1],
            from: None,
            name,
            is_virtual: true,
        });
        self.spans.insert(nt, span.clone());
        self.by_span.insert(span, nt);
        self.stats.nts_added += 1;
        self.stats.rules_added += 1;
        nt_symbol(nt)
    }
}

fn virtual_name<W: Weight>(cfg: &Cfg<W>, span: &[WordId]) -> String {
    let inner: Vec<String> = span
        .iter()
        .map(|&w| {
            if is_terminal(w) {
                w.to_string()
            } else {
                format!("[{}]", cfg.nt_name(nt_index(w)))
            }
        })
        .collect();
    format!("<{}>", inner.join(" "))
}

impl<W: Weight> Cfg<W> {
    /// Binarizes the grammar in place. The configuration is validated before
    /// anything is touched.
    pub fn binarize(&mut self, config: &BinarizeConfig) -> Result<BinarizeStats> {
        config.validate()?;
        let strategy = match config.strategy {
            Some(strategy) => strategy,
            None => {
                if config.topo {
                    self.topo = self.order_nts_topo(true);
                }
                return Ok(BinarizeStats::default());
            }
        };
        let _span = debug_span!("binarize", %strategy, rules = self.rules.len()).entered();

        let mut index = VirtualNts::seed(self, config.name_nts);
        if strategy == BinarizeStrategy::Split {
            split::binarize_split(self, config, &mut index);
        }
        l2r::binarize_l2r(self, config, &mut index);

        if config.topo {
            self.topo = self.order_nts_topo(true);
        }
        debug!(
            nts_added = index.stats.nts_added,
            rules_rewritten = index.stats.rules_rewritten,
            passes = index.stats.passes,
            rules_size = self.rules_size(),
            "binarized"
        );
        Ok(index.stats)
    }

    /// Most symbols the rule of `nt` may keep after binarization.
    pub(crate) fn arity_limit(&self, nt: NtHandle, config: &BinarizeConfig) -> usize {
        if self.nts[nt].is_virtual {
            2
        } else {
            config.max_arity()
        }
    }
}
