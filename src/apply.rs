//! Applying a finite-state scorer to a hypergraph.
//!
//! A stateless scorer is applied edge by edge. A stateful scorer is applied
//! by the best-first Earley chart over the (binarized) grammar of the
//! hypergraph, which yields the intersected forest.

use crate::cfg::binarize::{BinarizeConfig, BinarizeStrategy};
use crate::cfg::{Cfg, CfgOptions};
use crate::chart::{Chart, ChartConfig};
use crate::error::{Error, Result};
use crate::fsa::{FsaScorer, ScorerKind};
use crate::hypergraph::{is_terminal, Hypergraph};
use crate::trie::PrefixTrie;
use crate::util::Weight;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, debug_span};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum FsaAlgorithm {
    #[serde(rename = "bu-cube")]
    BottomUpCube,
    #[serde(rename = "bu-full")]
    BottomUpFull,
    #[serde(rename = "earley")]
    Earley,
}

impl Default for FsaAlgorithm {
    fn default() -> Self {
        FsaAlgorithm::Earley
    }
}

impl FromStr for FsaAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bu-cube" => Ok(FsaAlgorithm::BottomUpCube),
            "bu-full" => Ok(FsaAlgorithm::BottomUpFull),
            "earley" => Ok(FsaAlgorithm::Earley),
            _ => Err(Error::InvalidConfig {
                field: "algorithm".to_string(),
                reason: format!("unknown algorithm {:?}", s),
            }),
        }
    }
}

impl fmt::Display for FsaAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FsaAlgorithm::BottomUpCube => write!(f, "bu-cube"),
            FsaAlgorithm::BottomUpFull => write!(f, "bu-full"),
            FsaAlgorithm::Earley => write!(f, "earley"),
        }
    }
}

/// Everything `ApplyFsaModels` needs to know, loadable from TOML:
///
/// ```toml
/// algorithm = "earley"
///
/// [binarize]
/// strategy = "split"
/// free_passes = 3
///
/// [chart]
/// beam = 1000
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApplyFsaConfig {
    pub algorithm: FsaAlgorithm,
    pub cfg: CfgOptions,
    pub binarize: BinarizeConfig,
    pub chart: ChartConfig,
}

impl Default for ApplyFsaConfig {
    fn default() -> Self {
        ApplyFsaConfig {
            algorithm: FsaAlgorithm::default(),
            cfg: CfgOptions::default(),
            binarize: BinarizeConfig::new(BinarizeStrategy::LeftToRight),
            chart: ChartConfig::default(),
        }
    }
}

impl ApplyFsaConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: ApplyFsaConfig =
            toml::from_str(toml_str).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.binarize.validate()?;
        self.chart.validate()
    }
}

/// The grammar of one hypergraph, extracted on first use and binarized at
/// most once.
pub struct HgCfg<'h, W> {
    hg: &'h Hypergraph<W>,
    options: CfgOptions,
    cfg: Option<Cfg<W>>,
    binarized: bool,
}

impl<'h, W: Weight> HgCfg<'h, W> {
    pub fn new(hg: &'h Hypergraph<W>, options: CfgOptions) -> Self {
        HgCfg {
            hg,
            options,
            cfg: None,
            binarized: false,
        }
    }

    pub fn is_built(&self) -> bool {
        self.cfg.is_some()
    }

    pub fn is_binarized(&self) -> bool {
        self.binarized
    }

    fn build(&mut self) -> Result<&mut Cfg<W>> {
        if self.cfg.is_none() {
            self.cfg = Some(Cfg::from_hypergraph(self.hg, &self.options)?);
        }
        self.cfg.as_mut().ok_or(Error::EmptyHypergraph)
    }

    pub fn cfg(&mut self) -> Result<&Cfg<W>> {
        self.build().map(|cfg| &*cfg)
    }

    /// The grammar, binarized with `config` the first time.
    pub fn binarized(&mut self, config: &BinarizeConfig) -> Result<&Cfg<W>> {
        if !self.binarized {
            self.build()?.binarize(config)?;
            self.binarized = true;
        }
        self.cfg()
    }
}

/// Applies one scorer to one hypergraph.
pub struct ApplyFsaModels<'h, W, S> {
    hg: &'h Hypergraph<W>,
    hgcfg: HgCfg<'h, W>,
    scorer: &'h S,
    config: ApplyFsaConfig,
}

impl<'h, W: Weight, S: FsaScorer<W>> ApplyFsaModels<'h, W, S> {
    pub fn new(hg: &'h Hypergraph<W>, scorer: &'h S, config: ApplyFsaConfig) -> Result<Self> {
        config.validate()?;
        Ok(ApplyFsaModels {
            hg,
            hgcfg: HgCfg::new(hg, config.cfg.clone()),
            scorer,
            config,
        })
    }

    pub fn hgcfg(&self) -> &HgCfg<'h, W> {
        &self.hgcfg
    }

    /// The rescored hypergraph, or `None` if the scorer rules out every
    /// derivation.
    pub fn compute(&mut self) -> Result<Option<Hypergraph<W>>> {
        if self.hg.is_empty() {
            return Err(Error::EmptyHypergraph);
        }
        let kind = self.scorer.kind();
        let _span = debug_span!("apply_fsa_models", algorithm = %self.config.algorithm, ?kind).entered();
        match (kind, self.config.algorithm) {
            (ScorerKind::Stateless, _) => Ok(apply_stateless(self.hg, self.scorer)),
            (ScorerKind::Stateful, FsaAlgorithm::Earley) => self.earley(),
            (ScorerKind::Stateful, algorithm) => Err(Error::Unsupported(format!(
                "{} application of a stateful scorer",
                algorithm
            ))),
        }
    }

    fn earley(&mut self) -> Result<Option<Hypergraph<W>>> {
        let cfg = self.hgcfg.binarized(&self.config.binarize)?;
        let trie = PrefixTrie::from_cfg(cfg)?;
        let mut chart = Chart::new(cfg, &trie, self.scorer, self.config.chart.clone());
        let best = chart.run()?;
        debug!(found = best.is_some(), "earley intersection");
        Ok(chart.to_hypergraph())
    }
}

/// Multiplies every edge weight by the scores of its target words, and the
/// goal's edges by the end of sentence score. `None` if the goal becomes
/// unreachable.
fn apply_stateless<W: Weight, S: FsaScorer<W>>(hg: &Hypergraph<W>, scorer: &S) -> Option<Hypergraph<W>> {
    let start = scorer.start();
    let finish = scorer.finish(&start);
    let goal = hg.goal()?;
    let mut out = hg.clone();
    for edge in &mut out.edges {
        for &w in edge.rule.e.iter().filter(|&&w| is_terminal(w)) {
            edge.weight = edge.weight * scorer.scan(&start, w).0;
        }
        if edge.head == goal {
            edge.weight = edge.weight * finish;
        }
    }
    if out.viterbi().is_zero() {
        None
    } else {
        Some(out)
    }
}

/// `ApplyFsaModels::new(hg, scorer, config)?.compute()`
pub fn apply_fsa_models<W: Weight, S: FsaScorer<W>>(
    hg: &Hypergraph<W>,
    scorer: &S,
    config: ApplyFsaConfig,
) -> Result<Option<Hypergraph<W>>> {
    ApplyFsaModels::new(hg, scorer, config)?.compute()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hypergraph::test::{lp, small};
    use crate::fsa::{BigramModel, WordPenalty};
    use crate::hypergraph::HgRule;

    #[test]
    fn config_from_toml() {
        let config = ApplyFsaConfig::from_toml_str(
            r#"
            algorithm = "earley"

            [cfg]
            push_weights = false

            [binarize]
            strategy = "split"
            free_passes = 3
            topo = true

            [chart]
            beam = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.algorithm, FsaAlgorithm::Earley);
        assert!(!config.cfg.push_weights);
        assert!(config.cfg.target_side);
        assert_eq!(config.binarize.strategy, Some(BinarizeStrategy::Split));
        assert_eq!(config.binarize.free_passes, 3);
        assert_eq!(config.binarize.split_passes, 10);
        assert_eq!(config.chart.beam, Some(1000));
        assert_eq!(config.chart.pop_limit, None);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ApplyFsaConfig::from_toml_str("").unwrap(), ApplyFsaConfig::default());
    }

    #[test]
    fn bad_configs() {
        let err = ApplyFsaConfig::from_toml_str("[binarize]\nstrategy = \"thresh\"\n").unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        let err = ApplyFsaConfig::from_toml_str("algorithm = \"cky\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
        let err = ApplyFsaConfig::from_toml_str("[chart]\nbeam = 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert_eq!("bu-full".parse::<FsaAlgorithm>().unwrap(), FsaAlgorithm::BottomUpFull);
        assert!("cky".parse::<FsaAlgorithm>().is_err());
    }

    #[test]
    fn grammar_is_built_once() {
        let hg = small();
        let mut hgcfg = HgCfg::new(&hg, CfgOptions::default());
        assert!(!hgcfg.is_built());
        let config = BinarizeConfig::new(BinarizeStrategy::LeftToRight);
        let rules = hgcfg.binarized(&config).unwrap().rules.len();
        assert_eq!(rules, 5);
        assert!(hgcfg.is_built() && hgcfg.is_binarized());
        assert_eq!(hgcfg.binarized(&config).unwrap().rules.len(), rules);
        assert_eq!(hgcfg.cfg().unwrap().rules.len(), rules);
    }

    #[test]
    fn stateless_rescoring() {
        let hg = small();
        let scorer = WordPenalty { per_word: lp(0.5) };
        let out = apply_fsa_models(&hg, &scorer, ApplyFsaConfig::default())
            .unwrap()
            .unwrap();
        // two words around X, none on the unary edge
        assert!((out.edges[2].weight.value() - 0.8 * 0.25).abs() < 1e-9);
        assert!((out.edges[3].weight.value() - 0.1).abs() < 1e-9);
        // X -> x is now 0.25
        assert!((out.viterbi().value() - 0.2 * 0.25).abs() < 1e-9);
    }

    #[test]
    fn cyclic_forest_keeps_its_derivation() {
        let mut hg = small();
        hg.add_edge(0, vec![1], HgRule::monolingual(vec![0]), lp(0.9));
        let scorer = BigramModel::new(lp(1.0));
        let out = apply_fsa_models(&hg, &scorer, ApplyFsaConfig::default())
            .unwrap()
            .unwrap();
        let (words, w) = out.viterbi_yield().unwrap();
        assert_eq!(words, vec![1, 10, 2]);
        assert!((w.value() - 0.4).abs() < 1e-9);

        let scorer = WordPenalty { per_word: lp(0.5) };
        let out = apply_fsa_models(&hg, &scorer, ApplyFsaConfig::default())
            .unwrap()
            .unwrap();
        assert!((out.viterbi().value() - 0.05).abs() < 1e-9);
    }
}
