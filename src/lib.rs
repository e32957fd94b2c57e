//! Grammar extraction, binarization and best-first finite-state intersection
//! for weighted derivation forests.
//!
//! The pipeline reads a `Hypergraph`, projects it into a `Cfg`, binarizes the
//! grammar, compiles its right-hand sides into a `PrefixTrie` and intersects
//! it with an `FsaScorer` in a best-first Earley `Chart`. `ApplyFsaModels`
//! drives the whole pipeline.

pub mod apply;
pub mod cfg;
pub mod chart;
pub mod error;
pub mod fsa;
pub mod hypergraph;
pub mod trie;
pub mod util;

pub use crate::apply::{apply_fsa_models, ApplyFsaConfig, ApplyFsaModels, FsaAlgorithm, HgCfg};
pub use crate::cfg::binarize::{BinarizeConfig, BinarizeStats, BinarizeStrategy};
pub use crate::cfg::{Cfg, CfgOptions};
pub use crate::chart::{Chart, ChartConfig};
pub use crate::error::{Error, Result};
pub use crate::fsa::{FsaScorer, ScorerKind};
pub use crate::hypergraph::{HgRule, Hypergraph, Vocabulary, WordId};
pub use crate::trie::PrefixTrie;
