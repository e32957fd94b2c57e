use super::{BinarizeConfig, VirtualNts};
use crate::cfg::Cfg;
use crate::hypergraph::WordId;
use crate::util::Weight;
use std::cmp::Reverse;
use std::mem;
use tracing::debug;

/// What a split may cost in new nonterminals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Both halves are single symbols or existing virtual nonterminals.
    Both,
    /// One half is an existing virtual nonterminal, the other may be new.
    One,
    /// Anything goes.
    Free,
}

/// Splits over-long rules in two, phase by phase. A phase ends when a pass
/// changes nothing or its pass budget is spent.
pub(super) fn binarize_split<W: Weight>(
    cfg: &mut Cfg<W>,
    config: &BinarizeConfig,
    index: &mut VirtualNts,
) {
    let phases = [
        (Phase::Both, config.split_passes),
        (Phase::One, config.share1_passes),
        (Phase::Free, config.free_passes),
    ];
    for &(phase, budget) in &phases {
        for pass in 0..budget {
            index.stats.passes += 1;
            let changed = split_pass(cfg, phase, index);
            debug!(?phase, pass, changed, "split pass");
            if changed == 0 {
                break;
            }
        }
    }
}

fn split_pass<W: Weight>(cfg: &mut Cfg<W>, phase: Phase, index: &mut VirtualNts) -> usize {
    let mut changed = 0;
    let mut r = 0;
    // rules added during the pass are visited in the same pass
    while r < cfg.rules.len() {
        let rule = &cfg.rules[r];
        if !rule.is_null() && rule.rhs.len() > 2 {
            if let Some(k) = choose_split(&rule.rhs, phase, index) {
                let rhs = mem::replace(&mut cfg.rules[r].rhs, Vec::new());
                let left = index.get_or_add(cfg, &rhs[..k]);
                let right = index.get_or_add(cfg, &rhs[k..]);
                cfg.rules[r].rhs = vec![left, right];
                index.stats.rules_rewritten += 1;
                changed += 1;
            }
        }
        r += 1;
    }
    changed
}

/// The split point allowed in `phase` that needs the fewest new
/// nonterminals, then reuses the most, then is the most balanced.
fn choose_split(rhs: &[WordId], phase: Phase, index: &VirtualNts) -> Option<usize> {
    let n = rhs.len();
    (1..n)
        .filter_map(|k| {
            let (mut new, mut reused) = (0, 0);
            for half in &[&rhs[..k], &rhs[k..]] {
                if half.len() > 1 {
                    if index.find(half).is_some() {
                        reused += 1;
                    } else {
                        new += 1;
                    }
                }
            }
            let allowed = match phase {
                Phase::Both => new == 0,
                Phase::One => new <= 1 && reused >= 1,
                Phase::Free => true,
            };
            let imbalance = (2 * k).max(n) - (2 * k).min(n);
            if allowed {
                Some((new, Reverse(reused), imbalance, k))
            } else {
                None
            }
        })
        .min()
        .map(|(_, _, _, k)| k)
}
