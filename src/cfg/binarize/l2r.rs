use super::{BinarizeConfig, VirtualNts};
use crate::cfg::Cfg;
use crate::util::Weight;
use std::mem;

/// Right-branching binarization: the two rightmost symbols of an over-long
/// right-hand side are replaced by their virtual nonterminal until the rule
/// fits. Also finishes whatever the split strategy left over-long.
pub(super) fn binarize_l2r<W: Weight>(
    cfg: &mut Cfg<W>,
    config: &BinarizeConfig,
    index: &mut VirtualNts,
) {
    // rules appended below have two symbols and never need another visit
    for r in 0..cfg.rules.len() {
        let rule = &cfg.rules[r];
        if rule.is_null() {
            continue;
        }
        let limit = cfg.arity_limit(rule.lhs, config);
        if rule.rhs.len() <= limit {
            continue;
        }
        let mut rhs = mem::replace(&mut cfg.rules[r].rhs, Vec::new());
        while rhs.len() > limit {
            let n = rhs.len();
            let v = index.get_or_add(cfg, &rhs[n - 2..]);
            rhs.truncate(n - 2);
            rhs.push(v);
        }
        cfg.rules[r].rhs = rhs;
        index.stats.rules_rewritten += 1;
    }
}
