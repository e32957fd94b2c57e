#![allow(dead_code)]

use hgfsa::cfg::Cfg;
use hgfsa::hypergraph::{nt_symbol, WordId};
use log_domain::LogDomain;
use proptest::prelude::*;

pub type Prob = LogDomain<f64>;

pub fn lp(p: f64) -> Prob {
    LogDomain::new(p).unwrap()
}

pub fn close(a: Prob, b: Prob) -> bool {
    let (a, b) = (a.value(), b.value());
    (a - b).abs() <= 1e-9 * a.max(b) + 1e-300
}

/// A grammar over terminals `1..=5` with `nts` nonterminals, each with at
/// least one rule. Nonterminal 0 is the goal.
pub fn arb_grammar(max_nts: usize, max_len: usize) -> impl Strategy<Value = Cfg<Prob>> {
    (1..=max_nts).prop_flat_map(move |nts| {
        let symbol = (any::<bool>(), 0..5i32);
        let rule = (prop::collection::vec(symbol, 0..=max_len), 0.05f64..1.0);
        prop::collection::vec(prop::collection::vec(rule, 1..4), nts).prop_map(move |table| {
            let mut cfg = Cfg::new();
            for nt in 0..nts {
                cfg.add_nt(Some(format!("N{}", nt)));
            }
            for (lhs, rules) in table.into_iter().enumerate() {
                for (symbols, p) in rules {
                    let rhs: Vec<WordId> = symbols
                        .into_iter()
                        .map(|(terminal, v)| {
                            if terminal {
                                v + 1
                            } else {
                                nt_symbol(v as usize % nts)
                            }
                        })
                        .collect();
                    cfg.add_rule(lhs, rhs, lp(p));
                }
            }
            cfg.goal_nt = 0;
            cfg
        })
    })
}

/// Replaces virtual nonterminals by what they cover, multiplying in the
/// weights of their rules.
pub fn expand(cfg: &Cfg<Prob>, symbols: &[WordId], out: &mut Vec<WordId>, weight: &mut Prob) {
    for &w in symbols {
        let nt = (-w) as usize;
        if w <= 0 && cfg.nts[nt].is_virtual {
            let rule = &cfg.rules[cfg.nts[nt].ruleids[0]];
            *weight = *weight * rule.p;
            expand(cfg, &rule.rhs, out, weight);
        } else {
            out.push(w);
        }
    }
}
