mod common;

use common::{arb_grammar, close, expand, lp, Prob};
use hgfsa::cfg::binarize::{BinarizeConfig, BinarizeStrategy};
use hgfsa::cfg::Cfg;
use hgfsa::error::Error;
use hgfsa::hypergraph::nt_symbol;
use hgfsa::trie::{PrefixTrie, TrieEdge};
use proptest::prelude::*;
use std::collections::HashSet;

fn configs() -> Vec<BinarizeConfig> {
    let mut configs = Vec::new();
    for &strategy in &[BinarizeStrategy::LeftToRight, BinarizeStrategy::Split] {
        for &bin_unary in &[false, true] {
            configs.push(BinarizeConfig {
                bin_unary,
                ..BinarizeConfig::new(strategy)
            });
        }
    }
    configs.push(BinarizeConfig {
        split_passes: 1,
        share1_passes: 0,
        free_passes: 1,
        ..BinarizeConfig::new(BinarizeStrategy::Split)
    });
    configs
}

/// `S -> a B c (0.6) | a B d (0.4)`, `B -> b (1.0)`
fn abcd() -> Cfg<Prob> {
    let mut cfg = Cfg::new();
    let s = cfg.add_nt(Some("S".to_string()));
    let b = cfg.add_nt(Some("B".to_string()));
    cfg.add_rule(s, vec![1, nt_symbol(b), 3], lp(0.6));
    cfg.add_rule(s, vec![1, nt_symbol(b), 4], lp(0.4));
    cfg.add_rule(b, vec![2], lp(1.0));
    cfg
}

proptest! {
    #[test]
    fn arity_is_bounded(cfg in arb_grammar(4, 7)) {
        for config in configs() {
            let mut bin = cfg.clone();
            bin.binarize(&config).unwrap();
            for rule in &bin.rules {
                let limit = if bin.nts[rule.lhs].is_virtual || !config.bin_unary { 2 } else { 1 };
                prop_assert!(rule.rhs.len() <= limit);
            }
        }
    }

    #[test]
    fn originals_keep_their_indices(cfg in arb_grammar(4, 7)) {
        for config in configs() {
            let mut bin = cfg.clone();
            bin.binarize(&config).unwrap();
            prop_assert!(bin.nts.len() >= cfg.nts.len());
            prop_assert!(bin.rules.len() >= cfg.rules.len());
            for (nt, before) in cfg.nts.iter().enumerate() {
                prop_assert_eq!(&bin.nts[nt].ruleids, &before.ruleids);
                prop_assert!(!bin.nts[nt].is_virtual);
            }
            for (r, before) in cfg.rules.iter().enumerate() {
                prop_assert_eq!(bin.rules[r].lhs, before.lhs);
            }
            prop_assert!(bin.nts[cfg.nts.len()..].iter().all(|nt| nt.is_virtual));
        }
    }

    #[test]
    fn derivations_keep_their_weight(cfg in arb_grammar(4, 7)) {
        for config in configs() {
            let mut bin = cfg.clone();
            bin.binarize(&config).unwrap();
            for (r, before) in cfg.rules.iter().enumerate() {
                let mut symbols = Vec::new();
                let mut weight = bin.rules[r].p;
                expand(&bin, &bin.rules[r].rhs, &mut symbols, &mut weight);
                prop_assert_eq!(&symbols, &before.rhs);
                prop_assert!(close(weight, before.p));
            }
        }
    }

    #[test]
    fn virtual_nts_are_shared(cfg in arb_grammar(4, 7)) {
        for config in configs() {
            let mut bin = cfg.clone();
            bin.binarize(&config).unwrap();
            let mut seen = HashSet::new();
            for nt in cfg.nts.len()..bin.nts.len() {
                let mut covered = Vec::new();
                let mut weight = lp(1.0);
                expand(&bin, &[nt_symbol(nt)], &mut covered, &mut weight);
                prop_assert!(seen.insert(covered));
            }
            let again = bin.clone();
            let stats = bin.binarize(&config).unwrap();
            prop_assert_eq!(stats.nts_added, 0);
            prop_assert_eq!(bin, again);
        }
    }

    #[test]
    fn uniq_is_idempotent(cfg in arb_grammar(3, 2)) {
        let mut once = cfg.clone();
        once.uniq_rules_all();
        let mut twice = once.clone();
        twice.uniq_rules_all();
        prop_assert_eq!(&once, &twice);
        for nt in 0..once.nts.len() {
            let rhss: HashSet<_> = once.rules_of(nt).map(|(_, rule)| rule.rhs.clone()).collect();
            prop_assert_eq!(rhss.len(), once.nts[nt].ruleids.len());
        }
    }

    #[test]
    fn trie_reaches_every_rule(cfg in arb_grammar(4, 7)) {
        let mut bin = cfg.clone();
        bin.binarize(&BinarizeConfig::new(BinarizeStrategy::LeftToRight)).unwrap();
        for grammar in &[cfg, bin] {
            let trie = PrefixTrie::from_cfg(grammar).unwrap();
            for (r, rule) in grammar.rules.iter().enumerate() {
                let found = trie.lookup(rule.lhs, &rule.rhs).unwrap();
                prop_assert!(found.iter().any(|&(fr, w)| fr == r && close(w, rule.p)));
            }
            for nt in 0..grammar.nts.len() {
                let weights: Vec<Prob> = trie.completions(nt).unwrap().map(|(_, w)| w).collect();
                prop_assert_eq!(weights.len(), grammar.nts[nt].ruleids.len());
                for pair in weights.windows(2) {
                    prop_assert!(pair[0].value() >= pair[1].value() - 1e-12);
                }
            }
        }
    }
}

#[test]
fn left_to_right_scenario() {
    let mut cfg = abcd();
    let stats = cfg
        .binarize(&BinarizeConfig::new(BinarizeStrategy::LeftToRight))
        .unwrap();
    // the two right-hand sides diverge in their last symbol
    assert_eq!(stats.nts_added, 2);

    let unbinarized = abcd();
    let trie = PrefixTrie::from_cfg(&unbinarized).unwrap();
    let mut node = trie.entry(0).unwrap();
    for &symbol in &[1, nt_symbol(1)] {
        assert_eq!(trie.node(node).edges.len(), 1);
        node = match trie.node(node).edges[0] {
            TrieEdge::Symbol { symbol: s, dest, .. } if s == symbol => dest,
            ref other => panic!("unexpected edge {:?}", other),
        };
    }
    assert_eq!(trie.node(node).edges.len(), 2);

    for grammar in &[unbinarized, cfg] {
        let trie = PrefixTrie::from_cfg(grammar).unwrap();
        let best: Vec<_> = trie.completions(0).unwrap().collect();
        assert_eq!(best[0].0, 0);
        assert!(close(best[0].1, lp(0.6)));
        assert_eq!(best[1].0, 1);
        assert!(close(best[1].1, lp(0.4)));
    }
}

#[test]
fn ruleless_entry_is_malformed() {
    let mut cfg = abcd();
    let empty = cfg.add_nt(Some("E".to_string()));
    let mut trie = PrefixTrie::new(&cfg);
    let before = trie.len();
    match trie.build_lhs(&cfg, empty) {
        Err(Error::MalformedGrammar { nt, .. }) => assert_eq!(nt, empty),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(trie.len(), before);
}

#[test]
fn threshold_is_unsupported() {
    let mut cfg = abcd();
    let err = cfg
        .binarize(&BinarizeConfig::new(BinarizeStrategy::Threshold))
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
    assert_eq!(cfg.nts.len(), 2);
}

#[test]
fn topological_order_covers_virtual_nts() {
    let mut cfg = abcd();
    let config = BinarizeConfig {
        topo: true,
        ..BinarizeConfig::new(BinarizeStrategy::LeftToRight)
    };
    cfg.binarize(&config).unwrap();
    assert_eq!(cfg.topo.len(), 4);
    assert_eq!(cfg.topo.last(), Some(&0));
    let position = |nt: usize| cfg.topo.iter().position(|&n| n == nt).unwrap();
    assert!(position(1) < position(2));
    assert!(position(2) < position(0));
}
