mod common;

use common::{arb_grammar, close, lp, Prob};
use hgfsa::cfg::{Cfg, CfgOptions};
use hgfsa::chart::{Chart, ChartConfig};
use hgfsa::error::Error;
use hgfsa::fsa::{BigramModel, FsaScorer, WordPenalty, SENTENCE_START};
use hgfsa::hypergraph::{nt_index, nt_symbol, HgRule, Hypergraph};
use hgfsa::trie::PrefixTrie;
use hgfsa::{
    apply_fsa_models, ApplyFsaConfig, BinarizeConfig, BinarizeStrategy, FsaAlgorithm,
};
use log_domain::LogDomain;
use num_traits::{One, Zero};
use proptest::prelude::*;

/// `A -> a (0.6) | b (0.4)`, `G -> A c (1.0)`
fn abc() -> Hypergraph<Prob> {
    let mut hg = Hypergraph::new();
    let a = hg.add_node(Some("A".to_string()));
    let g = hg.add_node(Some("G".to_string()));
    hg.add_edge(a, vec![], HgRule::monolingual(vec![1]), lp(0.6));
    hg.add_edge(a, vec![], HgRule::monolingual(vec![2]), lp(0.4));
    hg.add_edge(g, vec![a], HgRule::monolingual(vec![0, 3]), lp(1.0));
    hg
}

fn bigrams() -> BigramModel<Prob> {
    BigramModel::new(lp(0.01))
        .with(SENTENCE_START, 1, lp(0.1))
        .with(SENTENCE_START, 2, lp(0.5))
        .with(1, 3, lp(0.9))
        .with(2, 3, lp(0.2))
}

/// Best derivation weight of every nonterminal, by fixpoint iteration.
fn viterbi_inside(cfg: &Cfg<Prob>) -> Vec<Prob> {
    let mut inside = vec![Prob::zero(); cfg.nts.len()];
    for _ in 0..=cfg.nts.len() {
        for rule in &cfg.rules {
            let w = rule.rhs.iter().fold(rule.p, |w, &s| {
                if s > 0 {
                    w
                } else {
                    w * inside[nt_index(s)]
                }
            });
            if w > inside[rule.lhs] {
                inside[rule.lhs] = w;
            }
        }
    }
    inside
}

/// Every state a bigram model can be in over terminals `1..=5`.
const STATES: usize = 6;

/// Best weight of deriving `goal` from the start state and finishing, by
/// fixpoint iteration over `(nt, from, to)` items.
fn bigram_viterbi(cfg: &Cfg<Prob>, model: &BigramModel<Prob>) -> Prob {
    let mut table = vec![vec![vec![Prob::zero(); STATES]; STATES]; cfg.nts.len()];
    for _ in 0..=cfg.nts.len() * STATES * STATES {
        let mut changed = false;
        for rule in &cfg.rules {
            for q in 0..STATES {
                let mut reach = vec![Prob::zero(); STATES];
                reach[q] = rule.p;
                for &s in &rule.rhs {
                    let mut next = vec![Prob::zero(); STATES];
                    for (from, &w) in reach.iter().enumerate() {
                        if w.is_zero() {
                            continue;
                        }
                        if s > 0 {
                            let v = w * model.prob(from as i32, s);
                            if v > next[s as usize] {
                                next[s as usize] = v;
                            }
                        } else {
                            for (to, &inner) in table[nt_index(s)][from].iter().enumerate() {
                                if w * inner > next[to] {
                                    next[to] = w * inner;
                                }
                            }
                        }
                    }
                    reach = next;
                }
                for (r, &w) in reach.iter().enumerate() {
                    if w > table[rule.lhs][q][r] {
                        table[rule.lhs][q][r] = w;
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
    table[cfg.goal_nt][SENTENCE_START as usize]
        .iter()
        .enumerate()
        .map(|(r, &w)| w * model.finish(&(r as i32)))
        .max()
        .unwrap_or_else(Prob::zero)
}

#[test]
fn bigrams_choose_the_derivation() {
    let hg = abc();
    let scorer = bigrams();
    let out = apply_fsa_models(&hg, &scorer, ApplyFsaConfig::default())
        .unwrap()
        .unwrap();
    let (words, w) = out.viterbi_yield().unwrap();
    assert_eq!(words, vec![1, 3]);
    assert!(close(w, lp(0.054)));

    // make `b` the better first word
    let scorer = bigrams().with(SENTENCE_START, 1, lp(0.01));
    let out = apply_fsa_models(&hg, &scorer, ApplyFsaConfig::default())
        .unwrap()
        .unwrap();
    let (words, w) = out.viterbi_yield().unwrap();
    assert_eq!(words, vec![2, 3]);
    assert!(close(w, lp(0.04)));
}

#[test]
fn chart_best_includes_pushed_weight() {
    let hg = abc();
    for &push_weights in &[true, false] {
        let options = CfgOptions {
            push_weights,
            ..CfgOptions::default()
        };
        let cfg = Cfg::from_hypergraph(&hg, &options).unwrap();
        let trie = PrefixTrie::from_cfg(&cfg).unwrap();
        let scorer = bigrams();
        let mut chart = Chart::new(&cfg, &trie, &scorer, ChartConfig::default());
        let best = chart.best_first(1).unwrap().unwrap();
        assert!(close(best, lp(0.054)));
        assert_eq!(chart.best(), Some(best));
    }
}

#[test]
fn split_and_left_to_right_agree() {
    let hg = abc();
    let scorer = bigrams();
    let mut weights = Vec::new();
    for &strategy in &[BinarizeStrategy::LeftToRight, BinarizeStrategy::Split] {
        let config = ApplyFsaConfig {
            binarize: BinarizeConfig {
                bin_unary: true,
                ..BinarizeConfig::new(strategy)
            },
            ..ApplyFsaConfig::default()
        };
        let out = apply_fsa_models(&hg, &scorer, config).unwrap().unwrap();
        weights.push(out.viterbi());
    }
    assert!(close(weights[0], weights[1]));
}

#[test]
fn nothing_survives_a_zero_model() {
    let hg = abc();
    let scorer = BigramModel::new(Prob::zero());
    assert!(apply_fsa_models(&hg, &scorer, ApplyFsaConfig::default())
        .unwrap()
        .is_none());

    let stateless = WordPenalty {
        per_word: Prob::zero(),
    };
    assert!(apply_fsa_models(&hg, &stateless, ApplyFsaConfig::default())
        .unwrap()
        .is_none());
}

#[test]
fn stateless_scorers_rescore_edges() {
    let hg = abc();
    let scorer = WordPenalty { per_word: lp(0.5) };
    let config = ApplyFsaConfig {
        algorithm: FsaAlgorithm::BottomUpFull,
        ..ApplyFsaConfig::default()
    };
    let out = apply_fsa_models(&hg, &scorer, config).unwrap().unwrap();
    assert_eq!(out.nodes.len(), hg.nodes.len());
    assert!(close(out.edges[0].weight, lp(0.3)));
    assert!(close(out.edges[2].weight, lp(0.5)));
    assert!(close(out.viterbi(), lp(0.15)));
}

#[test]
fn stateful_bottom_up_is_unsupported() {
    let hg = abc();
    let scorer = bigrams();
    for &algorithm in &[FsaAlgorithm::BottomUpCube, FsaAlgorithm::BottomUpFull] {
        let config = ApplyFsaConfig {
            algorithm,
            ..ApplyFsaConfig::default()
        };
        match apply_fsa_models(&hg, &scorer, config) {
            Err(Error::Unsupported(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn bad_configurations_are_rejected() {
    let hg = abc();
    let scorer = bigrams();
    let config = ApplyFsaConfig {
        binarize: BinarizeConfig::new(BinarizeStrategy::Threshold),
        ..ApplyFsaConfig::default()
    };
    assert!(matches!(
        apply_fsa_models(&hg, &scorer, config),
        Err(Error::Unsupported(_))
    ));
    assert!(matches!(
        ApplyFsaConfig::from_toml_str("[binarize]\nstrategy = \"thresh\""),
        Err(Error::Unsupported(_))
    ));
    assert!(matches!(
        ApplyFsaConfig::from_toml_str("[chart]\nbeam = 0"),
        Err(Error::InvalidConfig { .. })
    ));
    assert!(matches!(
        ApplyFsaConfig::from_toml_str("algorithm = \"cky\""),
        Err(Error::ConfigParse(_))
    ));
    assert!(matches!(
        apply_fsa_models(&Hypergraph::<Prob>::new(), &scorer, ApplyFsaConfig::default()),
        Err(Error::EmptyHypergraph)
    ));
}

#[test]
fn nonterminal_without_rules_is_malformed() {
    let mut cfg = Cfg::new();
    let s = cfg.add_nt(Some("S".to_string()));
    let b = cfg.add_nt(Some("B".to_string()));
    cfg.add_rule(s, vec![1, nt_symbol(b)], lp(0.5));
    let trie = PrefixTrie::from_cfg(&cfg).unwrap();
    let scorer = WordPenalty { per_word: lp(1.0) };
    let mut chart = Chart::new(&cfg, &trie, &scorer, ChartConfig::default());
    match chart.run() {
        Err(Error::MalformedGrammar { nt, name }) => {
            assert_eq!(nt, b);
            assert_eq!(name, "B");
        }
        other => panic!("unexpected {:?}", other),
    }
}

proptest! {
    #[test]
    fn chart_finds_the_viterbi_derivation(cfg in arb_grammar(4, 4)) {
        let expected = viterbi_inside(&cfg)[cfg.goal_nt];
        let scorer = WordPenalty { per_word: LogDomain::one() };
        let trie = PrefixTrie::from_cfg(&cfg).unwrap();
        let mut chart = Chart::new(&cfg, &trie, &scorer, ChartConfig::default());
        match chart.run().unwrap() {
            Some(best) => prop_assert!(close(best, expected)),
            None => prop_assert!(expected.is_zero()),
        }
    }

    #[test]
    fn pops_never_improve(cfg in arb_grammar(4, 5), backoff in 0.05f64..1.0) {
        let mut cfg = cfg;
        cfg.binarize(&BinarizeConfig::new(BinarizeStrategy::LeftToRight)).unwrap();
        let trie = PrefixTrie::from_cfg(&cfg).unwrap();
        let scorer = BigramModel::new(lp(backoff))
            .with(SENTENCE_START, 1, lp(0.9))
            .with(1, 2, lp(0.3))
            .with(2, 1, lp(0.7))
            .with_end(5);
        let config = ChartConfig {
            record_pops: true,
            ..ChartConfig::default()
        };
        let mut chart = Chart::new(&cfg, &trie, &scorer, config);
        chart.run().unwrap();
        for pair in chart.popped().windows(2) {
            prop_assert!(pair[0].value() >= pair[1].value() * (1.0 - 1e-9));
        }
    }

    #[test]
    fn chart_matches_bigram_intersection(
        cfg in arb_grammar(4, 4),
        backoff in 0.05f64..1.0,
        binarize in any::<bool>(),
    ) {
        let model = BigramModel::new(lp(backoff))
            .with(SENTENCE_START, 2, lp(0.8))
            .with(1, 2, lp(0.2))
            .with(2, 3, lp(0.9))
            .with(3, 1, lp(0.6))
            .with(4, 6, lp(0.7))
            .with_end(6);
        let mut cfg = cfg;
        if binarize {
            cfg.binarize(&BinarizeConfig::new(BinarizeStrategy::Split)).unwrap();
        }
        let expected = bigram_viterbi(&cfg, &model);
        let trie = PrefixTrie::from_cfg(&cfg).unwrap();

        let mut chart = Chart::new(&cfg, &trie, &model, ChartConfig::default());
        match chart.best_first(1).unwrap() {
            Some(best) => prop_assert!(close(best, expected)),
            None => prop_assert!(expected.is_zero()),
        }

        let mut chart = Chart::new(&cfg, &trie, &model, ChartConfig::default());
        chart.run().unwrap();
        match chart.to_hypergraph() {
            Some(forest) => prop_assert!(close(forest.viterbi(), expected)),
            None => prop_assert!(expected.is_zero()),
        }
    }
}
