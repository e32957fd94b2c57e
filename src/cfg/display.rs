use super::{Cfg, RhsSymbol, RuleHandle};
use crate::hypergraph::Vocabulary;
use crate::util::Weight;
use std::fmt::{self, Display, Formatter};

/// Renders a rule as `[lhs] -> a [B] c ||| p`. Terminals are looked up in
/// the vocabulary if there is one.
pub struct RuleDisplay<'a, W> {
    cfg: &'a Cfg<W>,
    rule: RuleHandle,
    vocab: Option<&'a Vocabulary>,
}

impl<'a, W> RuleDisplay<'a, W> {
    pub fn new(cfg: &'a Cfg<W>, rule: RuleHandle, vocab: Option<&'a Vocabulary>) -> Self {
        RuleDisplay { cfg, rule, vocab }
    }
}

fn write_terminal(f: &mut Formatter, vocab: Option<&Vocabulary>, w: i32) -> fmt::Result {
    match vocab.and_then(|v| v.word(w)) {
        Some(word) => write!(f, "{}", word),
        None => write!(f, "{}", w),
    }
}

impl<'a, W: Weight> Display for RuleDisplay<'a, W> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let rule = &self.cfg.rules[self.rule];
        if rule.is_null() {
            return write!(f, "<null>");
        }
        write!(f, "[{}] ->", self.cfg.nt_name(rule.lhs))?;
        for symbol in rule.symbols() {
            write!(f, " ")?;
            match symbol {
                RhsSymbol::Terminal(w) => write_terminal(f, self.vocab, w)?,
                RhsSymbol::Nt(n) => write!(f, "[{}]", self.cfg.nt_name(n))?,
            }
        }
        write!(f, " ||| {:?}", rule.p)?;
        for (k, v) in &rule.f {
            write!(f, " {}={}", k, v)?;
        }
        Ok(())
    }
}

/// Renders the goal and then every rule, grouped by lhs.
pub struct CfgDisplay<'a, W> {
    cfg: &'a Cfg<W>,
    vocab: Option<&'a Vocabulary>,
}

impl<'a, W> CfgDisplay<'a, W> {
    pub fn new(cfg: &'a Cfg<W>, vocab: Option<&'a Vocabulary>) -> Self {
        CfgDisplay { cfg, vocab }
    }
}

impl<'a, W: Weight> Display for CfgDisplay<'a, W> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "goal: [{}]", self.cfg.nt_name(self.cfg.goal_nt))?;
        for nt in 0..self.cfg.nts.len() {
            for (r, _) in self.cfg.rules_of(nt) {
                writeln!(f, "{}", RuleDisplay::new(self.cfg, r, self.vocab))?;
            }
        }
        Ok(())
    }
}
