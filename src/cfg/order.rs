use super::{Cfg, NtHandle};
use crate::util::Weight;
use tracing::warn;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Fresh,
    Open,
    Done,
}

impl<W: Weight> Cfg<W> {
    /// The nonterminals reachable from the goal, each placed after all
    /// nonterminals its rules refer to. A cyclic grammar gets some order
    /// that is not topological; with `warn_cycles` every back edge is logged.
    pub fn order_nts_topo(&self, warn_cycles: bool) -> Vec<NtHandle> {
        let mut marks = vec![Mark::Fresh; self.nts.len()];
        let mut order = Vec::with_capacity(self.nts.len());
        if self.goal_nt >= self.nts.len() {
            return order;
        }
        // each frame is a nonterminal, its children and the next child to visit
        marks[self.goal_nt] = Mark::Open;
        let mut stack = vec![(self.goal_nt, self.children(self.goal_nt), 0)];
        while let Some(top) = stack.last_mut() {
            let nt = top.0;
            let child = match top.1.get(top.2) {
                Some(&child) => child,
                None => {
                    stack.pop();
                    marks[nt] = Mark::Done;
                    order.push(nt);
                    continue;
                }
            };
            top.2 += 1;
            match marks.get(child).cloned() {
                Some(Mark::Fresh) => {
                    marks[child] = Mark::Open;
                    stack.push((child, self.children(child), 0));
                }
                Some(Mark::Open) if warn_cycles => warn!(
                    from = %self.nt_name(nt),
                    to = %self.nt_name(child),
                    "cycle in nonterminal references, order is not topological"
                ),
                _ => (),
            }
        }
        order
    }

    fn children(&self, nt: NtHandle) -> Vec<NtHandle> {
        self.rules_of(nt).flat_map(|(_, rule)| rule.rhs_nts()).collect()
    }
}
