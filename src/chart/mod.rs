//! Best-first Earley intersection of a grammar with a finite-state scorer.
//!
//! Active items walk the prefix trie of the grammar; their priority is the
//! weight recognized so far times the trie bound of their position times the
//! priority of the item that predicted them. An item only creates the
//! successor for its next trie edge while that edge can beat the best other
//! item on the agenda; otherwise the rest of its edges is deferred. Since
//! scores and weights do not exceed `one`, items leave the agenda in
//! non-increasing order and the first goal popped is the best derivation.

mod forest;
mod item;

pub use self::item::{ActiveBack, ItemKey, ItemPrio, PassiveKey, StateId};

use self::item::Task;
use crate::cfg::{Cfg, NtHandle, RuleHandle};
use crate::error::{Error, Result};
use crate::fsa::FsaScorer;
use crate::hypergraph::{is_terminal, nt_index, WordId};
use crate::trie::{NodeId, PrefixTrie, TrieEdge};
use crate::util::Weight;
use agenda::{Agenda, BinaryHeap, LimitedHeap, Weighted};
use fnv::{FnvHashMap, FnvHashSet};
use integeriser::{HashIntegeriser, Integeriser};
use serde::Deserialize;
use tracing::{debug, debug_span};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Stop after this many agenda pops.
    pub pop_limit: Option<usize>,
    /// Keep at most this many items on the agenda.
    pub beam: Option<usize>,
    /// Remember the priority of every pop (see `Chart::popped`).
    pub record_pops: bool,
}

impl ChartConfig {
    pub fn validate(&self) -> Result<()> {
        if self.beam == Some(0) {
            return Err(Error::invalid("beam", "must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChartStats {
    pub pops: usize,
    pub pushes: usize,
    /// Items evicted by the beam.
    pub dropped: usize,
    pub active_items: usize,
    pub passive_items: usize,
    pub goals: usize,
}

/// The agenda of a chart: unbounded, or a beam.
pub(crate) enum ChartAgenda<T: Weighted>
where
    T::Weight: Ord,
{
    Unbounded(BinaryHeap<T>),
    Beam(LimitedHeap<T>),
}

impl<T: Weighted> Agenda for ChartAgenda<T>
where
    T::Weight: Ord,
{
    type Item = T;

    fn push(&mut self, element: T) -> Option<T> {
        match self {
            ChartAgenda::Unbounded(heap) => Agenda::push(heap, element),
            ChartAgenda::Beam(heap) => Agenda::push(heap, element),
        }
    }

    fn pop(&mut self) -> Option<T> {
        match self {
            ChartAgenda::Unbounded(heap) => Agenda::pop(heap),
            ChartAgenda::Beam(heap) => Agenda::pop(heap),
        }
    }

    fn peek(&self) -> Option<&T> {
        match self {
            ChartAgenda::Unbounded(heap) => Agenda::peek(heap),
            ChartAgenda::Beam(heap) => Agenda::peek(heap),
        }
    }

    fn len(&self) -> usize {
        match self {
            ChartAgenda::Unbounded(heap) => Agenda::len(heap),
            ChartAgenda::Beam(heap) => Agenda::len(heap),
        }
    }
}

struct ActiveEntry<W> {
    prio: ItemPrio<W>,
    backs: Vec<ActiveBack<W>>,
}

struct PassiveEntry<W> {
    inside: W,
    /// Position in the order in which passive items were finished.
    rank: usize,
    backs: Vec<(ItemKey, RuleHandle)>,
}

/// An active item waiting for a nonterminal to complete.
#[derive(Clone, Copy)]
struct Waiter<W> {
    key: ItemKey,
    dest: NodeId,
    /// The item's forward weight times the delta of the nonterminal edge.
    edge: W,
    inner: W,
}

#[derive(Clone, Copy, Debug)]
struct GoalEntry<W> {
    r: StateId,
    finish: W,
    weight: W,
}

pub struct Chart<'a, W: Weight, S: FsaScorer<W>> {
    cfg: &'a Cfg<W>,
    trie: &'a PrefixTrie<W>,
    scorer: &'a S,
    config: ChartConfig,
    agenda: ChartAgenda<Task<W>>,
    states: HashIntegeriser<S::State>,
    scans: FnvHashMap<(StateId, WordId), (W, StateId)>,
    start: StateId,
    started: bool,
    active: FnvHashMap<ItemKey, ActiveEntry<W>>,
    passive: FnvHashMap<PassiveKey, PassiveEntry<W>>,
    finished: FnvHashMap<(NtHandle, StateId), Vec<(StateId, W)>>,
    waiters: FnvHashMap<(NtHandle, StateId), Vec<Waiter<W>>>,
    predicted: FnvHashSet<(NtHandle, StateId)>,
    goals: Vec<GoalEntry<W>>,
    popped: Vec<W>,
    stats: ChartStats,
}

impl<'a, W: Weight, S: FsaScorer<W>> Chart<'a, W, S> {
    pub fn new(cfg: &'a Cfg<W>, trie: &'a PrefixTrie<W>, scorer: &'a S, config: ChartConfig) -> Self {
        let agenda = match config.beam {
            Some(beam) => ChartAgenda::Beam(LimitedHeap::with_capacity(beam)),
            None => ChartAgenda::Unbounded(BinaryHeap::new()),
        };
        let mut states = HashIntegeriser::new();
        let start = states.integerise(scorer.start());
        Chart {
            cfg,
            trie,
            scorer,
            config,
            agenda,
            states,
            scans: FnvHashMap::default(),
            start,
            started: false,
            active: FnvHashMap::default(),
            passive: FnvHashMap::default(),
            finished: FnvHashMap::default(),
            waiters: FnvHashMap::default(),
            predicted: FnvHashSet::default(),
            goals: Vec::new(),
            popped: Vec::new(),
            stats: ChartStats::default(),
        }
    }

    /// Runs until the agenda is empty or the pop limit is reached. Returns
    /// the weight of the best derivation, including the weight pushed out of
    /// the grammar, or `None` if no derivation was found.
    pub fn run(&mut self) -> Result<Option<W>> {
        self.search(false)
    }

    /// Runs until the best derivation is found. Only `k == 1` is supported.
    pub fn best_first(&mut self, k: usize) -> Result<Option<W>> {
        if k != 1 {
            return Err(Error::Unsupported(format!(
                "best-first search for the {} best derivations",
                k
            )));
        }
        self.search(true)
    }

    /// Weight of the best derivation found so far, see `run`.
    pub fn best(&self) -> Option<W> {
        self.goals
            .first()
            .map(|goal| goal.weight * self.cfg.pushed_inside)
    }

    pub fn stats(&self) -> ChartStats {
        ChartStats {
            active_items: self.active.len(),
            passive_items: self.passive.len(),
            goals: self.goals.len(),
            ..self.stats
        }
    }

    /// Forward weights of the popped items, in pop order, if recorded.
    pub fn popped(&self) -> &[W] {
        &self.popped
    }

    pub fn is_finished(&self, key: &PassiveKey) -> bool {
        self.passive.contains_key(key)
    }

    /// Best inside weight of a finished passive item.
    pub fn passive_inside(&self, key: &PassiveKey) -> Option<W> {
        self.passive.get(key).map(|entry| entry.inside)
    }

    pub fn start_state(&self) -> StateId {
        self.start
    }

    pub fn state(&self, id: StateId) -> Option<&S::State> {
        self.states.find_value(id)
    }

    fn search(&mut self, stop_at_goal: bool) -> Result<Option<W>> {
        let _span = debug_span!("chart", goal = self.cfg.goal_nt, stop_at_goal).entered();
        if !self.started {
            self.started = true;
            let goal = self.cfg.goal_nt;
            let entry = self.trie.entry(goal)?;
            self.predicted.insert((goal, self.start));
            let forward = self.trie.node(entry).p;
            self.push(Task::Arrive {
                key: ItemKey {
                    dot: entry,
                    q: self.start,
                    r: self.start,
                },
                prio: ItemPrio {
                    forward,
                    inner: W::one(),
                },
                back: ActiveBack::Predicted,
            });
        }

        while let Some(task) = self.agenda.pop() {
            self.stats.pops += 1;
            if self.config.record_pops {
                self.popped.push(task.prio().forward);
            }
            let reached_goal = self.process(task)?;
            if stop_at_goal && reached_goal {
                break;
            }
            if let Some(limit) = self.config.pop_limit {
                if self.stats.pops >= limit {
                    break;
                }
            }
        }

        let stats = self.stats();
        debug!(
            pops = stats.pops,
            pushes = stats.pushes,
            dropped = stats.dropped,
            active = stats.active_items,
            passive = stats.passive_items,
            goals = stats.goals,
            "chart search"
        );
        Ok(self.best())
    }

    fn push(&mut self, task: Task<W>) {
        if task.prio().forward.is_zero() {
            return;
        }
        self.stats.pushes += 1;
        if self.agenda.push(task).is_some() {
            self.stats.dropped += 1;
        }
    }

    /// Returns whether a goal was popped.
    fn process(&mut self, task: Task<W>) -> Result<bool> {
        match task {
            Task::Arrive { key, prio, back } => {
                if let Some(entry) = self.active.get_mut(&key) {
                    entry.backs.push(back);
                    return Ok(false);
                }
                self.active.insert(
                    key,
                    ActiveEntry {
                        prio,
                        backs: vec![back],
                    },
                );
                self.expand(key, prio, 0)?;
            }
            Task::Resume { key, cursor, .. } => {
                if let Some(prio) = self.active.get(&key).map(|entry| entry.prio) {
                    self.expand(key, prio, cursor)?;
                }
            }
            Task::Passive { key, prio, back } => {
                if let Some(entry) = self.passive.get_mut(&key) {
                    entry.backs.push(back);
                    return Ok(false);
                }
                self.finish_passive(key, prio, back);
            }
            Task::Goal { r, prio, finish } => {
                self.goals.push(GoalEntry {
                    r,
                    finish,
                    weight: prio.forward,
                });
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Creates the successors of `key` along its trie edges from `cursor`
    /// on, as long as they can beat the rest of the agenda.
    fn expand(&mut self, key: ItemKey, prio: ItemPrio<W>, cursor: usize) -> Result<()> {
        let trie = self.trie;
        let node = trie.node(key.dot);
        for (i, edge) in node.edges.iter().enumerate().skip(cursor) {
            let delta = edge.p();
            let edge_prio = prio.forward * delta;
            if edge_prio.is_zero() {
                break;
            }
            let second_best = self.agenda.peek_weight().map(|w| w.0.forward);
            if second_best.map_or(false, |best| edge_prio < best) {
                self.push(Task::Resume {
                    key,
                    cursor: i,
                    prio: ItemPrio {
                        forward: edge_prio,
                        inner: prio.inner,
                    },
                });
                return Ok(());
            }
            match *edge {
                TrieEdge::Symbol { symbol, dest, .. } if is_terminal(symbol) => {
                    self.scan_edge(key, prio, symbol, dest, delta)
                }
                TrieEdge::Symbol { symbol, dest, .. } => {
                    self.predict_edge(key, prio, nt_index(symbol), dest, edge_prio)?
                }
                TrieEdge::Final { rule, .. } => self.complete_rule(key, prio, node.nt(), rule, delta),
            }
        }
        Ok(())
    }

    fn scan(&mut self, state: StateId, word: WordId) -> (W, StateId) {
        if let Some(&hit) = self.scans.get(&(state, word)) {
            return hit;
        }
        let (score, next) = match self.states.find_value(state) {
            Some(s) => self.scorer.scan(s, word),
            None => return (W::zero(), state),
        };
        let next = self.states.integerise(next);
        self.scans.insert((state, word), (score, next));
        (score, next)
    }

    fn scan_edge(&mut self, key: ItemKey, prio: ItemPrio<W>, word: WordId, dest: NodeId, delta: W) {
        let (score, r) = self.scan(key.r, word);
        self.push(Task::Arrive {
            key: ItemKey { dot: dest, q: key.q, r },
            prio: ItemPrio {
                forward: prio.forward * delta * score,
                inner: prio.inner * score,
            },
            back: ActiveBack::Scanned {
                prev: key,
                word,
                score,
            },
        });
    }

    /// Predicts `nt` in state `key.r` (once), waits for it, and combines
    /// with the completions of `nt` that are already finished.
    fn predict_edge(
        &mut self,
        key: ItemKey,
        prio: ItemPrio<W>,
        nt: NtHandle,
        dest: NodeId,
        edge: W,
    ) -> Result<()> {
        if self.predicted.insert((nt, key.r)) {
            let entry = self.trie.entry(nt)?;
            let bound = self.trie.node(entry).p;
            self.push(Task::Arrive {
                key: ItemKey {
                    dot: entry,
                    q: key.r,
                    r: key.r,
                },
                prio: ItemPrio {
                    forward: edge * bound,
                    inner: W::one(),
                },
                back: ActiveBack::Predicted,
            });
        }
        let waiter = Waiter {
            key,
            dest,
            edge,
            inner: prio.inner,
        };
        self.waiters.entry((nt, key.r)).or_insert_with(Vec::new).push(waiter);
        let done = self.finished.get(&(nt, key.r)).cloned().unwrap_or_default();
        for (r, inside) in done {
            self.combine(waiter, PassiveKey { nt, q: key.r, r }, inside);
        }
        Ok(())
    }

    fn combine(&mut self, waiter: Waiter<W>, child: PassiveKey, inside: W) {
        self.push(Task::Arrive {
            key: ItemKey {
                dot: waiter.dest,
                q: waiter.key.q,
                r: child.r,
            },
            prio: ItemPrio {
                forward: waiter.edge * inside,
                inner: waiter.inner * inside,
            },
            back: ActiveBack::Completed {
                prev: waiter.key,
                child,
            },
        });
    }

    fn complete_rule(
        &mut self,
        key: ItemKey,
        prio: ItemPrio<W>,
        lhs: Option<NtHandle>,
        rule: RuleHandle,
        delta: W,
    ) {
        let nt = match lhs {
            Some(nt) => nt,
            None => return,
        };
        let p = self.cfg.rules[rule].p;
        self.push(Task::Passive {
            key: PassiveKey {
                nt,
                q: key.q,
                r: key.r,
            },
            prio: ItemPrio {
                forward: prio.forward * delta,
                inner: prio.inner * p,
            },
            back: (key, rule),
        });
    }

    fn finish_passive(&mut self, key: PassiveKey, prio: ItemPrio<W>, back: (ItemKey, RuleHandle)) {
        let inside = prio.inner;
        let rank = self.passive.len();
        self.passive.insert(
            key,
            PassiveEntry {
                inside,
                rank,
                backs: vec![back],
            },
        );
        self.finished
            .entry((key.nt, key.q))
            .or_insert_with(Vec::new)
            .push((key.r, inside));
        let waiting = self.waiters.get(&(key.nt, key.q)).cloned().unwrap_or_default();
        for waiter in waiting {
            self.combine(waiter, key, inside);
        }
        if key.nt == self.cfg.goal_nt && key.q == self.start {
            let finish = match self.states.find_value(key.r) {
                Some(state) => self.scorer.finish(state),
                None => W::zero(),
            };
            let weight = inside * finish;
            self.push(Task::Goal {
                r: key.r,
                prio: ItemPrio {
                    forward: weight,
                    inner: weight,
                },
                finish,
            });
        }
    }
}
