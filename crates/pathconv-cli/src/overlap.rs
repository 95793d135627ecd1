//! Route overlap analysis.
//!
//! Every route is compiled to an anchored dense DFA. Two routes overlap when
//! the product of their automata reaches a state where both accept at end of
//! input; the path spelled on the way there is reported as a witness. A later
//! route whose language is contained in an earlier one can never be reached
//! and should be moved in front of it.
//!
//! The analysis is purely regular: a converter may still reject a fragment
//! its regex accepts, so an overlap here is a candidate, not a proof.
//! Exploration is bounded by `max_states` product states per question; pairs
//! that hit the bound are reported as undecided.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use pathconv_core::{PathconvError, PathconvResult};
use regex_automata::dfa::{dense, Automaton, StartKind};
use regex_automata::util::primitives::StateID;
use regex_automata::{Anchored, Input, MatchKind};

/// One route prepared for analysis.
pub struct RouteAutomaton {
    label: String,
    regex: String,
    dfa: dense::DFA<Vec<u32>>,
    start: StateID,
}

impl RouteAutomaton {
    /// Compiles `regex` (matched against the whole path) under a display
    /// label.
    ///
    /// # Errors
    ///
    /// [`PathconvError::ImproperlyConfigured`] if the regex cannot be turned
    /// into a DFA.
    pub fn new(label: impl Into<String>, regex: &str) -> PathconvResult<Self> {
        let dfa = dense::Builder::new()
            .configure(
                dense::Config::new()
                    .match_kind(MatchKind::All)
                    .start_kind(StartKind::Anchored),
            )
            .build(regex)
            .map_err(|e| {
                PathconvError::ImproperlyConfigured(format!(
                    "Cannot build an automaton for '{regex}': {e}"
                ))
            })?;
        let start = dfa
            .start_state_forward(&Input::new("").anchored(Anchored::Yes))
            .map_err(|e| {
                PathconvError::ImproperlyConfigured(format!(
                    "Cannot start an automaton for '{regex}': {e}"
                ))
            })?;
        Ok(Self {
            label: label.into(),
            regex: regex.to_string(),
            dfa,
            start,
        })
    }

    /// Returns the display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the source regex.
    pub fn regex(&self) -> &str {
        &self.regex
    }

    fn is_dead(&self, state: StateID) -> bool {
        self.dfa.is_dead_state(state) || self.dfa.is_quit_state(state)
    }

    fn accepts_here(&self, state: StateID) -> bool {
        self.dfa.is_match_state(self.dfa.next_eoi_state(state))
    }

    /// Returns `true` if the automaton accepts `path` in full.
    pub fn accepts(&self, path: &str) -> bool {
        let mut state = self.start;
        for &byte in path.as_bytes() {
            state = self.dfa.next_state(state, byte);
            if self.is_dead(state) {
                return false;
            }
        }
        self.accepts_here(state)
    }
}

impl fmt::Debug for RouteAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteAutomaton")
            .field("label", &self.label)
            .field("regex", &self.regex)
            .finish_non_exhaustive()
    }
}

/// Outcome of one bounded product search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Search {
    /// A path with the wanted property.
    Found(String),
    /// No such path exists.
    Exhausted,
    /// The state bound was hit first.
    Bounded,
}

/// Bytes in the order witnesses are built from: alphanumerics first, then
/// other printable ASCII, then everything else. Breadth-first search over
/// this order yields short, readable witnesses.
fn byte_order() -> Vec<u8> {
    let mut order: Vec<u8> = (b'0'..=b'9').chain(b'a'..=b'z').chain(b'A'..=b'Z').collect();
    order.extend((0x20..=0x7e_u8).filter(|b| !b.is_ascii_alphanumeric()));
    order.extend((0..=0xff_u8).filter(|b| !(0x20..=0x7e).contains(b)));
    order
}

type Pair = (StateID, StateID);

fn product_search(
    a: &RouteAutomaton,
    b: &RouteAutomaton,
    max_states: usize,
    prune: impl Fn(bool, bool) -> bool,
    goal: impl Fn(bool, bool) -> bool,
) -> Search {
    let order = byte_order();
    let start = (a.start, b.start);
    let mut parents: HashMap<Pair, (Pair, u8)> = HashMap::new();
    let mut seen: HashSet<Pair> = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(pair @ (sa, sb)) = queue.pop_front() {
        if goal(a.accepts_here(sa), b.accepts_here(sb)) {
            return Search::Found(spell(&parents, start, pair));
        }
        for &byte in &order {
            let next = (a.dfa.next_state(sa, byte), b.dfa.next_state(sb, byte));
            if prune(a.is_dead(next.0), b.is_dead(next.1)) || !seen.insert(next) {
                continue;
            }
            if seen.len() > max_states {
                tracing::debug!(a = %a.label, b = %b.label, max_states, "overlap search bounded");
                return Search::Bounded;
            }
            parents.insert(next, (pair, byte));
            queue.push_back(next);
        }
    }
    Search::Exhausted
}

fn spell(parents: &HashMap<Pair, (Pair, u8)>, start: Pair, mut pair: Pair) -> String {
    let mut bytes = Vec::new();
    while pair != start {
        let Some(&(prev, byte)) = parents.get(&pair) else {
            break;
        };
        bytes.push(byte);
        pair = prev;
    }
    bytes.reverse();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Searches for a path both automata accept.
pub fn intersection(a: &RouteAutomaton, b: &RouteAutomaton, max_states: usize) -> Search {
    product_search(a, b, max_states, |da, db| da || db, |aa, ab| aa && ab)
}

/// Searches for a path `b` accepts and `a` does not. [`Search::Exhausted`]
/// means the language of `b` is contained in that of `a`.
pub fn difference(a: &RouteAutomaton, b: &RouteAutomaton, max_states: usize) -> Search {
    product_search(a, b, max_states, |_, db| db, |aa, ab| ab && !aa)
}

/// A problem found between two routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Both routes match `witness`.
    Overlap {
        /// The route listed first.
        first: String,
        /// The route listed later.
        second: String,
        /// A path both routes match.
        witness: String,
    },
    /// Every path `later` matches is matched by `earlier` first.
    Unreachable {
        /// The route that shadows.
        earlier: String,
        /// The shadowed route.
        later: String,
    },
    /// The state bound was hit before the pair could be decided.
    Undecided {
        /// The route listed first.
        first: String,
        /// The route listed later.
        second: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlap {
                first,
                second,
                witness,
            } => write!(f, "overlap: {first} and {second} both match '{witness}'"),
            Self::Unreachable { earlier, later } => {
                write!(f, "reorder: {later} is shadowed by {earlier}; move it before {earlier}")
            }
            Self::Undecided { first, second } => {
                write!(f, "undecided: {first} and {second} exceeded the state bound")
            }
        }
    }
}

/// The result of auditing a list of routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapReport {
    /// Findings in pair order.
    pub findings: Vec<Finding>,
}

impl OverlapReport {
    /// Returns the number of overlapping pairs.
    pub fn overlaps(&self) -> usize {
        self.count(|f| matches!(f, Finding::Overlap { .. }))
    }

    /// Returns the number of shadowed routes that need reordering.
    pub fn reorders(&self) -> usize {
        self.count(|f| matches!(f, Finding::Unreachable { .. }))
    }

    /// Returns the number of pairs left undecided.
    pub fn undecided(&self) -> usize {
        self.count(|f| matches!(f, Finding::Undecided { .. }))
    }

    /// Returns `overlaps + reorders`, capped at 255.
    pub fn exit_status(&self) -> u8 {
        u8::try_from(self.overlaps() + self.reorders()).unwrap_or(u8::MAX)
    }

    fn count(&self, pred: impl Fn(&Finding) -> bool) -> usize {
        self.findings.iter().filter(|f| pred(f)).count()
    }
}

/// Checks every pair of routes, in order.
///
/// # Examples
///
/// ```
/// use pathconv_cli::overlap::{analyze, RouteAutomaton};
///
/// let routes = vec![
///     RouteAutomaton::new("<str:name>/", r"^(?P<name>[^/]+)/$").unwrap(),
///     RouteAutomaton::new("<int:pk>/", r"^(?P<pk>[0-9]+)/$").unwrap(),
/// ];
/// let report = analyze(&routes, 10_000);
/// assert_eq!(report.overlaps(), 1);
/// assert_eq!(report.reorders(), 1);
/// assert_eq!(report.exit_status(), 2);
/// ```
pub fn analyze(routes: &[RouteAutomaton], max_states: usize) -> OverlapReport {
    let mut report = OverlapReport::default();
    for (i, first) in routes.iter().enumerate() {
        for second in &routes[i + 1..] {
            match intersection(first, second, max_states) {
                Search::Exhausted => continue,
                Search::Bounded => {
                    report.findings.push(Finding::Undecided {
                        first: first.label.clone(),
                        second: second.label.clone(),
                    });
                    continue;
                }
                Search::Found(witness) => report.findings.push(Finding::Overlap {
                    first: first.label.clone(),
                    second: second.label.clone(),
                    witness,
                }),
            }
            match difference(first, second, max_states) {
                Search::Exhausted => report.findings.push(Finding::Unreachable {
                    earlier: first.label.clone(),
                    later: second.label.clone(),
                }),
                Search::Bounded => report.findings.push(Finding::Undecided {
                    first: first.label.clone(),
                    second: second.label.clone(),
                }),
                Search::Found(_) => {}
            }
        }
    }
    report
}
