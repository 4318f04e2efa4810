use serde::{Deserialize, Serialize};

/// The match's current top-level mode. Exactly one value is authoritative
/// per match; every change goes through [`PhaseMachine::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    /// Room open, waiting for the expected number of players.
    Waiting,
    /// All players registered; waiting for the start signal.
    Ready,
    Playing,
    Paused,
    GameOver,
    /// Terminal. The controller has been disposed.
    Terminated,
}

impl GamePhase {
    /// Whether `self → to` is one of the defined edges.
    pub fn can_transition_to(self, to: GamePhase) -> bool {
        use GamePhase::*;
        if self == to {
            return false;
        }
        if to == Terminated {
            return true;
        }
        matches!(
            (self, to),
            (Waiting, Ready)
                | (Ready, Playing)
                | (Playing, Paused)
                | (Paused, Playing)
                | (Playing, GameOver)
                | (GameOver, Ready)
        )
    }
}

/// Listener invoked with `(new, old)` after every successful transition.
pub type PhaseListener = Box<dyn FnMut(GamePhase, GamePhase) + Send>;

/// Explicit state machine owning the match phase. Collaborators hold a
/// reference to this instead of wiring up ad-hoc callback fields; they
/// observe changes via [`PhaseMachine::subscribe`].
pub struct PhaseMachine {
    phase: GamePhase,
    listeners: Vec<PhaseListener>,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            phase: GamePhase::Waiting,
            listeners: Vec::new(),
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn subscribe(&mut self, listener: PhaseListener) {
        self.listeners.push(listener);
    }

    /// Attempt a transition. Illegal edges are rejected and logged;
    /// the current phase is left unchanged. Returns whether the
    /// transition happened.
    pub fn transition(&mut self, to: GamePhase) -> bool {
        if !self.phase.can_transition_to(to) {
            tracing::warn!(from = ?self.phase, ?to, "Rejected phase transition");
            return false;
        }
        let old = self.phase;
        self.phase = to;
        for listener in &mut self.listeners {
            listener(to, old);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn starts_waiting() {
        let machine = PhaseMachine::new();
        assert_eq!(machine.phase(), GamePhase::Waiting);
    }

    #[test]
    fn full_match_lifecycle() {
        let mut m = PhaseMachine::new();
        assert!(m.transition(GamePhase::Ready));
        assert!(m.transition(GamePhase::Playing));
        assert!(m.transition(GamePhase::Paused));
        assert!(m.transition(GamePhase::Playing));
        assert!(m.transition(GamePhase::GameOver));
        assert!(m.transition(GamePhase::Ready));
        assert!(m.transition(GamePhase::Playing));
        assert!(m.transition(GamePhase::Terminated));
        assert_eq!(m.phase(), GamePhase::Terminated);
    }

    #[test]
    fn illegal_jump_rejected() {
        let mut m = PhaseMachine::new();
        assert!(!m.transition(GamePhase::Playing));
        assert_eq!(m.phase(), GamePhase::Waiting);
        assert!(!m.transition(GamePhase::GameOver));
        assert_eq!(m.phase(), GamePhase::Waiting);
    }

    #[test]
    fn terminated_is_terminal() {
        let mut m = PhaseMachine::new();
        assert!(m.transition(GamePhase::Terminated));
        assert!(!m.transition(GamePhase::Ready));
        assert!(!m.transition(GamePhase::Terminated));
    }

    #[test]
    fn listeners_see_old_and_new() {
        let mut m = PhaseMachine::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        m.subscribe(Box::new(move |new, old| {
            assert_eq!(old, GamePhase::Waiting);
            assert_eq!(new, GamePhase::Ready);
            seen2.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(m.transition(GamePhase::Ready));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rejected_transition_does_not_notify() {
        let mut m = PhaseMachine::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        m.subscribe(Box::new(move |_, _| {
            seen2.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!m.transition(GamePhase::Playing));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        const ALL: [GamePhase; 6] = [
            GamePhase::Waiting,
            GamePhase::Ready,
            GamePhase::Playing,
            GamePhase::Paused,
            GamePhase::GameOver,
            GamePhase::Terminated,
        ];

        proptest! {
            /// The machine never ends up in a phase that was not reachable
            /// via a legal edge, no matter what transition sequence is
            /// thrown at it.
            #[test]
            fn only_legal_edges_ever_taken(
                targets in proptest::collection::vec(0usize..ALL.len(), 1..40)
            ) {
                let mut m = PhaseMachine::new();
                for &t in &targets {
                    let from = m.phase();
                    let to = ALL[t];
                    let accepted = m.transition(to);
                    prop_assert_eq!(accepted, from.can_transition_to(to));
                    if accepted {
                        prop_assert_eq!(m.phase(), to);
                    } else {
                        prop_assert_eq!(m.phase(), from);
                    }
                }
            }

            /// Exhaustive edge table: a direct Waiting→Playing jump (and
            /// every other undefined pair) is never accepted.
            #[test]
            fn edge_table_is_exact(from_idx in 0usize..ALL.len(), to_idx in 0usize..ALL.len()) {
                let from = ALL[from_idx];
                let to = ALL[to_idx];
                let legal = from.can_transition_to(to);
                let expected = from != to
                    && (to == GamePhase::Terminated
                        || matches!(
                            (from, to),
                            (GamePhase::Waiting, GamePhase::Ready)
                                | (GamePhase::Ready, GamePhase::Playing)
                                | (GamePhase::Playing, GamePhase::Paused)
                                | (GamePhase::Paused, GamePhase::Playing)
                                | (GamePhase::Playing, GamePhase::GameOver)
                                | (GamePhase::GameOver, GamePhase::Ready)
                        ));
                prop_assert_eq!(legal, expected);
            }
        }
    }
}
