//! Per-participant poll state and the reducer that folds inbound events into
//! it.
//!
//! Every transition replaces whole parts of the state with what the event
//! carries. Nothing is merged: the sender already computed the full result
//! from its own copy, and receivers take it as given.

use crate::models::{PollSnapshot, Role, SessionPhase, VoteRecord};
use crate::protocol::Event;
use log::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollState {
    pub snapshot: PollSnapshot,
    pub phase: SessionPhase,
    pub vote_record: VoteRecord,
}

impl PollState {
    /// Default question set, first question, results hidden, waiting.
    pub fn initial() -> Self {
        Self::default()
    }

    /// Returns the state after `event`, as seen by a participant with `role`.
    /// Events that cannot apply leave the state as it was.
    pub fn apply(&self, event: &Event, role: Role) -> PollState {
        let mut next = self.clone();
        match event {
            Event::VoteUpdate(update) => {
                next.snapshot.questions = update.questions.clone();
            }
            Event::ShowResults(show) => {
                next.snapshot.results_visible = true;
                if let Some(questions) = &show.questions {
                    next.snapshot.questions = questions.clone();
                }
            }
            Event::NextQuestion(nq) => {
                if nq.index >= next.snapshot.questions.len() {
                    warn!(
                        "Ignoring next-question to index {} with {} question(s)",
                        nq.index,
                        next.snapshot.questions.len()
                    );
                    return next;
                }
                next.snapshot.current_question_index = nq.index;
                next.snapshot.results_visible = false;
            }
            Event::ResetSession(reset) => {
                next.snapshot.questions = reset.questions.clone();
                next.snapshot.current_question_index = 0;
                next.snapshot.results_visible = false;
                next.vote_record.clear();
            }
            Event::SessionStart => {
                if next.phase == SessionPhase::Ended {
                    debug!("Session already ended, ignoring session-start");
                } else {
                    next.phase = SessionPhase::Active;
                }
            }
            Event::SessionEnd => {
                next.phase = SessionPhase::Ended;
            }
            Event::SyncState(snapshot) => {
                if role == Role::Admin {
                    debug!("Admin ignores sync-state");
                } else if !snapshot.index_is_valid() {
                    warn!(
                        "Ignoring sync-state with index {} over {} question(s)",
                        snapshot.current_question_index,
                        snapshot.questions.len()
                    );
                } else {
                    next.snapshot = snapshot.clone();
                }
            }
        }
        next
    }
}
