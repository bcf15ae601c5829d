pub mod plurality;

use crate::config::Config;
use crate::error::VoteRejected;
use crate::models::Question;

/// What happens when a revote takes a tally below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TallyFloor {
    /// Plain arithmetic; counts can go negative when a decrement races ahead
    /// of the increment it undoes.
    #[default]
    Unbounded,
    Zero,
}

/// Which of the two voting variants this participant runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotePolicy {
    pub allow_revote: bool,
    pub lock_on_reveal: bool,
    pub tally_floor: TallyFloor,
}

impl Default for VotePolicy {
    fn default() -> Self {
        Self {
            allow_revote: false,
            lock_on_reveal: true,
            tally_floor: TallyFloor::Unbounded,
        }
    }
}

impl From<&Config> for VotePolicy {
    fn from(config: &Config) -> Self {
        Self {
            allow_revote: config.allow_revote,
            lock_on_reveal: config.lock_votes_on_reveal,
            tally_floor: if config.clamp_tallies {
                TallyFloor::Zero
            } else {
                TallyFloor::Unbounded
            },
        }
    }
}

/// Decides locally whether a vote may be cast at all. A rejected vote is
/// never published.
pub fn check_vote(
    policy: &VotePolicy,
    question: Option<&Question>,
    results_visible: bool,
    previous: Option<&str>,
    choice: &str,
) -> Result<(), VoteRejected> {
    let question = question.ok_or(VoteRejected::NoCurrentQuestion)?;

    if results_visible && policy.lock_on_reveal {
        return Err(VoteRejected::ResultsVisible);
    }
    if !question.has_option(choice) {
        return Err(VoteRejected::UnknownOption(choice.to_string()));
    }

    match previous {
        Some(_) if !policy.allow_revote => Err(VoteRejected::AlreadyVoted {
            question_id: question.id,
        }),
        Some(prev) if prev == choice => Err(VoteRejected::SameChoice(choice.to_string())),
        _ => Ok(()),
    }
}
