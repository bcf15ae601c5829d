pub mod initial;

use crate::error::ModelError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Option text -> count, kept in option order so the wire form matches what
/// other clients produce.
pub type Tally = IndexMap<String, i64>;

/// Question id -> the option this participant picked. Never broadcast.
pub type VoteRecord = BTreeMap<i64, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub votes: Tally,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSnapshot {
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub results_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Waiting,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Participant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

impl Question {
    pub fn new(
        id: i64,
        title: &str,
        description: &str,
        options: &[&str],
        order: i64,
    ) -> Result<Self, ModelError> {
        if options.is_empty() {
            return Err(ModelError::NoOptions);
        }

        let mut seen = HashSet::new();
        for option in options {
            if !seen.insert(*option) {
                return Err(ModelError::DuplicateOption(option.to_string()));
            }
        }

        let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        let votes = options.iter().map(|o| (o.clone(), 0)).collect();

        Ok(Self {
            id,
            title: title.to_string(),
            description: description.to_string(),
            options,
            votes,
            order,
        })
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    pub fn tally(&self, option: &str) -> i64 {
        self.votes.get(option).copied().unwrap_or(0)
    }

    pub fn total_votes(&self) -> i64 {
        self.votes.values().sum()
    }

    /// Same question with every option counted at zero.
    pub fn zeroed(&self) -> Self {
        Self {
            votes: self.options.iter().map(|o| (o.clone(), 0)).collect(),
            ..self.clone()
        }
    }
}

impl PollSnapshot {
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// An index is usable when it points at a question, or when there are no
    /// questions at all and it is zero.
    pub fn index_is_valid(&self) -> bool {
        self.current_question_index < self.questions.len()
            || (self.questions.is_empty() && self.current_question_index == 0)
    }
}

impl Default for PollSnapshot {
    fn default() -> Self {
        Self {
            questions: initial::initial_questions(),
            current_question_index: 0,
            results_visible: false,
        }
    }
}

impl User {
    pub fn new(name: String, is_admin: bool) -> Self {
        Self {
            name,
            is_admin,
            joined_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        if self.is_admin { Role::Admin } else { Role::Participant }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_question_starts_every_option_at_zero() {
        let q = Question::new(7, "Title", "Desc", &["Yes", "No"], 1).unwrap();
        assert_eq!(q.tally("Yes"), 0);
        assert_eq!(q.tally("No"), 0);
        assert_eq!(q.votes.keys().collect::<Vec<_>>(), vec!["Yes", "No"]);
    }

    #[test]
    fn question_rejects_empty_and_duplicate_options() {
        assert_eq!(Question::new(1, "t", "d", &[], 1), Err(ModelError::NoOptions));
        assert_eq!(
            Question::new(1, "t", "d", &["A", "B", "A"], 1),
            Err(ModelError::DuplicateOption("A".to_string()))
        );
    }

    #[test]
    fn question_serializes_with_votes_in_option_order() {
        let mut q = Question::new(2, "T", "D", &["Yes", "No"], 2).unwrap();
        q.votes.insert("No".to_string(), 3);
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"id":2,"title":"T","description":"D","options":["Yes","No"],"#,
                r#""votes":{"Yes":0,"No":3},"order":2}"#
            )
        );
    }

    #[test]
    fn snapshot_uses_camel_case_keys() {
        let snapshot = PollSnapshot {
            questions: vec![],
            current_question_index: 0,
            results_visible: true,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"questions":[],"currentQuestionIndex":0,"resultsVisible":true}"#);
    }

    #[test]
    fn zeroed_clears_counts_but_keeps_identity() {
        let mut q = Question::new(3, "T", "D", &["A", "B"], 3).unwrap();
        q.votes.insert("A".to_string(), 4);
        let z = q.zeroed();
        assert_eq!(z.id, 3);
        assert_eq!(z.total_votes(), 0);
    }
}
