//! Wire contract shared with the relay and every other client.
//!
//! Each event travels as an `(event name, JSON payload)` pair. The names and
//! payload keys here must stay exactly as they are: browsers on the same
//! channel decode them by these spellings.

use crate::error::ProtocolError;
use crate::models::{PollSnapshot, Question};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const VOTE_UPDATE: &str = "vote-update";
pub const SHOW_RESULTS: &str = "show-results";
pub const NEXT_QUESTION: &str = "next-question";
pub const RESET_SESSION: &str = "reset-session";
pub const SESSION_START: &str = "session-start";
pub const SESSION_END: &str = "session-end";
pub const SYNC_STATE: &str = "sync-state";

/// One message as it crosses the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteUpdate {
    pub questions: Vec<Question>,
    pub current_question_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextQuestion {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSession {
    pub questions: Vec<Question>,
}

/// Serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    VoteUpdate(VoteUpdate),
    ShowResults(ShowResults),
    NextQuestion(NextQuestion),
    ResetSession(ResetSession),
    SessionStart,
    SessionEnd,
    SyncState(PollSnapshot),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::VoteUpdate(_) => VOTE_UPDATE,
            Event::ShowResults(_) => SHOW_RESULTS,
            Event::NextQuestion(_) => NEXT_QUESTION,
            Event::ResetSession(_) => RESET_SESSION,
            Event::SessionStart => SESSION_START,
            Event::SessionEnd => SESSION_END,
            Event::SyncState(_) => SYNC_STATE,
        }
    }

    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Event::VoteUpdate(p) => serde_json::to_value(p),
            Event::ShowResults(p) => serde_json::to_value(p),
            Event::NextQuestion(p) => serde_json::to_value(p),
            Event::ResetSession(p) => serde_json::to_value(p),
            Event::SessionStart | Event::SessionEnd => serde_json::to_value(Empty {}),
            Event::SyncState(p) => serde_json::to_value(p),
        }
    }

    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        Ok(Frame {
            event: self.name().to_string(),
            payload: self.payload()?,
        })
    }

    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        let event = match frame.event.as_str() {
            VOTE_UPDATE => Event::VoteUpdate(decode(frame)?),
            SHOW_RESULTS => Event::ShowResults(decode(frame)?),
            NEXT_QUESTION => Event::NextQuestion(decode(frame)?),
            RESET_SESSION => Event::ResetSession(decode(frame)?),
            // The relay sends `{}` here; whatever else arrives is ignored.
            SESSION_START => Event::SessionStart,
            SESSION_END => Event::SessionEnd,
            SYNC_STATE => Event::SyncState(decode(frame)?),
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };
        Ok(event)
    }
}

fn decode<T: DeserializeOwned>(frame: &Frame) -> Result<T, ProtocolError> {
    serde_json::from_value(frame.payload.clone()).map_err(|source| ProtocolError::Malformed {
        event: frame.event.clone(),
        source,
    })
}
