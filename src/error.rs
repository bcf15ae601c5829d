use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("relay unavailable: {0}")]
    Unavailable(String),
    #[error("channel '{0}' is closed")]
    ChannelClosed(String),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown event '{0}'")]
    UnknownEvent(String),
    #[error("malformed '{event}' payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Local reasons a vote never leaves the participant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoteRejected {
    #[error("results are visible, voting is locked")]
    ResultsVisible,
    #[error("already voted on question {question_id}")]
    AlreadyVoted { question_id: i64 },
    #[error("'{0}' is already your vote")]
    SameChoice(String),
    #[error("'{0}' is not an option of the current question")]
    UnknownOption(String),
    #[error("there is no current question")]
    NoCurrentQuestion,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("only the admin can do that")]
    NotAdmin,
    #[error("results are already visible")]
    ResultsAlreadyVisible,
    #[error("show the results before moving on")]
    ResultsHidden,
    #[error("already at the last question")]
    LastQuestion,
    #[error(transparent)]
    Vote(#[from] VoteRejected),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("Invalid admin password")]
    InvalidAdminPassword,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("a question needs at least one option")]
    NoOptions,
    #[error("option '{0}' appears more than once")]
    DuplicateOption(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a boolean, got '{value}'")]
    InvalidFlag { key: String, value: String },
}
