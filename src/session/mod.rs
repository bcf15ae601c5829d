pub mod outbox;

use chrono::Utc;
use crate::config::Config;
use crate::error::{ActionError, TransportError, VoteRejected};
use crate::models::{PollSnapshot, Question, Role, SessionPhase, User, VoteRecord};
use crate::protocol::{Event, Frame, NextQuestion, ResetSession, ShowResults, VoteUpdate};
use crate::state::PollState;
use crate::transport::{Subscription, Transport};
use crate::voting::{self, VotePolicy, plurality};
use log::{debug, info, warn};
use outbox::{Alert, OnFailure, Outbox};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

const VOTE_FAILED: &str = "Failed to save your vote. Please try again.";

/// Which screen a participant should be looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Waiting,
    Question,
    Results,
    Ended,
}

/// Read-only view handed to whatever renders the poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub results_visible: bool,
    pub session_phase: SessionPhase,
    pub local_vote_record: VoteRecord,
}

/// One logged-in participant.
///
/// All mutation happens on `&mut self`, either from a local action or from a
/// frame taken off the subscription. Publishes go out through the outbox and
/// are never awaited before the local state moves on.
pub struct Session {
    id: Uuid,
    label: String,
    user: User,
    policy: VotePolicy,
    transport: Arc<dyn Transport>,
    subscription: Subscription,
    outbox: Outbox,
    alerts: mpsc::UnboundedReceiver<Alert>,
    state: PollState,
}

impl Session {
    /// Logs `user` in with a fresh default state.
    pub fn join(
        user: User,
        transport: Arc<dyn Transport>,
        config: &Config,
    ) -> Result<Self, TransportError> {
        Self::resume(user, PollState::initial(), transport, config)
    }

    /// Logs `user` in on top of a state kept from an earlier login.
    ///
    /// Subscribes first, then, for the admin only, republishes the current
    /// snapshot as `sync-state` so participants already listening catch up.
    /// Anyone who subscribes later waits for the next admin event.
    pub fn resume(
        user: User,
        state: PollState,
        transport: Arc<dyn Transport>,
        config: &Config,
    ) -> Result<Self, TransportError> {
        let id = Uuid::new_v4();
        let subscription = transport.subscribe(&config.channel)?;
        let (alert_tx, alert_rx) = mpsc::unbounded_channel();
        let label = format!("{} {}", user.name, id);
        let outbox = Outbox::new(
            Arc::clone(&transport),
            config.channel.clone(),
            label.clone(),
            alert_tx,
        );

        let mut session = Self {
            id,
            label,
            user,
            policy: VotePolicy::from(config),
            transport,
            subscription,
            outbox,
            alerts: alert_rx,
            state,
        };
        info!("[{}] joined '{}'", session.label, config.channel);

        if session.user.is_admin {
            info!("[{}] admin resync of current snapshot", session.label);
            let snapshot = session.state.snapshot.clone();
            session.outbox.send(Event::SyncState(snapshot), OnFailure::Log);
        }
        Ok(session)
    }

    /// Ends this login. The returned state can be handed to `resume`.
    pub async fn logout(mut self) -> PollState {
        self.outbox.settle().await;
        let channel = self.subscription.channel().to_string();
        drop(self.subscription);
        self.transport.unsubscribe(&channel);
        let online = Utc::now() - self.user.joined_at;
        info!(
            "[{}] logged out after {}s (joined {})",
            self.label,
            online.num_seconds(),
            self.user.joined_at.to_rfc3339()
        );
        self.state
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// `name uuid`, the prefix of every log line this session writes.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn snapshot(&self) -> &PollSnapshot {
        &self.state.snapshot
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            questions: self.state.snapshot.questions.clone(),
            current_question_index: self.state.snapshot.current_question_index,
            results_visible: self.state.snapshot.results_visible,
            session_phase: self.state.phase,
            local_vote_record: self.state.vote_record.clone(),
        }
    }

    pub fn screen(&self) -> Screen {
        if !self.user.is_admin {
            match self.state.phase {
                SessionPhase::Waiting => return Screen::Waiting,
                SessionPhase::Ended => return Screen::Ended,
                SessionPhase::Active => {}
            }
        }
        if self.state.snapshot.results_visible {
            Screen::Results
        } else {
            Screen::Question
        }
    }

    /// Alerts raised since the last call.
    pub fn take_alerts(&mut self) -> Vec<Alert> {
        let mut alerts = Vec::new();
        while let Ok(alert) = self.alerts.try_recv() {
            alerts.push(alert);
        }
        alerts
    }

    // --- inbound ---

    /// Folds one frame into the local state. Frames that do not decode are
    /// dropped and the state stays as it was.
    pub fn handle_frame(&mut self, frame: &Frame) {
        match Event::from_frame(frame) {
            Ok(event) => {
                debug!("[{}] applying '{}'", self.label, event.name());
                self.state = self.state.apply(&event, self.user.role());
            }
            Err(e) => warn!("[{}] dropped inbound frame: {}", self.label, e),
        }
    }

    /// Applies every frame already queued, returning how many there were.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Some(frame) = self.subscription.try_recv() {
            self.handle_frame(&frame);
            applied += 1;
        }
        applied
    }

    /// Waits for the next frame and applies it. `false` once the channel is
    /// gone.
    pub async fn next_frame(&mut self) -> bool {
        match self.subscription.recv().await {
            Ok(frame) => {
                self.handle_frame(&frame);
                true
            }
            Err(e) => {
                info!("[{}] stopped listening: {}", self.label, e);
                false
            }
        }
    }

    /// Waits for this session's publishes started so far.
    pub async fn settle(&mut self) {
        self.outbox.settle().await;
    }

    // --- actions ---

    /// Casts (or changes) this participant's vote on the current question.
    ///
    /// The new tallies are published and applied locally straight away; a
    /// failed publish raises an alert but does not undo anything.
    pub fn submit_vote(&mut self, option: &str) -> Result<(), ActionError> {
        let snapshot = &self.state.snapshot;
        let question = snapshot.current_question().ok_or(VoteRejected::NoCurrentQuestion)?;
        let question_id = question.id;
        let previous = self.state.vote_record.get(&question_id).cloned();

        voting::check_vote(
            &self.policy,
            Some(question),
            snapshot.results_visible,
            previous.as_deref(),
            option,
        )?;

        let updated = plurality::apply_vote(
            &snapshot.questions,
            question_id,
            previous.as_deref(),
            option,
            self.policy.tally_floor,
        );
        let current_question_index = snapshot.current_question_index;

        self.outbox.send(
            Event::VoteUpdate(VoteUpdate {
                questions: updated.clone(),
                current_question_index,
            }),
            OnFailure::Alert(VOTE_FAILED),
        );

        self.state.snapshot.questions = updated;
        self.state.vote_record.insert(question_id, option.to_string());
        info!("[{}] voted '{}' on question {}", self.label, option, question_id);
        Ok(())
    }

    pub fn reveal_results(&mut self) -> Result<(), ActionError> {
        self.require_admin()?;
        let snapshot = &self.state.snapshot;
        if snapshot.results_visible {
            return Err(ActionError::ResultsAlreadyVisible);
        }

        let event = Event::ShowResults(ShowResults {
            questions: Some(snapshot.questions.clone()),
            current_question_index: Some(snapshot.current_question_index),
        });
        self.outbox.send(event, OnFailure::Log);
        Ok(())
    }

    pub fn advance_question(&mut self) -> Result<(), ActionError> {
        self.require_admin()?;
        let snapshot = &self.state.snapshot;
        if snapshot.current_question_index + 1 >= snapshot.questions.len() {
            return Err(ActionError::LastQuestion);
        }
        if !snapshot.results_visible {
            return Err(ActionError::ResultsHidden);
        }

        let index = snapshot.current_question_index + 1;
        self.outbox.send(Event::NextQuestion(NextQuestion { index }), OnFailure::Log);
        Ok(())
    }

    pub fn reset_session(&mut self) -> Result<(), ActionError> {
        self.require_admin()?;
        let questions = self.state.snapshot.questions.iter().map(Question::zeroed).collect();
        self.outbox.send(Event::ResetSession(ResetSession { questions }), OnFailure::Log);
        Ok(())
    }

    pub fn start_session(&mut self) -> Result<(), ActionError> {
        self.require_admin()?;
        self.outbox.send(Event::SessionStart, OnFailure::Log);
        Ok(())
    }

    pub fn end_session(&mut self) -> Result<(), ActionError> {
        self.require_admin()?;
        self.outbox.send(Event::SessionEnd, OnFailure::Log);
        Ok(())
    }

    fn require_admin(&self) -> Result<(), ActionError> {
        match self.user.role() {
            Role::Admin => Ok(()),
            Role::Participant => Err(ActionError::NotAdmin),
        }
    }
}
