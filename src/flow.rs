// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outreach wizard: `input -> selection -> email -> sent`.
//!
//! One wizard per signed-in user, held in process memory only. A restart or
//! an explicit reset returns the user to `input`.
//!
//! Asynchronous actions (search, select, send, schedule) are bracketed by
//! [`FlowStore::begin`], which marks the action in flight and rejects any
//! other action until the returned [`InFlight`] guard is completed or dropped.
//! Dropping the guard without completing it (an error path) leaves the step
//! unchanged so the user can retry.

use crate::error::AppError;
use crate::models::{EmailDraft, Professor};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Wizard step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Input,
    Selection,
    Email,
    Sent,
}

/// An action that involves a network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Search,
    Select,
    Send,
    Schedule,
}

impl Action {
    /// The step this action may be started from.
    fn required_step(self) -> Step {
        match self {
            Action::Search => Step::Input,
            Action::Select => Step::Selection,
            Action::Send | Action::Schedule => Step::Email,
        }
    }
}

/// Wizard misuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("{0:?} is already in progress")]
    InFlight(Action),

    #[error("{action:?} is not allowed in step {step:?}")]
    WrongStep { action: Action, step: Step },

    #[error("{0} is not allowed in step {1:?}")]
    NotAllowed(&'static str, Step),
}

impl From<FlowError> for AppError {
    fn from(err: FlowError) -> Self {
        AppError::Conflict(err.to_string())
    }
}

/// Per-user wizard state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Wizard {
    pub step: Step,
    pub research_interest: String,
    pub candidates: Vec<Professor>,
    pub selected: Option<Professor>,
    pub draft: Option<EmailDraft>,
    /// Action currently awaiting a network call
    pub in_flight: Option<Action>,
    /// Record written by the last send or schedule attempt
    pub last_record_id: Option<String>,
    /// Identifies the in-flight action so a stale completion is ignored
    #[serde(skip)]
    ticket: u64,
}

impl Wizard {
    fn begin(&mut self, action: Action, ticket: u64) -> Result<(), FlowError> {
        if let Some(current) = self.in_flight {
            return Err(FlowError::InFlight(current));
        }
        if self.step != action.required_step() {
            return Err(FlowError::WrongStep {
                action,
                step: self.step,
            });
        }
        self.in_flight = Some(action);
        self.ticket = ticket;
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), FlowError> {
        match self.in_flight {
            Some(action) => Err(FlowError::InFlight(action)),
            None => Ok(()),
        }
    }

    /// `input -> selection` with the search results.
    pub fn show_candidates(&mut self, research_interest: String, candidates: Vec<Professor>) {
        self.research_interest = research_interest;
        self.candidates = candidates;
        self.selected = None;
        self.draft = None;
        self.step = Step::Selection;
    }

    /// `selection -> email` with the drafted email.
    pub fn show_draft(&mut self, professor: Professor, draft: EmailDraft) {
        self.selected = Some(professor);
        self.draft = Some(draft);
        self.step = Step::Email;
    }

    /// `email -> sent`.
    pub fn mark_sent(&mut self, record_id: String) {
        self.last_record_id = Some(record_id);
        self.step = Step::Sent;
    }

    /// Apply user edits to the draft (email step only).
    pub fn edit_draft(
        &mut self,
        subject: Option<String>,
        body: Option<String>,
        to: Option<String>,
    ) -> Result<(), FlowError> {
        self.ensure_idle()?;
        let step = self.step;
        let draft = match (&mut self.draft, step) {
            (Some(draft), Step::Email) => draft,
            _ => return Err(FlowError::NotAllowed("editing the draft", step)),
        };

        if let Some(subject) = subject {
            draft.subject = subject;
        }
        if let Some(body) = body {
            draft.body = body;
        }
        if let Some(to) = to {
            draft.to = Some(to);
        }
        Ok(())
    }

    /// `email -> selection`. Keeps the candidate list.
    pub fn back(&mut self) -> Result<(), FlowError> {
        self.ensure_idle()?;
        if self.step != Step::Email {
            return Err(FlowError::NotAllowed("going back", self.step));
        }
        self.selected = None;
        self.draft = None;
        self.step = Step::Selection;
        Ok(())
    }
}

/// All users' wizards.
#[derive(Default)]
pub struct FlowStore {
    wizards: DashMap<String, Wizard>,
    tickets: AtomicU64,
}

impl FlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current wizard for a user (a fresh one if none exists).
    pub fn snapshot(&self, uid: &str) -> Wizard {
        self.wizards
            .get(uid)
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    /// Apply a synchronous transition.
    pub fn update<F>(&self, uid: &str, f: F) -> Result<Wizard, FlowError>
    where
        F: FnOnce(&mut Wizard) -> Result<(), FlowError>,
    {
        let mut wizard = self.wizards.entry(uid.to_string()).or_default();
        f(&mut wizard)?;
        Ok(wizard.clone())
    }

    /// Return to `input`, discarding everything including an in-flight action.
    pub fn reset(&self, uid: &str) -> Wizard {
        self.wizards.remove(uid);
        Wizard::default()
    }

    /// Mark `action` in flight. The returned guard carries a snapshot of the
    /// wizard taken at that moment.
    pub fn begin(&self, uid: &str, action: Action) -> Result<InFlight<'_>, FlowError> {
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = {
            let mut wizard = self.wizards.entry(uid.to_string()).or_default();
            wizard.begin(action, ticket)?;
            wizard.clone()
        };

        Ok(InFlight {
            store: self,
            uid: uid.to_string(),
            action,
            ticket,
            snapshot,
            finished: false,
        })
    }

    fn finish<F>(&self, uid: &str, action: Action, ticket: u64, f: F) -> Option<Wizard>
    where
        F: FnOnce(&mut Wizard),
    {
        let mut wizard = self.wizards.get_mut(uid)?;
        // A reset while the call was outstanding discards its result
        if wizard.in_flight != Some(action) || wizard.ticket != ticket {
            return None;
        }
        wizard.in_flight = None;
        f(&mut wizard);
        Some(wizard.clone())
    }
}

/// An action in flight. Complete it to apply its result; drop it to abort.
pub struct InFlight<'a> {
    store: &'a FlowStore,
    uid: String,
    action: Action,
    ticket: u64,
    snapshot: Wizard,
    finished: bool,
}

impl InFlight<'_> {
    /// Wizard state when the action began.
    pub fn wizard(&self) -> &Wizard {
        &self.snapshot
    }

    /// Clear the in-flight flag and apply `f`. Returns the resulting wizard,
    /// or the current one if a reset discarded this action.
    pub fn complete<F>(mut self, f: F) -> Wizard
    where
        F: FnOnce(&mut Wizard),
    {
        self.finished = true;
        match self.store.finish(&self.uid, self.action, self.ticket, f) {
            Some(wizard) => wizard,
            None => {
                tracing::debug!(uid = %self.uid, action = ?self.action, "Discarding result of reset flow");
                self.store.snapshot(&self.uid)
            }
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.store.finish(&self.uid, self.action, self.ticket, |_| {});
        }
    }
}

/// Follow-up actions running against past email records, keyed by
/// `(uid, record id)`. At most one action per record at a time.
#[derive(Default)]
pub struct RecordActions {
    active: DashMap<(String, String), ()>,
}

impl RecordActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `record_id` for `uid`. Fails if an action on it is running.
    pub fn claim(&self, uid: &str, record_id: &str) -> Result<RecordClaim<'_>, AppError> {
        let key = (uid.to_string(), record_id.to_string());
        if self.active.insert(key.clone(), ()).is_some() {
            return Err(AppError::Conflict(format!(
                "An action on email {record_id} is already in progress"
            )));
        }
        Ok(RecordClaim { actions: self, key })
    }

    pub fn is_active(&self, uid: &str, record_id: &str) -> bool {
        self.active
            .contains_key(&(uid.to_string(), record_id.to_string()))
    }
}

/// Releases the record when dropped.
pub struct RecordClaim<'a> {
    actions: &'a RecordActions,
    key: (String, String),
}

impl Drop for RecordClaim<'_> {
    fn drop(&mut self) {
        self.actions.active.remove(&self.key);
    }
}
