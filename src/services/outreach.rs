// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outreach orchestration: drives the wizard through matching, drafting and
//! delivery, and runs the follow-up actions on past emails.
//!
//! Every send is two-phase: [`CredentialManager::acquire`] first, then
//! [`DeliveryService::send`]. A credential problem stops the send before any
//! record is written.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::flow::{Action, FlowError, FlowStore, RecordActions, Step, Wizard};
use crate::models::{DeliveryRecord, EmailStatus, OutgoingEmail, SessionUser};
use crate::services::credentials::CredentialManager;
use crate::services::delivery::{DeliveryOutcome, DeliveryService};
use crate::services::drafting::DraftClient;
use crate::services::matching::MatchingClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

const REMINDER_PREFIX: &str = "Re: ";

/// Wizard state after a send or schedule, with the record it produced.
#[derive(Debug, Clone, Serialize)]
pub struct FlowDelivery {
    pub wizard: Wizard,
    pub record: DeliveryRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Replacement content for a failed email.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EditedEmail {
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Body is required"))]
    pub body: String,
    #[validate(email(message = "Recipient must be a valid email address"))]
    pub to: String,
}

pub struct OutreachService {
    flows: FlowStore,
    record_actions: RecordActions,
    matching: MatchingClient,
    drafting: DraftClient,
    credentials: CredentialManager,
    delivery: DeliveryService,
    db: FirestoreDb,
}

impl OutreachService {
    pub fn new(
        matching: MatchingClient,
        drafting: DraftClient,
        credentials: CredentialManager,
        delivery: DeliveryService,
        db: FirestoreDb,
    ) -> Self {
        Self {
            flows: FlowStore::new(),
            record_actions: RecordActions::new(),
            matching,
            drafting,
            credentials,
            delivery,
            db,
        }
    }

    pub fn wizard(&self, uid: &str) -> Wizard {
        self.flows.snapshot(uid)
    }

    /// `input -> selection`.
    pub async fn search(&self, uid: &str, research_interest: &str) -> Result<Wizard, AppError> {
        let guard = self.flows.begin(uid, Action::Search)?;
        let candidates = self.matching.match_professors(research_interest).await?;

        let query = research_interest.trim().to_string();
        Ok(guard.complete(|w| w.show_candidates(query, candidates)))
    }

    /// `selection -> email`: draft an email to one of the candidates.
    pub async fn select(&self, user: &SessionUser, professor_id: &str) -> Result<Wizard, AppError> {
        let guard = self.flows.begin(&user.uid, Action::Select)?;

        let professor = guard
            .wizard()
            .candidates
            .iter()
            .find(|p| p.id == professor_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Professor {professor_id}")))?;

        let draft = self
            .drafting
            .draft_email(&professor, &guard.wizard().research_interest, user)
            .await?;

        Ok(guard.complete(|w| w.show_draft(professor, draft)))
    }

    pub fn edit_draft(
        &self,
        uid: &str,
        subject: Option<String>,
        body: Option<String>,
        to: Option<String>,
    ) -> Result<Wizard, AppError> {
        Ok(self.flows.update(uid, |w| w.edit_draft(subject, body, to))?)
    }

    pub fn back(&self, uid: &str) -> Result<Wizard, AppError> {
        Ok(self.flows.update(uid, |w| w.back())?)
    }

    pub fn reset(&self, uid: &str) -> Wizard {
        self.flows.reset(uid)
    }

    /// Send the current draft now. Reaches `sent` only if delivery succeeds;
    /// a failed delivery stays on `email` with its failed record.
    pub async fn send(&self, user: &SessionUser) -> Result<FlowDelivery, AppError> {
        let guard = self.flows.begin(&user.uid, Action::Send)?;
        let email = outgoing_from_wizard(guard.wizard(), user)?;

        let access_token = self.credentials.acquire(&user.uid).await?;
        let outcome = self.delivery.send(email, &access_token).await?;

        let record_id = outcome.record.id.clone();
        let wizard = if outcome.succeeded() {
            guard.complete(|w| w.mark_sent(record_id))
        } else {
            guard.complete(|w| w.last_record_id = Some(record_id))
        };

        Ok(FlowDelivery {
            wizard,
            record: outcome.record,
            error: outcome.error,
        })
    }

    /// Record the current draft as scheduled for `at`.
    pub async fn schedule(
        &self,
        user: &SessionUser,
        at: DateTime<Utc>,
    ) -> Result<FlowDelivery, AppError> {
        let guard = self.flows.begin(&user.uid, Action::Schedule)?;
        let email = outgoing_from_wizard(guard.wizard(), user)?;

        let record = self.delivery.schedule(email, at).await?;

        let record_id = record.id.clone();
        let wizard = guard.complete(|w| w.mark_sent(record_id));
        Ok(FlowDelivery {
            wizard,
            record,
            error: None,
        })
    }

    /// The user's emails, newest activity first.
    pub async fn history(&self, uid: &str) -> Result<Vec<DeliveryRecord>, AppError> {
        self.db.list_emails_for_user(uid).await
    }

    /// Send a failed email again, to the professor's address, as a new record.
    pub async fn resend(&self, uid: &str, id: &str) -> Result<DeliveryOutcome, AppError> {
        let _claim = self.record_actions.claim(uid, id)?;
        let record = self.owned_record(uid, id).await?;
        require_status(&record, EmailStatus::Failed, "Only failed emails can be resent")?;

        let mut email = record.to_outgoing();
        email.to = None;
        self.deliver(uid, email).await
    }

    /// Send edited content in place of a failed email. The failed record is
    /// left as it is.
    pub async fn edit_and_resend(
        &self,
        uid: &str,
        id: &str,
        edited: EditedEmail,
    ) -> Result<DeliveryOutcome, AppError> {
        edited
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let _claim = self.record_actions.claim(uid, id)?;
        let record = self.owned_record(uid, id).await?;
        require_status(&record, EmailStatus::Failed, "Only failed emails can be edited and resent")?;

        let mut email = record.to_outgoing();
        email.subject = edited.subject;
        email.body = edited.body;
        email.to = Some(edited.to);
        self.deliver(uid, email).await
    }

    /// Follow up on a sent email.
    pub async fn send_reminder(&self, uid: &str, id: &str) -> Result<DeliveryOutcome, AppError> {
        let _claim = self.record_actions.claim(uid, id)?;
        let record = self.owned_record(uid, id).await?;
        require_status(&record, EmailStatus::Sent, "Reminders can only follow sent emails")?;

        let mut email = record.to_outgoing();
        email.subject = reminder_subject(&email.subject);
        self.deliver(uid, email).await
    }

    /// Schedule a past email's content again, to the professor's address.
    pub async fn schedule_resend(
        &self,
        uid: &str,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<DeliveryRecord, AppError> {
        let _claim = self.record_actions.claim(uid, id)?;
        let record = self.owned_record(uid, id).await?;

        let mut email = record.to_outgoing();
        email.to = None;
        self.delivery.schedule(email, at).await
    }

    async fn deliver(&self, uid: &str, email: OutgoingEmail) -> Result<DeliveryOutcome, AppError> {
        let access_token = self.credentials.acquire(uid).await?;
        self.delivery.send(email, &access_token).await
    }

    /// A record owned by `uid`; anyone else's is reported as missing.
    async fn owned_record(&self, uid: &str, id: &str) -> Result<DeliveryRecord, AppError> {
        match self.db.get_email(id).await? {
            Some(record) if record.user_id == uid => Ok(record),
            Some(_) => {
                tracing::warn!(uid, record_id = id, "Attempt to access another user's email");
                Err(AppError::NotFound(format!("Email {id}")))
            }
            None => Err(AppError::NotFound(format!("Email {id}"))),
        }
    }
}

fn outgoing_from_wizard(wizard: &Wizard, user: &SessionUser) -> Result<OutgoingEmail, AppError> {
    let (Some(professor), Some(draft)) = (&wizard.selected, &wizard.draft) else {
        return Err(FlowError::NotAllowed("sending without a draft", Step::Email).into());
    };

    if draft.recipient(professor).trim().is_empty() {
        return Err(AppError::BadRequest(
            "No recipient email address for this professor".to_string(),
        ));
    }

    Ok(OutgoingEmail {
        user_id: user.uid.clone(),
        professor_name: professor.name.clone(),
        professor_email: professor.email.clone(),
        user_email: user.email.clone(),
        subject: draft.subject.clone(),
        body: draft.body.clone(),
        research_interest: wizard.research_interest.clone(),
        to: draft.to.clone(),
    })
}

fn require_status(
    record: &DeliveryRecord,
    status: EmailStatus,
    message: &str,
) -> Result<(), AppError> {
    if record.status == status {
        Ok(())
    } else {
        Err(AppError::Conflict(message.to_string()))
    }
}

fn reminder_subject(subject: &str) -> String {
    if subject.starts_with(REMINDER_PREFIX) {
        subject.to_string()
    } else {
        format!("{REMINDER_PREFIX}{subject}")
    }
}
