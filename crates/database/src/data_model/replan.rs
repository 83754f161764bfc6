use chrono::{DateTime, Utc};
use model::replan::{
    Priority, ProposalChanges, ProposalImpact, ReplanApplication, ReplanProposal, ReplanTrigger,
};
use sqlx::{prelude::FromRow, types::Json};
use utility::id::Id;
use uuid::Uuid;

use crate::CorruptRow;

#[derive(Debug, Clone, FromRow)]
pub struct ReplanTriggerRow {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub event_signal_id: Uuid,
    pub reason: String,
    pub priority: String,
    pub processed: bool,
}

impl ReplanTriggerRow {
    pub fn to_model(&self) -> Result<ReplanTrigger, CorruptRow> {
        let priority = match self.priority.as_str() {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            _ => return Err(CorruptRow("unrecognized replan trigger priority")),
        };
        Ok(ReplanTrigger {
            trip_id: Id::new(self.trip_id),
            event_signal_id: Id::new(self.event_signal_id),
            reason: self.reason.clone(),
            priority,
            processed: self.processed,
        })
    }
}

pub fn priority_to_str(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ReplanProposalRow {
    pub id: Uuid,
    pub trigger_id: Uuid,
    pub trip_id: Uuid,
    pub score: f64,
    pub explanation: String,
    pub changes: Json<ProposalChanges>,
    pub impact: Json<ProposalImpact>,
}

impl ReplanProposalRow {
    pub fn to_model(&self) -> ReplanProposal {
        ReplanProposal {
            trip_id: Id::new(self.trip_id),
            trigger_id: Id::new(self.trigger_id),
            score: self.score,
            explanation: self.explanation.clone(),
            changes: self.changes.0.clone(),
            impact: self.impact.0,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ReplanApplicationRow {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub proposal_id: Uuid,
    pub applied_version: i32,
    pub rollback_available_until: DateTime<Utc>,
    pub rolled_back: bool,
    pub rolled_back_at: Option<DateTime<Utc>>,
    pub idempotency_key: String,
}

impl ReplanApplicationRow {
    pub fn to_model(&self) -> ReplanApplication {
        ReplanApplication {
            trip_id: Id::new(self.trip_id),
            proposal_id: Id::new(self.proposal_id),
            applied_version: self.applied_version as u32,
            rollback_available_until: self.rollback_available_until,
            rolled_back: self.rolled_back,
            rolled_back_at: self.rolled_back_at,
            idempotency_key: self.idempotency_key.clone(),
        }
    }
}
