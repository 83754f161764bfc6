use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    replan::{ReplanApplication, ReplanProposal, ReplanTrigger},
    WithId,
};
use plan_core::{error::Result, store::ReplanRepo};
use sqlx::{types::Json, Executor, Postgres};
use utility::id::Id;
use uuid::Uuid;

use crate::{
    data_model::replan::{priority_to_str, ReplanApplicationRow, ReplanProposalRow, ReplanTriggerRow},
    PgAutocommit, PgTransaction,
};

use super::convert_error;

async fn insert_trigger<'c, E>(executor: E, id: Uuid, trigger: &ReplanTrigger) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO replan_triggers (id, trip_id, event_signal_id, reason, priority, processed)
        VALUES ($1, $2, $3, $4, $5, $6);
        ",
    )
    .bind(id)
    .bind(trigger.trip_id.raw())
    .bind(trigger.event_signal_id.raw())
    .bind(&trigger.reason)
    .bind(priority_to_str(trigger.priority))
    .bind(trigger.processed)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn fetch_trigger<'c, E>(executor: E, id: Uuid) -> Result<ReplanTriggerRow>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT id, trip_id, event_signal_id, reason, priority, processed FROM replan_triggers WHERE id = $1;",
    )
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

async fn mark_trigger_processed<'c, E>(executor: E, id: Uuid) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("UPDATE replan_triggers SET processed = true WHERE id = $1;")
        .bind(id)
        .execute(executor)
        .await
        .map_err(convert_error)?;
    Ok(())
}

async fn insert_proposal<'c, E>(executor: E, id: Uuid, proposal: &ReplanProposal) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO replan_proposals (id, trigger_id, trip_id, score, explanation, changes, impact)
        VALUES ($1, $2, $3, $4, $5, $6, $7);
        ",
    )
    .bind(id)
    .bind(proposal.trigger_id.raw())
    .bind(proposal.trip_id.raw())
    .bind(proposal.score)
    .bind(&proposal.explanation)
    .bind(Json(&proposal.changes))
    .bind(Json(proposal.impact))
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn fetch_proposal<'c, E>(executor: E, id: Uuid) -> Result<ReplanProposalRow>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT id, trigger_id, trip_id, score, explanation, changes, impact FROM replan_proposals WHERE id = $1;",
    )
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

async fn fetch_proposals_for_trigger<'c, E>(executor: E, trigger_id: Uuid) -> Result<Vec<ReplanProposalRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT id, trigger_id, trip_id, score, explanation, changes, impact FROM replan_proposals WHERE trigger_id = $1;",
    )
    .bind(trigger_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

async fn insert_application<'c, E>(executor: E, id: Uuid, application: &ReplanApplication) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO replan_applications (
            id, trip_id, proposal_id, applied_version, rollback_available_until, rolled_back, rolled_back_at,
            idempotency_key
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8);
        ",
    )
    .bind(id)
    .bind(application.trip_id.raw())
    .bind(application.proposal_id.raw())
    .bind(application.applied_version as i32)
    .bind(application.rollback_available_until)
    .bind(application.rolled_back)
    .bind(application.rolled_back_at)
    .bind(&application.idempotency_key)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn fetch_application<'c, E>(executor: E, id: Uuid) -> Result<ReplanApplicationRow>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, trip_id, proposal_id, applied_version, rollback_available_until, rolled_back, rolled_back_at,
               idempotency_key
        FROM replan_applications WHERE id = $1;
        ",
    )
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

async fn fetch_application_by_idempotency_key<'c, E>(executor: E, key: &str) -> Result<Option<ReplanApplicationRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, trip_id, proposal_id, applied_version, rollback_available_until, rolled_back, rolled_back_at,
               idempotency_key
        FROM replan_applications WHERE idempotency_key = $1;
        ",
    )
    .bind(key)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
}

async fn mark_rolled_back<'c, E>(executor: E, id: Uuid, at: DateTime<Utc>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("UPDATE replan_applications SET rolled_back = true, rolled_back_at = $2 WHERE id = $1;")
        .bind(id)
        .bind(at)
        .execute(executor)
        .await
        .map_err(convert_error)?;
    Ok(())
}

#[async_trait]
impl ReplanRepo for PgAutocommit {
    async fn insert_trigger(&mut self, trigger: ReplanTrigger) -> Result<WithId<ReplanTrigger>> {
        let id = Uuid::new_v4();
        insert_trigger(&self.pool, id, &trigger).await?;
        Ok(WithId::new(Id::new(id), trigger))
    }

    async fn get_trigger(&mut self, id: Id<ReplanTrigger>) -> Result<WithId<ReplanTrigger>> {
        let row = fetch_trigger(&self.pool, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn mark_trigger_processed(&mut self, id: Id<ReplanTrigger>) -> Result<()> {
        mark_trigger_processed(&self.pool, id.raw()).await
    }

    async fn insert_proposal(&mut self, proposal: ReplanProposal) -> Result<WithId<ReplanProposal>> {
        let id = Uuid::new_v4();
        insert_proposal(&self.pool, id, &proposal).await?;
        Ok(WithId::new(Id::new(id), proposal))
    }

    async fn get_proposal(&mut self, id: Id<ReplanProposal>) -> Result<WithId<ReplanProposal>> {
        let row = fetch_proposal(&self.pool, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()))
    }

    async fn proposals_for_trigger(&mut self, trigger_id: Id<ReplanTrigger>) -> Result<Vec<WithId<ReplanProposal>>> {
        let rows = fetch_proposals_for_trigger(&self.pool, trigger_id.raw()).await?;
        Ok(rows.into_iter().map(|row| WithId::new(Id::new(row.id), row.to_model())).collect())
    }

    async fn insert_application(&mut self, application: ReplanApplication) -> Result<WithId<ReplanApplication>> {
        let id = Uuid::new_v4();
        insert_application(&self.pool, id, &application).await?;
        Ok(WithId::new(Id::new(id), application))
    }

    async fn get_application(&mut self, id: Id<ReplanApplication>) -> Result<WithId<ReplanApplication>> {
        let row = fetch_application(&self.pool, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()))
    }

    async fn find_application_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<WithId<ReplanApplication>>> {
        let row = fetch_application_by_idempotency_key(&self.pool, key).await?;
        Ok(row.map(|row| WithId::new(Id::new(row.id), row.to_model())))
    }

    async fn mark_rolled_back(&mut self, id: Id<ReplanApplication>, at: DateTime<Utc>) -> Result<()> {
        mark_rolled_back(&self.pool, id.raw(), at).await
    }
}

#[async_trait]
impl<'a> ReplanRepo for PgTransaction<'a> {
    async fn insert_trigger(&mut self, trigger: ReplanTrigger) -> Result<WithId<ReplanTrigger>> {
        let id = Uuid::new_v4();
        insert_trigger(&mut *self.tx, id, &trigger).await?;
        Ok(WithId::new(Id::new(id), trigger))
    }

    async fn get_trigger(&mut self, id: Id<ReplanTrigger>) -> Result<WithId<ReplanTrigger>> {
        let row = fetch_trigger(&mut *self.tx, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn mark_trigger_processed(&mut self, id: Id<ReplanTrigger>) -> Result<()> {
        mark_trigger_processed(&mut *self.tx, id.raw()).await
    }

    async fn insert_proposal(&mut self, proposal: ReplanProposal) -> Result<WithId<ReplanProposal>> {
        let id = Uuid::new_v4();
        insert_proposal(&mut *self.tx, id, &proposal).await?;
        Ok(WithId::new(Id::new(id), proposal))
    }

    async fn get_proposal(&mut self, id: Id<ReplanProposal>) -> Result<WithId<ReplanProposal>> {
        let row = fetch_proposal(&mut *self.tx, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()))
    }

    async fn proposals_for_trigger(&mut self, trigger_id: Id<ReplanTrigger>) -> Result<Vec<WithId<ReplanProposal>>> {
        let rows = fetch_proposals_for_trigger(&mut *self.tx, trigger_id.raw()).await?;
        Ok(rows.into_iter().map(|row| WithId::new(Id::new(row.id), row.to_model())).collect())
    }

    async fn insert_application(&mut self, application: ReplanApplication) -> Result<WithId<ReplanApplication>> {
        let id = Uuid::new_v4();
        insert_application(&mut *self.tx, id, &application).await?;
        Ok(WithId::new(Id::new(id), application))
    }

    async fn get_application(&mut self, id: Id<ReplanApplication>) -> Result<WithId<ReplanApplication>> {
        let row = fetch_application(&mut *self.tx, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()))
    }

    async fn find_application_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<WithId<ReplanApplication>>> {
        let row = fetch_application_by_idempotency_key(&mut *self.tx, key).await?;
        Ok(row.map(|row| WithId::new(Id::new(row.id), row.to_model())))
    }

    async fn mark_rolled_back(&mut self, id: Id<ReplanApplication>, at: DateTime<Utc>) -> Result<()> {
        mark_rolled_back(&mut *self.tx, id.raw(), at).await
    }
}
