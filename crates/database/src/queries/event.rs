use async_trait::async_trait;
use model::{event::EventSignal, trip::Trip, WithId};
use plan_core::{error::Result, store::EventRepo};
use sqlx::{types::Json, Executor, Postgres};
use utility::id::Id;
use uuid::Uuid;

use crate::{data_model::event::{severity_to_str, EventSignalRow}, PgAutocommit, PgTransaction};

use super::convert_error;

async fn insert_event<'c, E>(executor: E, id: Uuid, event: &EventSignal) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let affected_items: Vec<Uuid> = event.affected_items.iter().map(|item_id| item_id.raw()).collect();
    sqlx::query(
        "
        INSERT INTO event_signals (
            id, trip_id, severity, location, time_slot, details, affected_items, processed, replan_triggered
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9);
        ",
    )
    .bind(id)
    .bind(event.trip_id.raw())
    .bind(severity_to_str(event.severity))
    .bind(Json(event.location))
    .bind(Json(event.time_slot))
    .bind(Json(&event.details))
    .bind(affected_items)
    .bind(event.processed)
    .bind(event.replan_triggered)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn fetch_event<'c, E>(executor: E, id: Uuid) -> Result<EventSignalRow>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, trip_id, severity, location, time_slot, details, affected_items, processed, replan_triggered
        FROM event_signals WHERE id = $1;
        ",
    )
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

async fn fetch_unprocessed<'c, E>(executor: E, trip_id: Uuid) -> Result<Vec<EventSignalRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, trip_id, severity, location, time_slot, details, affected_items, processed, replan_triggered
        FROM event_signals WHERE trip_id = $1 AND processed = false;
        ",
    )
    .bind(trip_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

async fn mark_processed<'c, E>(executor: E, id: Uuid, replan_triggered: bool) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("UPDATE event_signals SET processed = true, replan_triggered = $2 WHERE id = $1;")
        .bind(id)
        .bind(replan_triggered)
        .execute(executor)
        .await
        .map_err(convert_error)?;
    Ok(())
}

#[async_trait]
impl EventRepo for PgAutocommit {
    async fn insert_event(&mut self, event: EventSignal) -> Result<WithId<EventSignal>> {
        let id = Uuid::new_v4();
        insert_event(&self.pool, id, &event).await?;
        Ok(WithId::new(Id::new(id), event))
    }

    async fn get_event(&mut self, id: Id<EventSignal>) -> Result<WithId<EventSignal>> {
        let row = fetch_event(&self.pool, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn mark_event_processed(&mut self, id: Id<EventSignal>, replan_triggered: bool) -> Result<()> {
        mark_processed(&self.pool, id.raw(), replan_triggered).await
    }

    async fn unprocessed_events(&mut self, trip_id: Id<Trip>) -> Result<Vec<WithId<EventSignal>>> {
        let rows = fetch_unprocessed(&self.pool, trip_id.raw()).await?;
        rows.into_iter()
            .map(|row| Ok(WithId::new(Id::new(row.id), row.to_model()?)))
            .collect()
    }
}

#[async_trait]
impl<'a> EventRepo for PgTransaction<'a> {
    async fn insert_event(&mut self, event: EventSignal) -> Result<WithId<EventSignal>> {
        let id = Uuid::new_v4();
        insert_event(&mut *self.tx, id, &event).await?;
        Ok(WithId::new(Id::new(id), event))
    }

    async fn get_event(&mut self, id: Id<EventSignal>) -> Result<WithId<EventSignal>> {
        let row = fetch_event(&mut *self.tx, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn mark_event_processed(&mut self, id: Id<EventSignal>, replan_triggered: bool) -> Result<()> {
        mark_processed(&mut *self.tx, id.raw(), replan_triggered).await
    }

    async fn unprocessed_events(&mut self, trip_id: Id<Trip>) -> Result<Vec<WithId<EventSignal>>> {
        let rows = fetch_unprocessed(&mut *self.tx, trip_id.raw()).await?;
        rows.into_iter()
            .map(|row| Ok(WithId::new(Id::new(row.id), row.to_model()?)))
            .collect()
    }
}
