use async_trait::async_trait;
use model::{itinerary::ItineraryItem, trip::Trip, version::ItineraryVersion, WithId};
use plan_core::{
    error::{PlanError, Result},
    store::ItineraryRepo,
};
use sqlx::{types::Json, Executor, Postgres};
use utility::id::Id;
use uuid::Uuid;

use crate::{
    data_model::itinerary::{change_type_to_str, item_type_to_str, ItineraryItemRow, ItineraryVersionRow},
    PgAutocommit, PgTransaction,
};

use super::convert_error;

async fn delete_items_for_trip<'c, E>(executor: E, trip_id: Uuid) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM itinerary_items WHERE trip_id = $1;")
        .bind(trip_id)
        .execute(executor)
        .await
        .map_err(convert_error)?;
    Ok(())
}

async fn insert_item<'c, E>(executor: E, id: Uuid, item: &ItineraryItem) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO itinerary_items (
            id, trip_id, day, item_type, poi_id, name, location, start_time, end_time,
            duration_minutes, is_pinned, \"order\", route_from_previous, cost_estimate, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15);
        ",
    )
    .bind(id)
    .bind(item.trip_id.raw())
    .bind(item.day as i32)
    .bind(item_type_to_str(item.item_type))
    .bind(item.poi_id.map(|poi_id| poi_id.raw()))
    .bind(&item.name)
    .bind(item.location.map(Json))
    .bind(item.start_time.format())
    .bind(item.end_time.format())
    .bind(item.duration_minutes as i32)
    .bind(item.is_pinned)
    .bind(item.order as i32)
    .bind(item.route_from_previous.clone().map(Json))
    .bind(item.cost_estimate.map(Json))
    .bind(&item.notes)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn fetch_item<'c, E>(executor: E, id: Uuid) -> Result<ItineraryItemRow>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, trip_id, day, item_type, poi_id, name, location, start_time, end_time,
               duration_minutes, is_pinned, \"order\", route_from_previous, cost_estimate, notes
        FROM itinerary_items WHERE id = $1;
        ",
    )
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

async fn insert_version_row<'c, E>(executor: E, id: Uuid, version: &ItineraryVersion) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO itinerary_versions (id, trip_id, version, change_type, changed_by, snapshot)
        VALUES ($1, $2, $3, $4, $5, $6);
        ",
    )
    .bind(id)
    .bind(version.trip_id.raw())
    .bind(version.version as i32)
    .bind(change_type_to_str(version.change_type))
    .bind(&version.changed_by)
    .bind(Json(&version.days))
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn upsert_pointer<'c, E>(executor: E, trip_id: Uuid, version: i32) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO itineraries (trip_id, version, generated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (trip_id) DO UPDATE SET version = EXCLUDED.version, generated_at = now();
        ",
    )
    .bind(trip_id)
    .bind(version)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn fetch_latest_version<'c, E>(executor: E, trip_id: Uuid) -> Result<Option<ItineraryVersionRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, trip_id, version, change_type, changed_by, snapshot
        FROM itinerary_versions WHERE trip_id = $1 ORDER BY version DESC LIMIT 1;
        ",
    )
    .bind(trip_id)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
}

async fn fetch_version<'c, E>(executor: E, trip_id: Uuid, version: i32) -> Result<ItineraryVersionRow>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, trip_id, version, change_type, changed_by, snapshot
        FROM itinerary_versions WHERE trip_id = $1 AND version = $2;
        ",
    )
    .bind(trip_id)
    .bind(version)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

async fn put_version_via<'c, E>(executor: E, version: ItineraryVersion) -> Result<WithId<ItineraryVersion>>
where
    E: Executor<'c, Database = Postgres> + Copy,
{
    let expected = fetch_latest_version(executor, version.trip_id.raw())
        .await?
        .map(|row| row.version as u32 + 1)
        .unwrap_or(1);
    if version.version != expected {
        return Err(PlanError::Conflict(format!(
            "expected version {expected}, got {}",
            version.version
        )));
    }

    let id = Uuid::new_v4();
    insert_version_row(executor, id, &version).await?;

    delete_items_for_trip(executor, version.trip_id.raw()).await?;
    for day in &version.days {
        for item in &day.items {
            insert_item(executor, item.id.raw(), &item.content).await?;
        }
    }
    upsert_pointer(executor, version.trip_id.raw(), version.version as i32).await?;

    Ok(WithId::new(Id::new(id), version))
}

#[async_trait]
impl ItineraryRepo for PgAutocommit {
    async fn latest_version(&mut self, trip_id: Id<Trip>) -> Result<Option<WithId<ItineraryVersion>>> {
        let row = fetch_latest_version(&self.pool, trip_id.raw()).await?;
        row.map(|row| row.to_model().map_err(PlanError::from)).transpose()
    }

    async fn get_version(&mut self, trip_id: Id<Trip>, version: u32) -> Result<WithId<ItineraryVersion>> {
        let row = fetch_version(&self.pool, trip_id.raw(), version as i32).await?;
        row.to_model().map_err(PlanError::from)
    }

    async fn put_version(&mut self, version: ItineraryVersion) -> Result<WithId<ItineraryVersion>> {
        put_version_via(&self.pool, version).await
    }

    async fn get_item(&mut self, id: Id<ItineraryItem>) -> Result<WithId<ItineraryItem>> {
        let row = fetch_item(&self.pool, id.raw()).await?;
        row.to_model().map_err(PlanError::from)
    }
}

#[async_trait]
impl<'a> ItineraryRepo for PgTransaction<'a> {
    async fn latest_version(&mut self, trip_id: Id<Trip>) -> Result<Option<WithId<ItineraryVersion>>> {
        let row = fetch_latest_version(&mut *self.tx, trip_id.raw()).await?;
        row.map(|row| row.to_model().map_err(PlanError::from)).transpose()
    }

    async fn get_version(&mut self, trip_id: Id<Trip>, version: u32) -> Result<WithId<ItineraryVersion>> {
        let row = fetch_version(&mut *self.tx, trip_id.raw(), version as i32).await?;
        row.to_model().map_err(PlanError::from)
    }

    async fn put_version(&mut self, version: ItineraryVersion) -> Result<WithId<ItineraryVersion>> {
        let expected = fetch_latest_version(&mut *self.tx, version.trip_id.raw())
            .await?
            .map(|row| row.version as u32 + 1)
            .unwrap_or(1);
        if version.version != expected {
            return Err(PlanError::Conflict(format!(
                "expected version {expected}, got {}",
                version.version
            )));
        }

        let id = Uuid::new_v4();
        insert_version_row(&mut *self.tx, id, &version).await?;

        delete_items_for_trip(&mut *self.tx, version.trip_id.raw()).await?;
        for day in &version.days {
            for item in &day.items {
                insert_item(&mut *self.tx, item.id.raw(), &item.content).await?;
            }
        }
        upsert_pointer(&mut *self.tx, version.trip_id.raw(), version.version as i32).await?;

        Ok(WithId::new(Id::new(id), version))
    }

    async fn get_item(&mut self, id: Id<ItineraryItem>) -> Result<WithId<ItineraryItem>> {
        let row = fetch_item(&mut *self.tx, id.raw()).await?;
        row.to_model().map_err(PlanError::from)
    }
}
