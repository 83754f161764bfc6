use async_trait::async_trait;
use model::{preferences::TripPreferences, trip::Trip, WithId};
use plan_core::{error::Result, store::TripRepo};
use sqlx::{types::Json, Executor, Postgres};
use utility::id::Id;
use uuid::Uuid;

use crate::{
    data_model::trip::{status_to_str, style_to_str, TripPreferencesRow, TripRow},
    PgAutocommit, PgTransaction,
};

use super::convert_error;

async fn insert_trip<'c, E>(executor: E, id: Uuid, trip: &Trip) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    use model::owner::Owner;
    let (owner_user_id, owner_guest_session_id) = match trip.owner {
        Owner::User { user_id } => (Some(user_id), None),
        Owner::Guest { guest_session_id } => (None, Some(guest_session_id)),
    };
    sqlx::query(
        "INSERT INTO trips (id, owner_user_id, owner_guest_session_id, status) VALUES ($1, $2, $3, $4);",
    )
    .bind(id)
    .bind(owner_user_id)
    .bind(owner_guest_session_id)
    .bind(status_to_str(trip.status))
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn insert_sentinel<'c, E>(executor: E, id: Uuid) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("INSERT INTO trip_sentinels (trip_id) VALUES ($1);")
        .bind(id)
        .execute(executor)
        .await
        .map_err(convert_error)?;
    Ok(())
}

async fn insert_preferences<'c, E>(executor: E, trip_id: Uuid, preferences: &TripPreferences) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO trip_preferences (
            trip_id, destination, date_start, date_end, travelers, budget, style, daily_window, constraints
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (trip_id) DO UPDATE SET
            destination = EXCLUDED.destination,
            date_start = EXCLUDED.date_start,
            date_end = EXCLUDED.date_end,
            travelers = EXCLUDED.travelers,
            budget = EXCLUDED.budget,
            style = EXCLUDED.style,
            daily_window = EXCLUDED.daily_window,
            constraints = EXCLUDED.constraints;
        ",
    )
    .bind(trip_id)
    .bind(&preferences.destination)
    .bind(&preferences.dates.start)
    .bind(&preferences.dates.end)
    .bind(Json(preferences.travelers))
    .bind(Json(preferences.budget))
    .bind(style_to_str(preferences.style))
    .bind(Json(preferences.daily_window))
    .bind(Json(preferences.constraints))
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn fetch_trip<'c, E>(executor: E, id: Uuid) -> Result<TripRow>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT id, owner_user_id, owner_guest_session_id, status FROM trips WHERE id = $1;")
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(convert_error)
}

async fn update_trip<'c, E>(executor: E, id: Uuid, trip: &Trip) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    use model::owner::Owner;
    let (owner_user_id, owner_guest_session_id) = match trip.owner {
        Owner::User { user_id } => (Some(user_id), None),
        Owner::Guest { guest_session_id } => (None, Some(guest_session_id)),
    };
    let result = sqlx::query(
        "UPDATE trips SET owner_user_id = $2, owner_guest_session_id = $3, status = $4, updated_at = now() WHERE id = $1;",
    )
    .bind(id)
    .bind(owner_user_id)
    .bind(owner_guest_session_id)
    .bind(status_to_str(trip.status))
    .execute(executor)
    .await
    .map_err(convert_error)?;
    if result.rows_affected() == 0 {
        return Err(plan_core::error::PlanError::NotFound(format!("trip {id}")));
    }
    Ok(())
}

async fn fetch_preferences<'c, E>(executor: E, trip_id: Uuid) -> Result<TripPreferencesRow>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT destination, date_start, date_end, travelers, budget, style, daily_window, constraints FROM trip_preferences WHERE trip_id = $1;",
    )
    .bind(trip_id)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

async fn lock_sentinel<'c, E>(executor: E, trip_id: Uuid) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("SELECT trip_id FROM trip_sentinels WHERE trip_id = $1 FOR UPDATE;")
        .bind(trip_id)
        .fetch_optional(executor)
        .await
        .map_err(convert_error)?
        .ok_or_else(|| plan_core::error::PlanError::NotFound(format!("trip {trip_id}")))?;
    Ok(())
}

#[async_trait]
impl TripRepo for PgAutocommit {
    async fn create_trip(&mut self, trip: Trip, preferences: TripPreferences) -> Result<WithId<Trip>> {
        let id = Uuid::new_v4();
        insert_trip(&self.pool, id, &trip).await?;
        insert_sentinel(&self.pool, id).await?;
        insert_preferences(&self.pool, id, &preferences).await?;
        Ok(WithId::new(Id::new(id), trip))
    }

    async fn get_trip(&mut self, id: Id<Trip>) -> Result<WithId<Trip>> {
        let row = fetch_trip(&self.pool, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn update_trip(&mut self, trip: WithId<Trip>) -> Result<WithId<Trip>> {
        update_trip(&self.pool, trip.id.raw(), &trip.content).await?;
        Ok(trip)
    }

    async fn get_preferences(&mut self, trip_id: Id<Trip>) -> Result<TripPreferences> {
        let row = fetch_preferences(&self.pool, trip_id.raw()).await?;
        Ok(row.to_model()?)
    }

    async fn put_preferences(&mut self, trip_id: Id<Trip>, preferences: TripPreferences) -> Result<()> {
        insert_preferences(&self.pool, trip_id.raw(), &preferences).await
    }

    async fn lock_trip(&mut self, trip_id: Id<Trip>) -> Result<()> {
        lock_sentinel(&self.pool, trip_id.raw()).await
    }
}

#[async_trait]
impl<'a> TripRepo for PgTransaction<'a> {
    async fn create_trip(&mut self, trip: Trip, preferences: TripPreferences) -> Result<WithId<Trip>> {
        let id = Uuid::new_v4();
        insert_trip(&mut *self.tx, id, &trip).await?;
        insert_sentinel(&mut *self.tx, id).await?;
        insert_preferences(&mut *self.tx, id, &preferences).await?;
        Ok(WithId::new(Id::new(id), trip))
    }

    async fn get_trip(&mut self, id: Id<Trip>) -> Result<WithId<Trip>> {
        let row = fetch_trip(&mut *self.tx, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn update_trip(&mut self, trip: WithId<Trip>) -> Result<WithId<Trip>> {
        update_trip(&mut *self.tx, trip.id.raw(), &trip.content).await?;
        Ok(trip)
    }

    async fn get_preferences(&mut self, trip_id: Id<Trip>) -> Result<TripPreferences> {
        let row = fetch_preferences(&mut *self.tx, trip_id.raw()).await?;
        Ok(row.to_model()?)
    }

    async fn put_preferences(&mut self, trip_id: Id<Trip>, preferences: TripPreferences) -> Result<()> {
        insert_preferences(&mut *self.tx, trip_id.raw(), &preferences).await
    }

    async fn lock_trip(&mut self, trip_id: Id<Trip>) -> Result<()> {
        lock_sentinel(&mut *self.tx, trip_id.raw()).await
    }
}
