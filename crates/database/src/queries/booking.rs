use async_trait::async_trait;
use model::{
    booking::{Booking, BookingOutcome, BookingStateHistoryEntry, BookingStatus, IdempotencyRecord},
    trip::Trip,
    WithId,
};
use plan_core::{
    error::{PlanError, Result},
    store::BookingRepo,
};
use sqlx::{types::Json, Executor, Postgres};
use utility::id::Id;
use uuid::Uuid;

use crate::{
    data_model::booking::{status_to_str, BookingRow, BookingStateHistoryRow},
    PgAutocommit, PgTransaction,
};

use super::convert_error;

async fn insert_booking<'c, E>(executor: E, id: Uuid, booking: &Booking) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO bookings (
            id, trip_id, item_id, provider_id, provider_type, external_booking_id, status,
            price, policies, voucher_url, voucher_data, confirmation_number, traveler_details,
            booking_date, booking_time, contact_info
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16);
        ",
    )
    .bind(id)
    .bind(booking.trip_id.raw())
    .bind(booking.item_id.map(|item_id| item_id.raw()))
    .bind(&booking.provider_id)
    .bind(&booking.provider_type)
    .bind(&booking.external_booking_id)
    .bind(status_to_str(booking.status))
    .bind(booking.price.map(Json))
    .bind(booking.policies.clone().map(Json))
    .bind(&booking.voucher_url)
    .bind(&booking.voucher_data)
    .bind(&booking.confirmation_number)
    .bind(Json(&booking.traveler_details))
    .bind(booking.booking_date)
    .bind(booking.booking_time.map(|time| time.format()))
    .bind(Json(&booking.contact_info))
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn fetch_booking<'c, E>(executor: E, id: Uuid) -> Result<BookingRow>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, trip_id, item_id, provider_id, provider_type, external_booking_id, status,
               price, policies, voucher_url, voucher_data, confirmation_number, traveler_details,
               booking_date, booking_time, contact_info
        FROM bookings WHERE id = $1;
        ",
    )
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

async fn fetch_bookings_for_trip<'c, E>(executor: E, trip_id: Uuid) -> Result<Vec<BookingRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, trip_id, item_id, provider_id, provider_type, external_booking_id, status,
               price, policies, voucher_url, voucher_data, confirmation_number, traveler_details,
               booking_date, booking_time, contact_info
        FROM bookings WHERE trip_id = $1;
        ",
    )
    .bind(trip_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

async fn fetch_booking_by_external_id<'c, E>(executor: E, external_booking_id: &str) -> Result<Option<BookingRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, trip_id, item_id, provider_id, provider_type, external_booking_id, status,
               price, policies, voucher_url, voucher_data, confirmation_number, traveler_details,
               booking_date, booking_time, contact_info
        FROM bookings WHERE external_booking_id = $1;
        ",
    )
    .bind(external_booking_id)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
}

async fn update_status<'c, E>(executor: E, id: Uuid, status: BookingStatus) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1;")
        .bind(id)
        .bind(status_to_str(status))
        .execute(executor)
        .await
        .map_err(convert_error)?;
    if result.rows_affected() == 0 {
        return Err(PlanError::NotFound(format!("booking {id}")));
    }
    Ok(())
}

async fn update_outcome<'c, E>(executor: E, id: Uuid, status: BookingStatus, outcome: &BookingOutcome) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query(
        "
        UPDATE bookings SET
            status = $2, price = $3, policies = $4, voucher_url = $5, voucher_data = $6,
            confirmation_number = $7, external_booking_id = $8
        WHERE id = $1;
        ",
    )
    .bind(id)
    .bind(status_to_str(status))
    .bind(outcome.price.map(Json))
    .bind(outcome.policies.clone().map(Json))
    .bind(&outcome.voucher_url)
    .bind(&outcome.voucher_data)
    .bind(&outcome.confirmation_number)
    .bind(&outcome.external_booking_id)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    if result.rows_affected() == 0 {
        return Err(PlanError::NotFound(format!("booking {id}")));
    }
    Ok(())
}

async fn insert_history_entry<'c, E>(executor: E, booking_id: Uuid, entry: &BookingStateHistoryEntry) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO booking_state_history (booking_id, from_status, to_status, reason, changed_by, ts)
        VALUES ($1, $2, $3, $4, $5, $6);
        ",
    )
    .bind(booking_id)
    .bind(entry.from_status.map(status_to_str))
    .bind(status_to_str(entry.to_status))
    .bind(&entry.reason)
    .bind(&entry.changed_by)
    .bind(entry.ts)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

async fn fetch_history<'c, E>(executor: E, booking_id: Uuid) -> Result<Vec<BookingStateHistoryRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT from_status, to_status, reason, changed_by, ts
        FROM booking_state_history WHERE booking_id = $1 ORDER BY ts ASC;
        ",
    )
    .bind(booking_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

async fn fetch_idempotency<'c, E>(executor: E, key: &str) -> Result<Option<IdempotencyRecord>>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: Option<(String, Uuid)> = sqlx::query_as("SELECT key, booking_id FROM booking_idempotency WHERE key = $1;")
        .bind(key)
        .fetch_optional(executor)
        .await
        .map_err(convert_error)?;
    Ok(row.map(|(key, booking_id)| IdempotencyRecord {
        key,
        booking_id: Id::new(booking_id),
    }))
}

async fn insert_idempotency<'c, E>(executor: E, record: &IdempotencyRecord) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("INSERT INTO booking_idempotency (key, booking_id) VALUES ($1, $2);")
        .bind(&record.key)
        .bind(record.booking_id.raw())
        .execute(executor)
        .await
        .map_err(convert_error)?;
    Ok(())
}

#[async_trait]
impl BookingRepo for PgAutocommit {
    async fn insert_booking(&mut self, booking: Booking) -> Result<WithId<Booking>> {
        let id = Uuid::new_v4();
        insert_booking(&self.pool, id, &booking).await?;
        insert_history_entry(
            &self.pool,
            id,
            &BookingStateHistoryEntry {
                from_status: None,
                to_status: booking.status,
                reason: None,
                changed_by: "system".into(),
                ts: chrono::Utc::now(),
            },
        )
        .await?;
        Ok(WithId::new(Id::new(id), booking))
    }

    async fn get_booking(&mut self, id: Id<Booking>) -> Result<WithId<Booking>> {
        let row = fetch_booking(&self.pool, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn list_bookings_for_trip(&mut self, trip_id: Id<Trip>) -> Result<Vec<WithId<Booking>>> {
        let rows = fetch_bookings_for_trip(&self.pool, trip_id.raw()).await?;
        rows.into_iter()
            .map(|row| Ok(WithId::new(Id::new(row.id), row.to_model()?)))
            .collect()
    }

    async fn update_booking_status(
        &mut self,
        id: Id<Booking>,
        status: BookingStatus,
        entry: BookingStateHistoryEntry,
    ) -> Result<WithId<Booking>> {
        update_status(&self.pool, id.raw(), status).await?;
        insert_history_entry(&self.pool, id.raw(), &entry).await?;
        let row = fetch_booking(&self.pool, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn find_by_external_id(&mut self, external_booking_id: &str) -> Result<Option<WithId<Booking>>> {
        let row = fetch_booking_by_external_id(&self.pool, external_booking_id).await?;
        row.map(|row| Ok(WithId::new(Id::new(row.id), row.to_model()?))).transpose()
    }

    async fn record_outcome(
        &mut self,
        id: Id<Booking>,
        status: BookingStatus,
        outcome: BookingOutcome,
        entry: BookingStateHistoryEntry,
    ) -> Result<WithId<Booking>> {
        update_outcome(&self.pool, id.raw(), status, &outcome).await?;
        insert_history_entry(&self.pool, id.raw(), &entry).await?;
        let row = fetch_booking(&self.pool, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn booking_history(&mut self, id: Id<Booking>) -> Result<Vec<BookingStateHistoryEntry>> {
        let rows = fetch_history(&self.pool, id.raw()).await?;
        rows.iter().map(|row| Ok(row.to_model()?)).collect()
    }

    async fn find_by_idempotency_key(&mut self, key: &str) -> Result<Option<IdempotencyRecord>> {
        fetch_idempotency(&self.pool, key).await
    }

    async fn put_idempotency_record(&mut self, record: IdempotencyRecord) -> Result<()> {
        insert_idempotency(&self.pool, &record).await
    }
}

#[async_trait]
impl<'a> BookingRepo for PgTransaction<'a> {
    async fn insert_booking(&mut self, booking: Booking) -> Result<WithId<Booking>> {
        let id = Uuid::new_v4();
        insert_booking(&mut *self.tx, id, &booking).await?;
        insert_history_entry(
            &mut *self.tx,
            id,
            &BookingStateHistoryEntry {
                from_status: None,
                to_status: booking.status,
                reason: None,
                changed_by: "system".into(),
                ts: chrono::Utc::now(),
            },
        )
        .await?;
        Ok(WithId::new(Id::new(id), booking))
    }

    async fn get_booking(&mut self, id: Id<Booking>) -> Result<WithId<Booking>> {
        let row = fetch_booking(&mut *self.tx, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn list_bookings_for_trip(&mut self, trip_id: Id<Trip>) -> Result<Vec<WithId<Booking>>> {
        let rows = fetch_bookings_for_trip(&mut *self.tx, trip_id.raw()).await?;
        rows.into_iter()
            .map(|row| Ok(WithId::new(Id::new(row.id), row.to_model()?)))
            .collect()
    }

    async fn update_booking_status(
        &mut self,
        id: Id<Booking>,
        status: BookingStatus,
        entry: BookingStateHistoryEntry,
    ) -> Result<WithId<Booking>> {
        update_status(&mut *self.tx, id.raw(), status).await?;
        insert_history_entry(&mut *self.tx, id.raw(), &entry).await?;
        let row = fetch_booking(&mut *self.tx, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn find_by_external_id(&mut self, external_booking_id: &str) -> Result<Option<WithId<Booking>>> {
        let row = fetch_booking_by_external_id(&mut *self.tx, external_booking_id).await?;
        row.map(|row| Ok(WithId::new(Id::new(row.id), row.to_model()?))).transpose()
    }

    async fn record_outcome(
        &mut self,
        id: Id<Booking>,
        status: BookingStatus,
        outcome: BookingOutcome,
        entry: BookingStateHistoryEntry,
    ) -> Result<WithId<Booking>> {
        update_outcome(&mut *self.tx, id.raw(), status, &outcome).await?;
        insert_history_entry(&mut *self.tx, id.raw(), &entry).await?;
        let row = fetch_booking(&mut *self.tx, id.raw()).await?;
        Ok(WithId::new(id, row.to_model()?))
    }

    async fn booking_history(&mut self, id: Id<Booking>) -> Result<Vec<BookingStateHistoryEntry>> {
        let rows = fetch_history(&mut *self.tx, id.raw()).await?;
        rows.iter().map(|row| Ok(row.to_model()?)).collect()
    }

    async fn find_by_idempotency_key(&mut self, key: &str) -> Result<Option<IdempotencyRecord>> {
        fetch_idempotency(&mut *self.tx, key).await
    }

    async fn put_idempotency_record(&mut self, record: IdempotencyRecord) -> Result<()> {
        insert_idempotency(&mut *self.tx, &record).await
    }
}
