use chrono::{DateTime, NaiveDate, Utc};
use model::booking::{
    Booking, BookingStateHistoryEntry, BookingStatus, CancellationPolicy, ContactInfo,
    TravelerDetails,
};
use sqlx::{prelude::FromRow, types::Json};
use utility::{id::Id, money::Money, time::TimeOfDay};
use uuid::Uuid;

use crate::CorruptRow;

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub item_id: Option<Uuid>,
    pub provider_id: String,
    pub provider_type: String,
    pub external_booking_id: Option<String>,
    pub status: String,
    pub price: Option<Json<Money>>,
    pub policies: Option<Json<CancellationPolicy>>,
    pub voucher_url: Option<String>,
    pub voucher_data: Option<String>,
    pub confirmation_number: Option<String>,
    pub traveler_details: Json<TravelerDetails>,
    pub booking_date: NaiveDate,
    pub booking_time: Option<String>,
    pub contact_info: Json<ContactInfo>,
}

impl BookingRow {
    pub fn to_model(&self) -> Result<Booking, CorruptRow> {
        let status = status_from_str(&self.status)?;
        let booking_time = self
            .booking_time
            .as_deref()
            .map(TimeOfDay::parse)
            .transpose()
            .map_err(|_| CorruptRow("unparsable booking_time"))?;
        Ok(Booking {
            trip_id: Id::new(self.trip_id),
            item_id: self.item_id.map(Id::new),
            provider_id: self.provider_id.clone(),
            provider_type: self.provider_type.clone(),
            external_booking_id: self.external_booking_id.clone(),
            status,
            price: self.price.clone().map(|json| json.0),
            policies: self.policies.clone().map(|json| json.0),
            voucher_url: self.voucher_url.clone(),
            voucher_data: self.voucher_data.clone(),
            confirmation_number: self.confirmation_number.clone(),
            traveler_details: self.traveler_details.0.clone(),
            booking_date: self.booking_date,
            booking_time,
            contact_info: self.contact_info.0.clone(),
        })
    }
}

pub fn status_to_str(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "pending",
        BookingStatus::Confirmed => "confirmed",
        BookingStatus::Failed => "failed",
        BookingStatus::Canceled => "canceled",
        BookingStatus::Refunded => "refunded",
    }
}

pub fn status_from_str(value: &str) -> Result<BookingStatus, CorruptRow> {
    Ok(match value {
        "pending" => BookingStatus::Pending,
        "confirmed" => BookingStatus::Confirmed,
        "failed" => BookingStatus::Failed,
        "canceled" => BookingStatus::Canceled,
        "refunded" => BookingStatus::Refunded,
        _ => return Err(CorruptRow("unrecognized booking status")),
    })
}

#[derive(Debug, Clone, FromRow)]
pub struct BookingStateHistoryRow {
    pub from_status: Option<String>,
    pub to_status: String,
    pub reason: Option<String>,
    pub changed_by: String,
    pub ts: DateTime<Utc>,
}

impl BookingStateHistoryRow {
    pub fn to_model(&self) -> Result<BookingStateHistoryEntry, CorruptRow> {
        Ok(BookingStateHistoryEntry {
            from_status: self.from_status.as_deref().map(status_from_str).transpose()?,
            to_status: status_from_str(&self.to_status)?,
            reason: self.reason.clone(),
            changed_by: self.changed_by.clone(),
            ts: self.ts,
        })
    }
}
