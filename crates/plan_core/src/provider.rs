//! Typed interfaces for the collaborators the core consumes but does not
//! implement: booking providers, the POI catalog, routing and weather.
//! A concrete deployment wires real adapters behind these traits; tests use
//! in-memory stand-ins.

use async_trait::async_trait;
use chrono::NaiveDate;
use model::{location::Location, poi::Poi, preferences::Travelers};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utility::{id::Id, money::Currency, time::TimeOfDay};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSearchOptions {
    pub location: Location,
    pub radius_km: Option<f64>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderListing {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub price: Decimal,
    pub currency: Currency,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDetails {
    pub id: String,
    pub name: String,
    pub location: Option<Location>,
    pub price: Decimal,
    pub currency: Currency,
    pub availability: bool,
    pub cancellation: String,
    pub refund: String,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub time: TimeOfDay,
    pub available: bool,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    pub slots: Option<Vec<AvailabilitySlot>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub provider_item_id: String,
    pub date: NaiveDate,
    pub time_slot: Option<TimeOfDay>,
    pub travelers: Travelers,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedBookingStatus {
    Confirmed,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBooking {
    pub booking_id: String,
    pub status: CreatedBookingStatus,
    pub price: Decimal,
    pub currency: Currency,
    pub cancellation: String,
    pub refund: String,
    pub voucher_url: Option<String>,
    pub voucher_data: Option<String>,
    pub confirmation_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Full,
    Partial,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingResult {
    pub booking_id: String,
    pub refund_amount: Option<Decimal>,
    pub refund_status: RefundStatus,
}

/// `search`/`getDetails`/`createBooking`/... one implementation per
/// provider integration (hotel, tour, activity, ...).
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn search(&self, options: &ProviderSearchOptions) -> Result<Vec<ProviderListing>>;
    async fn get_details(&self, id: &str) -> Result<ProviderDetails>;
    async fn check_availability(
        &self,
        id: &str,
        date: NaiveDate,
        travelers: &Travelers,
    ) -> Result<Availability>;
    /// MUST be idempotent on `request.idempotency_key`: replaying the same
    /// key returns the same `CreatedBooking` rather than creating a second
    /// reservation.
    async fn create_booking(&self, request: &CreateBookingRequest) -> Result<CreatedBooking>;
    async fn get_booking_status(&self, booking_id: &str) -> Result<CreatedBookingStatus>;
    async fn cancel_booking(&self, booking_id: &str) -> Result<CancelBookingResult>;
    async fn health_check(&self) -> bool;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoiSearchFilters {
    pub destination: String,
    pub tags: Vec<String>,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiPage {
    pub items: Vec<Poi>,
    pub total: u32,
}

#[async_trait]
pub trait PoiCatalog: Send + Sync {
    async fn get(&self, id: Id<Poi>) -> Result<Poi>;
    async fn search(&self, filters: &PoiSearchFilters) -> Result<PoiPage>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Walking,
    Transit,
    Taxi,
    Drive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub from: Location,
    pub to: Location,
    pub mode: TransportMode,
    pub departure_time: Option<TimeOfDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub cost_estimate: Option<Decimal>,
    pub polyline: Option<String>,
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn compute_route(&self, request: &RouteRequest) -> Result<RouteResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherConditionKind {
    Sunny,
    LightRain,
    HeavyRain,
    Cloudy,
    Snow,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    pub condition: WeatherConditionKind,
    pub severity: WeatherSeverity,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub impact: String,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn get_weather_forecast(&self, lat: f64, lng: f64, date: NaiveDate) -> Result<WeatherForecast>;
}
