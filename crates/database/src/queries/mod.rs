use plan_core::error::PlanError;

pub mod booking;
pub mod event;
pub mod itinerary;
pub mod replan;
pub mod trip;

pub(crate) fn convert_error(why: sqlx::Error) -> PlanError {
    match why {
        sqlx::Error::RowNotFound => PlanError::NotFound("row".into()),
        other => PlanError::storage(other),
    }
}
