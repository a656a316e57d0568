// JSON handlers for the dashboard API.

pub mod sections;
pub mod status;
