pub mod geo;
pub mod metrics;
pub mod position_fix;
pub mod route;
pub mod time_format;
pub mod trip_record;
