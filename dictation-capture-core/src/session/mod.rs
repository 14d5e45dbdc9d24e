pub mod capture_session;
pub mod clock;
pub mod telemetry;
