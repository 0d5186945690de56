pub mod config;
pub mod grid;
pub mod plot;
pub mod record;
pub mod report;
