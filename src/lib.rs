pub mod calendar;
pub mod config;
pub mod controller;
pub mod engine;
pub mod fetch;
pub mod limits;
pub mod model;
pub mod observability;
pub mod poll;
pub mod source;
pub mod templates;
#[cfg(test)]
mod testing;

pub use calendar::{Calendar, CalendarKey};
