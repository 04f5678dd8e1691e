//! Load driver for the OpenAssessment (ORA) block of an Open edX course.
//!
//! Virtual users log in through `auto_auth`, load the block's steps, submit a
//! response and switch to a fresh identity. goose schedules the users, paces
//! them with randomized think time and keeps the request metrics.

pub mod client;
pub mod config;
pub mod error;
pub mod fanout;
pub mod fixtures;
pub mod page;
pub mod protocol;
pub mod tasks;
pub mod telemetry;
pub mod util;

pub use error::LoadError;
