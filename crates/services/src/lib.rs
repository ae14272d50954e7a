//! # services
//!
//! Application services for the ad engine. They depend only on the
//! `domains` ports, never on a concrete adapter.

pub mod ad_service;
pub mod clock;

pub use ad_service::{AdService, ImpressionRequest, SweepReport};
pub use clock::SystemClock;
