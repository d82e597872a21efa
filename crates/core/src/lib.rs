//! Core types and pure logic for the frontdesk gateway
//!
//! This crate provides the foundation used across all other crates:
//! - Phone number candidate expansion for fuzzy CRM lookups
//! - Business-hours availability computation
//! - The `RecordGateway` trait for pluggable CRM backends
//!
//! Everything here is either a pure function or a trait boundary; no I/O.

pub mod availability;
pub mod gateway;
pub mod phone;

pub use availability::{
    available_slots, format_12h, parse_slot_label, BookedInterval, BusinessHours, DayAvailability,
};
pub use gateway::{GatewayError, Record, RecordGateway, StubRecordGateway};
pub use phone::candidates;
