//! Appointment tools
//!
//! `get_available_slots` reads the day's booked events and feeds the pure
//! availability engine; `create_appointment` writes an activity record after
//! checking the requested start against business hours.
//!
//! Event timestamps are taken at face value as business-local civil time (no
//! DST-aware conversion); see `frontdesk_core::availability`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc, Weekday};
use frontdesk_config::SchedulingConfig;
use frontdesk_core::{
    availability, available_slots, BookedInterval, DayAvailability, RecordGateway,
};
use frontdesk_crm::QueryBuilder;
use serde_json::{json, Value};

use crate::mcp::{InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema};

fn parse_date(raw: &str) -> Result<NaiveDate, ToolError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .map_err(|_| ToolError::invalid_params("date must be in format YYYY-MM-DD or MM/DD/YYYY"))
}

/// Parse an event timestamp as stored by the CRM.
///
/// Accepts the REST form (`2026-08-05T14:00:00.000+0000`) and bare ISO
/// datetimes with or without a trailing `Z`. Offset-carrying values are
/// normalized to their UTC clock face, which this service then reads as
/// business-local civil time.
fn parse_event_time(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// List the open appointment slots for a date.
pub struct GetAvailableSlotsTool {
    gateway: Arc<dyn RecordGateway>,
    scheduling: SchedulingConfig,
}

impl GetAvailableSlotsTool {
    pub fn new(gateway: Arc<dyn RecordGateway>, scheduling: SchedulingConfig) -> Self {
        Self { gateway, scheduling }
    }
}

#[async_trait]
impl Tool for GetAvailableSlotsTool {
    fn name(&self) -> &str {
        "get_available_slots"
    }

    fn description(&self) -> &str {
        "List the open appointment times for a given date. The office is \
         closed on weekends."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object().property(
                "date",
                PropertySchema::string("Requested date (YYYY-MM-DD)"),
                true,
            ),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let raw_date = input
            .get("date")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("date is required"))?;
        let date = parse_date(raw_date)?;

        let statement = QueryBuilder::new(&self.scheduling.appointment_object)
            .select(["Id", "StartDateTime", "EndDateTime"])
            .on_date("ActivityDate", date)
            .build();
        let records = self.gateway.query(&statement).await?;

        let mut booked = Vec::with_capacity(records.len());
        for record in &records {
            let start = record.get("StartDateTime").and_then(|v| v.as_str());
            let end = record.get("EndDateTime").and_then(|v| v.as_str());
            match (start.and_then(parse_event_time), end.and_then(parse_event_time)) {
                (Some(start), Some(end)) => booked.push(BookedInterval { start, end }),
                _ => {
                    // Malformed calendar rows under-offer rather than crash.
                    tracing::warn!(?start, ?end, "skipping unparseable event times");
                }
            }
        }

        let display_date = date.format("%Y-%m-%d").to_string();
        match available_slots(date, &booked, &self.scheduling.business_hours()) {
            DayAvailability::Closed => Ok(ToolOutput::json(json!({
                "date": display_date,
                "open": false,
                "slots": [],
                "message": format!("The office is closed on {}.", date.format("%A")),
            }))),
            DayAvailability::Open(slots) => Ok(ToolOutput::json(json!({
                "date": display_date,
                "open": true,
                "count": slots.len(),
                "slots": slots,
            }))),
        }
    }
}

/// Book an appointment for a contact.
pub struct CreateAppointmentTool {
    gateway: Arc<dyn RecordGateway>,
    scheduling: SchedulingConfig,
}

impl CreateAppointmentTool {
    pub fn new(gateway: Arc<dyn RecordGateway>, scheduling: SchedulingConfig) -> Self {
        Self { gateway, scheduling }
    }
}

#[async_trait]
impl Tool for CreateAppointmentTool {
    fn name(&self) -> &str {
        "create_appointment"
    }

    fn description(&self) -> &str {
        "Schedule an appointment for an existing contact at one of the \
         offered times."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("contact_id", PropertySchema::string("Id of the contact to book"), true)
                .property("date", PropertySchema::string("Appointment date (YYYY-MM-DD)"), true)
                .property(
                    "time",
                    PropertySchema::string("Start time, e.g. \"3:00 PM\" or \"15:00\""),
                    true,
                )
                .property(
                    "duration_minutes",
                    PropertySchema::integer("Length in minutes; defaults to one slot"),
                    false,
                )
                .property("subject", PropertySchema::string("Calendar subject line"), false)
                .property("notes", PropertySchema::string("Notes for the appointment"), false),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let contact_id = input
            .get("contact_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("contact_id is required"))?;
        let raw_date = input
            .get("date")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("date is required"))?;
        let raw_time = input
            .get("time")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("time is required"))?;

        let date = parse_date(raw_date)?;
        if date < Utc::now().date_naive() {
            return Err(ToolError::invalid_params("date cannot be in the past"));
        }
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Err(ToolError::invalid_params(
                "the office is closed on weekends",
            ));
        }

        let start_minutes = availability::parse_slot_label(raw_time)
            .ok_or_else(|| ToolError::invalid_params("time must look like \"3:00 PM\" or \"15:00\""))?;
        let duration = input
            .get("duration_minutes")
            .and_then(|v| v.as_u64())
            .unwrap_or(u64::from(self.scheduling.default_duration_minutes))
            as i64;
        if duration <= 0 {
            return Err(ToolError::invalid_params("duration_minutes must be positive"));
        }

        let open = i64::from(self.scheduling.open_hour) * 60;
        let close = i64::from(self.scheduling.close_hour) * 60;
        if start_minutes < open || start_minutes + duration > close {
            return Err(ToolError::invalid_params(format!(
                "requested time is outside business hours ({} - {})",
                availability::format_12h(open),
                availability::format_12h(close),
            )));
        }

        let start = date
            .and_hms_opt((start_minutes / 60) as u32, (start_minutes % 60) as u32, 0)
            .ok_or_else(|| ToolError::invalid_params("unrepresentable start time"))?;
        let end = start + chrono::Duration::minutes(duration);

        let subject = input
            .get("subject")
            .and_then(|v| v.as_str())
            .unwrap_or("Appointment");

        let mut fields = json!({
            "Subject": subject,
            "WhoId": contact_id,
            "StartDateTime": format!("{}Z", start.format("%Y-%m-%dT%H:%M:%S")),
            "EndDateTime": format!("{}Z", end.format("%Y-%m-%dT%H:%M:%S")),
            "DurationInMinutes": duration,
        });
        if let Some(notes) = input.get("notes").and_then(|v| v.as_str()) {
            fields["Description"] = json!(notes);
        }

        let id = self
            .gateway
            .create(&self.scheduling.appointment_object, fields)
            .await?;
        tracing::info!(appointment_id = %id, contact_id, "appointment created");

        Ok(ToolOutput::json(json!({
            "success": true,
            "appointment_id": id,
            "contact_id": contact_id,
            "date": date.format("%Y-%m-%d").to_string(),
            "time": availability::format_12h(start_minutes),
            "duration_minutes": duration,
        })))
    }

    fn timeout_secs(&self) -> u64 {
        60
    }
}
