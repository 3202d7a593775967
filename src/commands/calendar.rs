// Calendar commands
//
// Three handlers over the calendar collaborator. Each takes a `calendar`
// selector resolved to a provider id through the configured route table.
// The strict past-date / inverted-range checks are gated behind the
// ValidationPolicy toggles; with the relaxed defaults only parseability is
// enforced and the backend rejects genuinely inverted ranges.

use crate::commands::registry::Command;
use crate::commands::types::{Envelope, InputSchema};
use crate::commands::validate::{
    as_object, is_chronological, is_not_past, is_valid_timestamp, non_empty_strings,
};
use crate::services::{CalendarKind, ServiceContext};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::str::FromStr;
use tracing::{error, info};

fn parse_selector(value: &Value) -> Result<CalendarKind, Envelope> {
    let raw = value.as_str().unwrap_or_default();
    CalendarKind::from_str(raw).map_err(|e| Envelope::error(e.to_string()))
}

/// Check the policy-gated date rules shared by listing and creation.
fn check_date_policy(ctx: &ServiceContext, start: &str, end: &str) -> Option<Envelope> {
    if ctx.policy.reject_past_start && !is_not_past(start, Utc::now()) {
        return Some(Envelope::error("start_date cannot be in the past"));
    }
    if ctx.policy.reject_inverted_range && !is_chronological(start, end) {
        return Some(Envelope::error("end_date cannot be before start_date"));
    }
    None
}

/// List calendar events in a date range.
pub struct GetCalendarEvents;

#[async_trait]
impl Command for GetCalendarEvents {
    fn name(&self) -> &str {
        "get_calendar_events"
    }

    fn description(&self) -> &str {
        "List calendar events in a date range on the selected calendar"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::simple(vec![
            ("start_date", "Range start in RFC 3339 format"),
            ("end_date", "Range end in RFC 3339 format"),
            (
                "calendar",
                "Calendar selector: service_calendar, formalities_calendar or product_meeting_calendar",
            ),
        ])
    }

    async fn run(&self, params: Value, ctx: &ServiceContext) -> Result<Envelope> {
        let Some(map) = as_object(&params) else {
            return Ok(Envelope::error(
                "Invalid params: expected object with start_date, end_date and calendar",
            ));
        };

        let start_date = map.get("start_date");
        let end_date = map.get("end_date");
        let calendar = map.get("calendar");

        if !non_empty_strings(&[start_date, end_date, calendar]) {
            return Ok(Envelope::error(
                "start_date, end_date and calendar are required and must be non-empty strings",
            ));
        }

        let start = start_date.and_then(Value::as_str).unwrap_or_default();
        let end = end_date.and_then(Value::as_str).unwrap_or_default();

        if !is_valid_timestamp(start) || !is_valid_timestamp(end) {
            return Ok(Envelope::error("Dates must be in valid RFC3339 format"));
        }
        if let Some(rejected) = check_date_policy(ctx, start, end) {
            return Ok(rejected);
        }

        let kind = match parse_selector(calendar.unwrap_or(&Value::Null)) {
            Ok(kind) => kind,
            Err(envelope) => return Ok(envelope),
        };
        let calendar_id = ctx.calendar_id(kind);

        match ctx.calendar.list_events(calendar_id, start, end).await {
            Ok(events) => {
                info!("Calendar events fetched successfully");
                Ok(Envelope::Data(events))
            }
            Err(e) => {
                error!(error = ?e, "Failed to fetch events from calendar");
                Ok(Envelope::error(e.to_string()))
            }
        }
    }
}

/// Get single event details.
pub struct GetSingleCalendarEvent;

#[async_trait]
impl Command for GetSingleCalendarEvent {
    fn name(&self) -> &str {
        "get_single_calendar_event"
    }

    fn description(&self) -> &str {
        "Get details of a single event on the selected calendar"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::simple(vec![
            ("event_id", "Identifier of the event to fetch"),
            (
                "calendar",
                "Calendar selector: service_calendar, formalities_calendar or product_meeting_calendar",
            ),
        ])
    }

    async fn run(&self, params: Value, ctx: &ServiceContext) -> Result<Envelope> {
        let Some(map) = as_object(&params) else {
            return Ok(Envelope::error(
                "Invalid params: expected object with event_id and calendar",
            ));
        };

        let event_id = map.get("event_id");
        let calendar = map.get("calendar");

        if !non_empty_strings(&[event_id, calendar]) {
            return Ok(Envelope::error(
                "event_id and calendar are required and must be non-empty strings",
            ));
        }

        let kind = match parse_selector(calendar.unwrap_or(&Value::Null)) {
            Ok(kind) => kind,
            Err(envelope) => return Ok(envelope),
        };
        let calendar_id = ctx.calendar_id(kind);
        let event_id = event_id.and_then(Value::as_str).unwrap_or_default();

        match ctx.calendar.get_event(calendar_id, event_id.trim()).await {
            Ok(event) => {
                info!("Calendar event details fetched successfully");
                Ok(Envelope::Event(event))
            }
            Err(e) => {
                error!(error = ?e, "Failed to fetch event details from calendar");
                Ok(Envelope::error(e.to_string()))
            }
        }
    }
}

/// Create a new calendar event.
pub struct CreateCalendarEvent;

impl CreateCalendarEvent {
    /// Build the outgoing event body: the selector field is consumed,
    /// location and description fall back to the configured defaults, and
    /// default reminders are switched off unless the caller set them.
    fn outgoing_body(map: &Map<String, Value>, ctx: &ServiceContext) -> Map<String, Value> {
        let mut body = map.clone();
        body.remove("calendar");

        let location_blank = !matches!(
            body.get("location"),
            Some(Value::String(s)) if !s.trim().is_empty()
        );
        if location_blank {
            body.insert(
                "location".to_string(),
                Value::String(ctx.defaults.location.clone()),
            );
        }

        let description_blank = !matches!(
            body.get("description"),
            Some(Value::String(s)) if !s.trim().is_empty()
        );
        if description_blank {
            body.insert(
                "description".to_string(),
                Value::String(ctx.defaults.description.clone()),
            );
        }

        if !body.contains_key("reminders") {
            body.insert("reminders".to_string(), json!({"useDefault": false}));
        }

        body
    }
}

#[async_trait]
impl Command for CreateCalendarEvent {
    fn name(&self) -> &str {
        "create_calendar_event"
    }

    fn description(&self) -> &str {
        "Create a new event on the selected calendar"
    }

    fn input_schema(&self) -> InputSchema {
        let mut schema = InputSchema::simple(vec![
            ("summary", "Event title"),
            (
                "calendar",
                "Calendar selector: service_calendar, formalities_calendar or product_meeting_calendar",
            ),
        ]);
        let properties = schema.properties.as_object_mut();
        if let Some(properties) = properties {
            properties.insert(
                "start".to_string(),
                json!({
                    "type": "object",
                    "description": "Start as {dateTime, timeZone}, dateTime in RFC 3339 format"
                }),
            );
            properties.insert(
                "end".to_string(),
                json!({
                    "type": "object",
                    "description": "End as {dateTime, timeZone}, dateTime in RFC 3339 format"
                }),
            );
            properties.insert(
                "attendees".to_string(),
                json!({
                    "type": "array",
                    "description": "Attendee email addresses (may be empty)"
                }),
            );
            properties.insert(
                "location".to_string(),
                json!({
                    "type": "string",
                    "description": "Optional location; a fixed default address is used when absent"
                }),
            );
            properties.insert(
                "description".to_string(),
                json!({
                    "type": "string",
                    "description": "Optional description; a fixed placeholder is used when absent"
                }),
            );
        }
        schema.required.extend([
            "start".to_string(),
            "end".to_string(),
            "attendees".to_string(),
        ]);
        schema
    }

    async fn run(&self, params: Value, ctx: &ServiceContext) -> Result<Envelope> {
        let Some(map) = as_object(&params) else {
            return Ok(Envelope::error(
                "Invalid params: expected object with summary, start, end, attendees, \
                 calendar and optional location",
            ));
        };

        if !non_empty_strings(&[map.get("summary")]) {
            return Ok(Envelope::error("summary must be a non-empty string"));
        }
        if !matches!(map.get("attendees"), Some(Value::Array(_))) {
            return Ok(Envelope::error(
                "attendees should be a valid list of strings",
            ));
        }

        let start = map.get("start").and_then(|v| v["dateTime"].as_str());
        let end = map.get("end").and_then(|v| v["dateTime"].as_str());
        let (Some(start), Some(end)) = (start, end) else {
            return Ok(Envelope::error(
                "start.dateTime and end.dateTime are required",
            ));
        };

        if !is_valid_timestamp(start) || !is_valid_timestamp(end) {
            return Ok(Envelope::error("Dates must be in valid RFC3339 format"));
        }
        if let Some(rejected) = check_date_policy(ctx, start, end) {
            return Ok(rejected);
        }

        let calendar = map.get("calendar");
        if !non_empty_strings(&[calendar]) {
            return Ok(Envelope::error(
                "calendar is required and must be a non-empty string",
            ));
        }
        let kind = match parse_selector(calendar.unwrap_or(&Value::Null)) {
            Ok(kind) => kind,
            Err(envelope) => return Ok(envelope),
        };
        let calendar_id = ctx.calendar_id(kind);

        let body = Self::outgoing_body(map, ctx);

        match ctx
            .calendar
            .create_event(calendar_id, Value::Object(body))
            .await
        {
            Ok(created) => {
                info!("Calendar event created successfully");
                Ok(Envelope::Data(created))
            }
            Err(e) => {
                error!(error = ?e, "Error while creating calendar event");
                Ok(Envelope::error(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationPolicy;
    use crate::services::testing::{test_context, test_context_with};

    fn future(offset_hours: i64) -> String {
        (Utc::now() + chrono::Duration::hours(offset_hours))
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }

    #[tokio::test]
    async fn test_list_events_success() {
        let (ctx, log) = test_context();
        let params = json!({
            "start_date": "2025-06-01T10:00:00Z",
            "end_date": "2025-06-02T10:00:00Z",
            "calendar": "service_calendar"
        });

        let envelope = GetCalendarEvents.run(params, &ctx).await.unwrap();
        assert!(matches!(envelope, Envelope::Data(_)));
        assert_eq!(log.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_list_events_missing_fields_never_calls_backend() {
        let (ctx, log) = test_context();
        for params in [
            json!("not an object"),
            json!({"start_date": "2025-06-01T10:00:00Z"}),
            json!({"start_date": "  ", "end_date": "2025-06-02T10:00:00Z", "calendar": "service_calendar"}),
        ] {
            let envelope = GetCalendarEvents.run(params, &ctx).await.unwrap();
            assert!(envelope.is_error());
        }
        assert_eq!(log.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_list_events_bad_timestamp() {
        let (ctx, log) = test_context();
        let params = json!({
            "start_date": "tomorrow",
            "end_date": "2025-06-02T10:00:00Z",
            "calendar": "service_calendar"
        });

        let envelope = GetCalendarEvents.run(params, &ctx).await.unwrap();
        assert_eq!(
            envelope,
            Envelope::error("Dates must be in valid RFC3339 format")
        );
        assert_eq!(log.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_list_events_relaxed_policy_accepts_inverted_range() {
        // With the defaults the handler only checks parseability and the
        // backend decides what to do with an inverted range.
        let (ctx, log) = test_context();
        let params = json!({
            "start_date": "2025-06-02T10:00:00Z",
            "end_date": "2025-06-01T10:00:00Z",
            "calendar": "service_calendar"
        });

        let envelope = GetCalendarEvents.run(params, &ctx).await.unwrap();
        assert!(matches!(envelope, Envelope::Data(_)));
        assert_eq!(log.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_list_events_strict_policy_rejects_inverted_range() {
        let policy = ValidationPolicy {
            reject_past_start: false,
            reject_inverted_range: true,
        };
        let (ctx, log) = test_context_with(policy, false);
        let params = json!({
            "start_date": "2025-06-02T10:00:00Z",
            "end_date": "2025-06-01T10:00:00Z",
            "calendar": "service_calendar"
        });

        let envelope = GetCalendarEvents.run(params, &ctx).await.unwrap();
        assert_eq!(
            envelope,
            Envelope::error("end_date cannot be before start_date")
        );
        assert_eq!(log.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_list_events_strict_policy_rejects_past_start() {
        let policy = ValidationPolicy {
            reject_past_start: true,
            reject_inverted_range: false,
        };
        let (ctx, log) = test_context_with(policy, false);
        let params = json!({
            "start_date": "2020-01-01T10:00:00Z",
            "end_date": "2020-01-02T10:00:00Z",
            "calendar": "service_calendar"
        });

        let envelope = GetCalendarEvents.run(params, &ctx).await.unwrap();
        assert_eq!(envelope, Envelope::error("start_date cannot be in the past"));
        assert_eq!(log.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_list_events_unknown_calendar_selector() {
        let (ctx, log) = test_context();
        let params = json!({
            "start_date": "2025-06-01T10:00:00Z",
            "end_date": "2025-06-02T10:00:00Z",
            "calendar": "holiday_calendar"
        });

        let envelope = GetCalendarEvents.run(params, &ctx).await.unwrap();
        assert_eq!(envelope, Envelope::error("Unknown calendar: holiday_calendar"));
        assert_eq!(log.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_list_events_collaborator_failure_becomes_error_envelope() {
        let (ctx, _log) = test_context_with(ValidationPolicy::default(), true);
        let params = json!({
            "start_date": "2025-06-01T10:00:00Z",
            "end_date": "2025-06-02T10:00:00Z",
            "calendar": "service_calendar"
        });

        let envelope = GetCalendarEvents.run(params, &ctx).await.unwrap();
        assert_eq!(envelope, Envelope::error("calendar backend unavailable"));
    }

    #[tokio::test]
    async fn test_get_single_event_success() {
        let (ctx, _log) = test_context();
        let params = json!({"event_id": "evt-9", "calendar": "formalities_calendar"});

        let envelope = GetSingleCalendarEvent.run(params, &ctx).await.unwrap();
        let Envelope::Event(event) = envelope else {
            panic!("expected event envelope");
        };
        assert_eq!(event["id"], "evt-9");
        assert_eq!(event["calendar"], "form-cal-id");
    }

    #[tokio::test]
    async fn test_get_single_event_requires_event_id() {
        let (ctx, log) = test_context();
        let params = json!({"calendar": "service_calendar"});

        let envelope = GetSingleCalendarEvent.run(params, &ctx).await.unwrap();
        assert!(envelope.is_error());
        assert_eq!(log.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_event_defaults_location_when_absent() {
        let (ctx, log) = test_context();
        let params = json!({
            "summary": "Service visit",
            "attendees": ["anna@example.com"],
            "start": {"dateTime": future(24), "timeZone": "Europe/Warsaw"},
            "end": {"dateTime": future(25), "timeZone": "Europe/Warsaw"},
            "calendar": "service_calendar"
        });

        let envelope = CreateCalendarEvent.run(params, &ctx).await.unwrap();
        assert!(matches!(envelope, Envelope::Data(_)));

        let (calendar_id, body) = log.last_created_event.lock().unwrap().clone().unwrap();
        assert_eq!(calendar_id, "svc-cal-id");
        assert_eq!(body["location"], "ul. Wałowa 3, 43-100 Skoczów");
        assert_eq!(body["reminders"], json!({"useDefault": false}));
        assert!(body.get("calendar").is_none(), "selector must be consumed");
    }

    #[tokio::test]
    async fn test_create_event_defaults_location_when_blank() {
        let (ctx, log) = test_context();
        let params = json!({
            "summary": "Service visit",
            "attendees": [],
            "location": "  ",
            "start": {"dateTime": future(24), "timeZone": "Europe/Warsaw"},
            "end": {"dateTime": future(25), "timeZone": "Europe/Warsaw"},
            "calendar": "service_calendar"
        });

        CreateCalendarEvent.run(params, &ctx).await.unwrap();
        let (_, body) = log.last_created_event.lock().unwrap().clone().unwrap();
        assert_eq!(body["location"], "ul. Wałowa 3, 43-100 Skoczów");
    }

    #[tokio::test]
    async fn test_create_event_keeps_caller_location_and_reminders() {
        let (ctx, log) = test_context();
        let params = json!({
            "summary": "Meeting",
            "attendees": [],
            "location": "Rynek 1, Kraków",
            "reminders": {"useDefault": true},
            "start": {"dateTime": future(24), "timeZone": "Europe/Warsaw"},
            "end": {"dateTime": future(25), "timeZone": "Europe/Warsaw"},
            "calendar": "product_meeting_calendar"
        });

        CreateCalendarEvent.run(params, &ctx).await.unwrap();
        let (calendar_id, body) = log.last_created_event.lock().unwrap().clone().unwrap();
        assert_eq!(calendar_id, "meet-cal-id");
        assert_eq!(body["location"], "Rynek 1, Kraków");
        assert_eq!(body["reminders"], json!({"useDefault": true}));
    }

    #[tokio::test]
    async fn test_create_event_attendees_must_be_list() {
        let (ctx, log) = test_context();
        let params = json!({
            "summary": "Meeting",
            "attendees": "anna@example.com",
            "start": {"dateTime": future(24)},
            "end": {"dateTime": future(25)},
            "calendar": "service_calendar"
        });

        let envelope = CreateCalendarEvent.run(params, &ctx).await.unwrap();
        assert_eq!(
            envelope,
            Envelope::error("attendees should be a valid list of strings")
        );
        assert_eq!(log.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_event_requires_date_times() {
        let (ctx, log) = test_context();
        let params = json!({
            "summary": "Meeting",
            "attendees": [],
            "start": {"timeZone": "Europe/Warsaw"},
            "end": {"dateTime": future(25)},
            "calendar": "service_calendar"
        });

        let envelope = CreateCalendarEvent.run(params, &ctx).await.unwrap();
        assert_eq!(
            envelope,
            Envelope::error("start.dateTime and end.dateTime are required")
        );
        assert_eq!(log.total_calls(), 0);
    }
}
