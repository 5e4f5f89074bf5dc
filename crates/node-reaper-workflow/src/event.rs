//! Parsing of inbound termination events.
//!
//! Two payload shapes trigger a run:
//!
//! - an SNS delivery envelope whose `Message` is an autoscaling notification
//!   or lifecycle-hook message carrying `EC2InstanceId`
//! - a direct request, `{"instance_id": "..."}`
//!
//! Autoscaling test notifications and launch events are recognised and
//! acknowledged without running a workflow.

use node_reaper_core::{IdError, InstanceId};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Event name of the notification sent when a topic is attached to a group.
pub const TEST_NOTIFICATION: &str = "autoscaling:TEST_NOTIFICATION";

/// Event and lifecycle transition names that mean the instance is going away.
const TERMINATION_EVENTS: [&str; 2] = [
    "autoscaling:EC2_INSTANCE_TERMINATE",
    "autoscaling:EC2_INSTANCE_TERMINATING",
];

/// What an inbound event asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Decommission the node backing this instance.
    Terminate(InstanceId),
    /// A test notification; nothing to do.
    Test,
    /// An event this service does not act on, by name.
    Ignored(String),
}

/// Errors that can occur while parsing an inbound event.
#[derive(Debug, Error)]
pub enum EventError {
    /// The SNS envelope contained no records.
    #[error("event contains no records")]
    NoRecords,

    /// The payload is neither an SNS envelope nor a direct request.
    #[error("unrecognised event payload: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The SNS message body is not valid JSON.
    #[error("invalid notification message: {0}")]
    InvalidMessage(#[source] serde_json::Error),

    /// The notification has no instance id.
    #[error("notification does not contain an instance id")]
    MissingInstanceId,

    /// The instance id is not a valid identifier.
    #[error("invalid instance id: {0}")]
    InvalidInstanceId(#[from] IdError),
}

impl EventError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        400
    }
}

#[derive(Deserialize)]
struct SnsEnvelope {
    #[serde(rename = "Records")]
    records: Vec<SnsRecord>,
}

#[derive(Deserialize)]
struct SnsRecord {
    #[serde(rename = "Sns")]
    sns: SnsMessage,
}

#[derive(Deserialize)]
struct SnsMessage {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Deserialize)]
struct AutoscalingMessage {
    #[serde(rename = "Event")]
    event: Option<String>,
    #[serde(rename = "LifecycleTransition")]
    lifecycle_transition: Option<String>,
    #[serde(rename = "EC2InstanceId")]
    instance_id: Option<String>,
}

/// A direct decommission request.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectRequest {
    /// The instance being terminated.
    pub instance_id: InstanceId,
}

/// Parse an inbound event payload.
///
/// SNS delivers one record per invocation; only the first record is read.
///
/// # Errors
///
/// Returns an error if the payload matches neither shape, or if it carries no
/// valid instance id.
pub fn parse_notification(payload: Value) -> Result<Notification, EventError> {
    if payload.get("Records").is_some() {
        let envelope: SnsEnvelope =
            serde_json::from_value(payload).map_err(EventError::Malformed)?;
        let record = envelope.records.into_iter().next().ok_or(EventError::NoRecords)?;
        return parse_autoscaling_message(&record.sns.message);
    }

    let request: DirectRequest = serde_json::from_value(payload).map_err(EventError::Malformed)?;
    Ok(Notification::Terminate(request.instance_id))
}

/// Parse the body of an autoscaling notification or lifecycle-hook message.
///
/// # Errors
///
/// Returns an error if the message is not JSON or has no valid instance id.
pub fn parse_autoscaling_message(message: &str) -> Result<Notification, EventError> {
    let message: AutoscalingMessage =
        serde_json::from_str(message).map_err(EventError::InvalidMessage)?;

    if message.event.as_deref() == Some(TEST_NOTIFICATION) {
        return Ok(Notification::Test);
    }

    if let Some(name) = message.event.or(message.lifecycle_transition) {
        if !TERMINATION_EVENTS.contains(&name.as_str()) {
            return Ok(Notification::Ignored(name));
        }
    }

    let instance_id = message.instance_id.ok_or(EventError::MissingInstanceId)?;
    Ok(Notification::Terminate(InstanceId::new(instance_id)?))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sns(message: &Value) -> Value {
        json!({
            "Records": [{
                "EventSource": "aws:sns",
                "Sns": {
                    "Type": "Notification",
                    "Subject": "Auto Scaling: termination",
                    "Message": message.to_string(),
                }
            }]
        })
    }

    fn terminate(id: &str) -> Notification {
        Notification::Terminate(InstanceId::new(id).unwrap())
    }

    #[test]
    fn termination_notification() {
        let payload = sns(&json!({
            "Event": "autoscaling:EC2_INSTANCE_TERMINATE",
            "AutoScalingGroupName": "workers",
            "EC2InstanceId": "i-0abc123",
        }));
        assert_eq!(parse_notification(payload).unwrap(), terminate("i-0abc123"));
    }

    #[test]
    fn lifecycle_hook_message() {
        let payload = sns(&json!({
            "LifecycleHookName": "drain",
            "LifecycleTransition": "autoscaling:EC2_INSTANCE_TERMINATING",
            "EC2InstanceId": "i-0def456",
        }));
        assert_eq!(parse_notification(payload).unwrap(), terminate("i-0def456"));
    }

    #[test]
    fn message_without_event_name_is_termination() {
        let payload = sns(&json!({ "EC2InstanceId": "i-1" }));
        assert_eq!(parse_notification(payload).unwrap(), terminate("i-1"));
    }

    #[test]
    fn test_notification_is_acknowledged() {
        let payload = sns(&json!({
            "Event": "autoscaling:TEST_NOTIFICATION",
            "AutoScalingGroupName": "workers",
        }));
        assert_eq!(parse_notification(payload).unwrap(), Notification::Test);
    }

    #[test]
    fn launch_event_is_ignored() {
        let payload = sns(&json!({
            "Event": "autoscaling:EC2_INSTANCE_LAUNCH",
            "EC2InstanceId": "i-new",
        }));
        assert_eq!(
            parse_notification(payload).unwrap(),
            Notification::Ignored("autoscaling:EC2_INSTANCE_LAUNCH".to_string())
        );
    }

    #[test]
    fn direct_request() {
        let payload = json!({ "instance_id": "i-0abc123" });
        assert_eq!(parse_notification(payload).unwrap(), terminate("i-0abc123"));
    }

    #[test]
    fn empty_records() {
        let err = parse_notification(json!({ "Records": [] })).unwrap_err();
        assert!(matches!(err, EventError::NoRecords));
    }

    #[test]
    fn message_is_not_json() {
        let payload = json!({ "Records": [{ "Sns": { "Message": "not json" } }] });
        let err = parse_notification(payload).unwrap_err();
        assert!(matches!(err, EventError::InvalidMessage(_)));
    }

    #[test]
    fn termination_without_instance_id() {
        let payload = sns(&json!({ "Event": "autoscaling:EC2_INSTANCE_TERMINATE" }));
        let err = parse_notification(payload).unwrap_err();
        assert!(matches!(err, EventError::MissingInstanceId));
    }

    #[test]
    fn invalid_instance_id() {
        let payload = sns(&json!({ "EC2InstanceId": "i-1 extra" }));
        let err = parse_notification(payload).unwrap_err();
        assert!(matches!(err, EventError::InvalidInstanceId(IdError::InvalidCharacters)));
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn unrecognised_payload() {
        let err = parse_notification(json!({ "hello": "world" })).unwrap_err();
        assert!(matches!(err, EventError::Malformed(_)));

        let err = parse_notification(json!({ "instance_id": "" })).unwrap_err();
        assert!(matches!(err, EventError::Malformed(_)));
    }
}
