//! Inbound SNS notification envelopes, and the CloudWatch alarm state
//! changes they carry.
use crate::Error;
use serde::Deserialize;

/// SNS event envelope as delivered to a subscribed Lambda function.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    pub records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
pub struct Record {
    #[serde(rename = "Sns")]
    pub sns: Notification,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Notification {
    /// JSON-encoded CloudWatch alarm body.
    pub message: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic_arn: Option<String>,
}

/// A CloudWatch alarm state change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlarmEvent {
    pub alarm_name: String,
    /// Usually one of ALARM, OK, or INSUFFICIENT_DATA, but any value is accepted.
    pub new_state_value: String,
    pub new_state_reason: String,
    #[serde(default)]
    pub old_state_value: Option<String>,
}

impl AlarmEvent {
    /// Extract the alarm carried by the first record of an SNS envelope.
    pub fn from_envelope(payload: serde_json::Value) -> Result<AlarmEvent, Error> {
        let Envelope { records } = serde_json::from_value(payload).map_err(Error::Envelope)?;

        let mut records = records.into_iter();
        let Some(Record { sns }) = records.next() else {
            return Err(Error::NoRecords);
        };

        let ignored = records.count();
        if ignored != 0 {
            tracing::warn!(
                %ignored,
                message_id = ?sns.message_id,
                "SNS envelope has multiple records; only the first is forwarded"
            );
        }
        tracing::debug!(
            message_id = ?sns.message_id,
            topic_arn = ?sns.topic_arn,
            subject = ?sns.subject,
            "received SNS notification"
        );

        serde_json::from_str(&sns.message).map_err(Error::AlarmMessage)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use serde_json::json;

    pub(crate) fn sns_envelope(messages: &[serde_json::Value]) -> serde_json::Value {
        let records: Vec<_> = messages
            .iter()
            .enumerate()
            .map(|(index, message)| {
                json!({
                    "EventSource": "aws:sns",
                    "EventVersion": "1.0",
                    "EventSubscriptionArn": "arn:aws:sns:us-east-1:123456789012:alarms:2bcfbf39-05c3-41de-beaa-fcfcc21c8f55",
                    "Sns": {
                        "Type": "Notification",
                        "MessageId": format!("95df01b4-ee98-5cb9-9903-4c221d41eb5{index}"),
                        "TopicArn": "arn:aws:sns:us-east-1:123456789012:alarms",
                        "Subject": "ALARM: \"HighCPU\" in US East (N. Virginia)",
                        "Message": message.to_string(),
                        "Timestamp": "2026-10-16T12:00:00.000Z",
                        "SignatureVersion": "1",
                        "MessageAttributes": {}
                    }
                })
            })
            .collect();

        json!({ "Records": records })
    }

    pub(crate) fn alarm_message(name: &str, new_state: &str, reason: &str) -> serde_json::Value {
        json!({
            "AlarmName": name,
            "AlarmDescription": null,
            "AWSAccountId": "123456789012",
            "NewStateValue": new_state,
            "NewStateReason": reason,
            "StateChangeTime": "2026-10-16T12:00:00.000+0000",
            "Region": "US East (N. Virginia)",
            "OldStateValue": "OK",
            "Trigger": {
                "MetricName": "CPUUtilization",
                "Namespace": "AWS/EC2",
                "Statistic": "AVERAGE",
                "Period": 300,
                "EvaluationPeriods": 1,
                "ComparisonOperator": "GreaterThanThreshold",
                "Threshold": 80.0
            }
        })
    }

    #[test]
    fn test_parse_alarm_from_envelope() {
        let envelope = sns_envelope(&[alarm_message(
            "HighCPU",
            "ALARM",
            "Threshold Crossed: 1 datapoint [91.2] was greater than the threshold (80.0).",
        )]);

        let alarm = AlarmEvent::from_envelope(envelope).unwrap();
        assert_eq!(
            alarm,
            AlarmEvent {
                alarm_name: "HighCPU".to_string(),
                new_state_value: "ALARM".to_string(),
                new_state_reason:
                    "Threshold Crossed: 1 datapoint [91.2] was greater than the threshold (80.0)."
                        .to_string(),
                old_state_value: Some("OK".to_string()),
            }
        );
    }

    #[test]
    fn test_minimal_message_fields() {
        let envelope = json!({
            "Records": [{
                "Sns": {
                    "Message": r#"{"AlarmName":"Disk","NewStateValue":"PAUSED","NewStateReason":"why not"}"#
                }
            }]
        });

        let alarm = AlarmEvent::from_envelope(envelope).unwrap();
        assert_eq!(alarm.alarm_name, "Disk");
        assert_eq!(alarm.new_state_value, "PAUSED");
        assert_eq!(alarm.new_state_reason, "why not");
        assert_eq!(alarm.old_state_value, None);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_multiple_records_forwards_first() {
        let envelope = sns_envelope(&[
            alarm_message("First", "OK", "recovered"),
            alarm_message("Second", "ALARM", "tripped"),
        ]);

        let alarm = AlarmEvent::from_envelope(envelope).unwrap();
        assert_eq!(alarm.alarm_name, "First");
        assert!(logs_contain("only the first is forwarded"));
    }

    #[test]
    fn test_envelope_errors() {
        let err = AlarmEvent::from_envelope(json!({ "Records": [] })).unwrap_err();
        assert!(matches!(err, Error::NoRecords), "{err:?}");

        let err = AlarmEvent::from_envelope(json!({ "detail-type": "not sns" })).unwrap_err();
        assert!(matches!(err, Error::Envelope(_)), "{err:?}");

        let err = AlarmEvent::from_envelope(json!({ "Records": [{ "Sns": { "Subject": "no message" } }] }))
            .unwrap_err();
        assert!(matches!(err, Error::Envelope(_)), "{err:?}");
    }

    #[test]
    fn test_malformed_alarm_message() {
        // SNS "raw" test messages aren't JSON-encoded alarms.
        let envelope = json!({ "Records": [{ "Sns": { "Message": "hello from the console" } }] });
        let err = AlarmEvent::from_envelope(envelope).unwrap_err();
        assert!(matches!(err, Error::AlarmMessage(_)), "{err:?}");

        let envelope = sns_envelope(&[json!({ "AlarmName": "NoState" })]);
        let err = AlarmEvent::from_envelope(envelope).unwrap_err();
        assert!(matches!(err, Error::AlarmMessage(_)), "{err:?}");
    }
}
