use crate::event::AlarmEvent;

/// Icon of an alarm state, or None if the state isn't recognized.
pub fn state_icon(state: &str) -> Option<&'static str> {
    match state {
        "ALARM" => Some(":devil:"),
        "OK" => Some(":sunny:"),
        "INSUFFICIENT_DATA" => Some(":confused:"),
        _ => None,
    }
}

/// Slack incoming-webhook message.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub text: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
}

/// The static parts of every message: where it goes, who it's from, and the
/// function address announced at its foot.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    pub channel: String,
    pub username: String,
    /// Overrides the invoked function ARN as the announced address.
    pub function_arn: Option<String>,
}

impl MessageTemplate {
    pub fn render(&self, alarm: &AlarmEvent, invoked_function_arn: &str) -> OutboundMessage {
        let AlarmEvent {
            alarm_name,
            new_state_value,
            new_state_reason,
            old_state_value: _,
        } = alarm;

        let from = self.function_arn.as_deref().unwrap_or(invoked_function_arn);

        OutboundMessage {
            channel: self.channel.clone(),
            text: format!(
                "{alarm_name} state is now {new_state_value}: {new_state_reason}\n\nI come from {from}"
            ),
            username: self.username.clone(),
            icon_emoji: state_icon(new_state_value).map(str::to_string),
        }
    }
}
