use crate::models::chat::Message;
use serde::{ Deserialize, Serialize };

/// Event pushed by the server over the chat list socket, tagged by `frontend_type`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "frontend_type")]
pub enum LiveEvent {
    #[serde(rename = "teamup")] TeamUp {
        comm_id: String,
        #[serde(default)]
        agent_names: Vec<String>,
        #[serde(default)]
        team_name: Option<String>,
    },
    #[serde(rename = "message")] Message(Message),
    #[serde(other)]
    Unrecognized,
}

/// Lifecycle of the live channel connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    /// Retries are exhausted; no further attempt is made this session.
    Failed,
}

impl LiveEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_teamup_without_team_name() {
        let event = LiveEvent::parse(
            r#"{"frontend_type":"teamup","comm_id":"7","agent_names":["X"]}"#
        ).unwrap();
        assert_eq!(event, LiveEvent::TeamUp {
            comm_id: "7".to_string(),
            agent_names: vec!["X".to_string()],
            team_name: None,
        });
    }

    #[test]
    fn parses_message_payload() {
        let event = LiveEvent::parse(
            r#"{"frontend_type":"message","comm_id":"7","sender":"X","content":"hello",
                "type":1,"next_speaker":["Y"],"updated_plan":"step 1"}"#
        ).unwrap();
        match event {
            LiveEvent::Message(msg) => {
                assert_eq!(msg.comm_id, "7");
                assert_eq!(msg.sender, "X");
                assert_eq!(msg.next_speaker, vec!["Y".to_string()]);
                assert_eq!(msg.updated_plan, "step 1");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unknown_discriminant_is_unrecognized() {
        let event = LiveEvent::parse(r#"{"frontend_type":"typing","comm_id":"7"}"#).unwrap();
        assert_eq!(event, LiveEvent::Unrecognized);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(LiveEvent::parse("{not json").is_err());
        assert!(LiveEvent::parse(r#"{"comm_id":"7"}"#).is_err());
    }
}
