use serde::de::{ MapAccess, Visitor };
use serde::{ Deserialize, Deserializer, Serialize };
use std::fmt;

/// Kind of an agent message, as numbered by the messaging server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MessageType {
    #[default]
    Default,
    Proposal,
    Vote,
    VotingResult,
    Discussion,
    SyncTaskAssignment,
    AsyncTaskAssignment,
    InformTaskResult,
    InformTaskProgress,
    Pause,
    ConcludeGroupDiscussion,
    Conclusion,
}

impl MessageType {
    pub fn label(self) -> &'static str {
        match self {
            MessageType::Default => "default",
            MessageType::Proposal => "proposal",
            MessageType::Vote => "vote",
            MessageType::VotingResult => "voting result",
            MessageType::Discussion => "discussion",
            MessageType::SyncTaskAssignment => "sync task assignment",
            MessageType::AsyncTaskAssignment => "async task assignment",
            MessageType::InformTaskResult => "inform task result",
            MessageType::InformTaskProgress => "inform task progress",
            MessageType::Pause => "pause",
            MessageType::ConcludeGroupDiscussion => "conclude group discussion",
            MessageType::Conclusion => "conclusion",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let kind = match value {
            0 => MessageType::Default,
            1 => MessageType::Proposal,
            2 => MessageType::Vote,
            3 => MessageType::VotingResult,
            4 => MessageType::Discussion,
            5 => MessageType::SyncTaskAssignment,
            6 => MessageType::AsyncTaskAssignment,
            7 => MessageType::InformTaskResult,
            8 => MessageType::InformTaskProgress,
            9 => MessageType::Pause,
            10 => MessageType::ConcludeGroupDiscussion,
            11 => MessageType::Conclusion,
            other => {
                return Err(format!("unknown message type: {}", other));
            }
        };
        Ok(kind)
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> u8 {
        kind as u8
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One message in a group conversation. Immutable once appended to a log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub comm_id: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    #[serde(default, deserialize_with = "one_or_many")]
    pub next_speaker: Vec<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub updated_plan: String,
    #[serde(default)]
    pub state: u8,
    #[serde(default)]
    pub proposal_id: String,
    #[serde(default)]
    pub team_up_depth: Option<u32>,
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub task_desc: String,
    #[serde(default)]
    pub task_conclusion: String,
    #[serde(default)]
    pub task_abstract: String,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub is_collaborative_planning_enabled: bool,
    #[serde(default)]
    pub max_turns: Option<u32>,
}

impl Message {
    pub fn new(comm_id: &str, sender: &str, content: &str) -> Self {
        Self {
            comm_id: comm_id.to_string(),
            sender: sender.to_string(),
            content: content.to_string(),
            message_type: MessageType::Default,
            next_speaker: Vec::new(),
            goal: None,
            updated_plan: String::new(),
            state: 0,
            proposal_id: String::new(),
            team_up_depth: None,
            task_id: String::new(),
            task_desc: String::new(),
            task_conclusion: String::new(),
            task_abstract: String::new(),
            triggers: Vec::new(),
            is_collaborative_planning_enabled: false,
            max_turns: None,
        }
    }

    /// Text shown under a conversation in the list: `[sender]: content`.
    pub fn preview(&self) -> String {
        format!("[{}]: {}", self.sender, self.content)
    }

    pub fn next_speaker_display(&self) -> String {
        self.next_speaker.join(", ")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

// The server sends `next_speaker` either as a bare name or as a list.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where D: Deserializer<'de>
{
    let speakers = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(name)) if name.is_empty() => Vec::new(),
        Some(OneOrMany::One(name)) => vec![name],
        Some(OneOrMany::Many(names)) => names,
    };
    Ok(speakers)
}

/// A group conversation as listed in the sidebar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_names: Vec<String>,
    pub display_name: String,
    pub latest_message_preview: String,
}

impl Conversation {
    pub fn new(id: &str, participant_names: Vec<String>, team_name: Option<&str>) -> Self {
        let display_name = display_name(&participant_names, team_name);
        Self {
            id: id.to_string(),
            participant_names,
            display_name,
            latest_message_preview: String::new(),
        }
    }

    /// Minimal entry for a conversation only known through one of its messages.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            participant_names: Vec::new(),
            display_name: id.to_string(),
            latest_message_preview: String::new(),
        }
    }
}

/// Team name when set, otherwise the participants joined by `", "`.
pub fn display_name(participant_names: &[String], team_name: Option<&str>) -> String {
    match team_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => participant_names.join(", "),
    }
}

/// One conversation as returned by `/fetch_chat_record`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub agent_names: Vec<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub chat_record: Vec<Message>,
}

/// Full `/fetch_chat_record` response, in the order the server listed it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistorySnapshot {
    pub entries: Vec<(String, HistoryEntry)>,
}

impl HistorySnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, HistoryEntry)> for HistorySnapshot {
    fn from_iter<I: IntoIterator<Item = (String, HistoryEntry)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

struct SnapshotVisitor;

impl<'de> Visitor<'de> for SnapshotVisitor {
    type Value = HistorySnapshot;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of conversation id to chat record")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error> where A: MapAccess<'de> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((comm_id, entry)) = access.next_entry::<String, HistoryEntry>()? {
            entries.push((comm_id, entry));
        }
        Ok(HistorySnapshot { entries })
    }
}

impl<'de> Deserialize<'de> for HistorySnapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        deserializer.deserialize_map(SnapshotVisitor)
    }
}
