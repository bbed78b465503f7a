use crate::models::chat::{ Conversation, HistorySnapshot, Message };
use crate::models::websocket::{ ChannelState, LiveEvent };
use log::debug;
use std::collections::{ HashMap, HashSet };

/// A single mutation queued for the store. History and the live channel both
/// produce these into one FIFO queue, so the store only ever sees them in order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreUpdate {
    History(HistorySnapshot),
    Live(LiveEvent),
    Channel(ChannelState),
}

/// What an applied update touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreChange {
    pub list_changed: bool,
    pub logs_changed: Vec<String>,
}

impl StoreChange {
    pub fn touches(&self, comm_id: &str) -> bool {
        self.logs_changed.iter().any(|id| id == comm_id)
    }

    pub fn is_empty(&self) -> bool {
        !self.list_changed && self.logs_changed.is_empty()
    }
}

/// Conversations, most recently created first, and their message logs.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    logs: HashMap<String, Vec<Message>>,
    // Length of the history prefix of each log; everything after it arrived live.
    history_len: HashMap<String, usize>,
    bump_on_message: bool,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a conversation to the front whenever it receives a message,
    /// instead of only when it is created.
    pub fn with_bump_on_message(mut self, bump: bool) -> Self {
        self.bump_on_message = bump;
        self
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, comm_id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == comm_id)
    }

    pub fn messages(&self, comm_id: &str) -> &[Message] {
        self.logs
            .get(comm_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replaces the history-derived state with `snapshot`.
    ///
    /// Messages that arrived live and are not part of the snapshot are kept after
    /// the historical ones, and conversations the snapshot does not mention stay
    /// in front of it. Applying the same snapshot twice gives the same state.
    pub fn apply_history_snapshot(&mut self, snapshot: HistorySnapshot) -> StoreChange {
        let snapshot_ids: HashSet<&str> = snapshot.entries
            .iter()
            .map(|(id, _)| id.as_str())
            .collect();

        let mut retained: Vec<Conversation> = self.conversations
            .iter()
            .filter(|c| !snapshot_ids.contains(c.id.as_str()))
            .cloned()
            .collect();

        let mut from_history = Vec::with_capacity(snapshot.entries.len());
        let mut logs_changed = Vec::with_capacity(snapshot.entries.len());

        for (comm_id, entry) in snapshot.entries {
            let live_start = self.history_len.get(&comm_id).copied().unwrap_or(0);
            let live = match self.logs.remove(&comm_id) {
                Some(mut log) => log.split_off(live_start.min(log.len())),
                None => Vec::new(),
            };
            let history_len = entry.chat_record.len();
            let log = merge_live(entry.chat_record, &live);

            let mut conversation = Conversation::new(
                &comm_id,
                entry.agent_names,
                entry.team_name.as_deref()
            );
            conversation.latest_message_preview = log
                .last()
                .map(Message::preview)
                .unwrap_or_default();

            self.logs.insert(comm_id.clone(), log);
            self.history_len.insert(comm_id.clone(), history_len);
            logs_changed.push(comm_id);
            from_history.push(conversation);
        }

        // Each history entry is prepended in turn, so the last one listed ends up on top.
        from_history.reverse();
        retained.extend(from_history);
        self.conversations = retained;

        StoreChange { list_changed: true, logs_changed }
    }

    pub fn apply_live_event(&mut self, event: LiveEvent) -> StoreChange {
        match event {
            LiveEvent::TeamUp { comm_id, agent_names, team_name } => {
                self.team_up(&comm_id, agent_names, team_name.as_deref());
                StoreChange { list_changed: true, logs_changed: Vec::new() }
            }
            LiveEvent::Message(message) => {
                let comm_id = message.comm_id.clone();
                self.append_message(message);
                StoreChange { list_changed: true, logs_changed: vec![comm_id] }
            }
            LiveEvent::Unrecognized => StoreChange::default(),
        }
    }

    fn team_up(&mut self, comm_id: &str, agent_names: Vec<String>, team_name: Option<&str>) {
        let mut conversation = Conversation::new(comm_id, agent_names, team_name);
        if let Some(pos) = self.position(comm_id) {
            let existing = self.conversations.remove(pos);
            conversation.latest_message_preview = existing.latest_message_preview;
            debug!("Team-up for known conversation {}; refreshing it", comm_id);
        }
        self.conversations.insert(0, conversation);
    }

    fn append_message(&mut self, message: Message) {
        let comm_id = message.comm_id.clone();
        let preview = message.preview();

        let pos = match self.position(&comm_id) {
            Some(pos) => pos,
            None => {
                debug!("Message for unknown conversation {}; adding placeholder", comm_id);
                self.conversations.insert(0, Conversation::placeholder(&comm_id));
                0
            }
        };
        self.conversations[pos].latest_message_preview = preview;
        if self.bump_on_message && pos != 0 {
            let conversation = self.conversations.remove(pos);
            self.conversations.insert(0, conversation);
        }

        self.logs.entry(comm_id).or_default().push(message);
    }

    fn position(&self, comm_id: &str) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == comm_id)
    }
}

/// Appends to `history` the live messages it does not already contain.
///
/// The longest prefix of `live` found as a contiguous run inside `history` is
/// treated as already delivered by the snapshot.
fn merge_live(mut history: Vec<Message>, live: &[Message]) -> Vec<Message> {
    let covered = (1..=live.len())
        .rev()
        .find(|&k| history.windows(k).any(|window| window == &live[..k]))
        .unwrap_or(0);
    history.extend_from_slice(&live[covered..]);
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::HistoryEntry;

    fn msg(comm_id: &str, sender: &str, content: &str) -> Message {
        Message::new(comm_id, sender, content)
    }

    fn live(message: Message) -> LiveEvent {
        LiveEvent::Message(message)
    }

    fn team_up(comm_id: &str, names: &[&str], team_name: Option<&str>) -> LiveEvent {
        LiveEvent::TeamUp {
            comm_id: comm_id.to_string(),
            agent_names: names
                .iter()
                .map(|n| n.to_string())
                .collect(),
            team_name: team_name.map(str::to_string),
        }
    }

    fn entry(names: &[&str], team_name: Option<&str>, record: Vec<Message>) -> HistoryEntry {
        HistoryEntry {
            agent_names: names
                .iter()
                .map(|n| n.to_string())
                .collect(),
            team_name: team_name.map(str::to_string),
            chat_record: record,
        }
    }

    fn ids(store: &ConversationStore) -> Vec<&str> {
        store
            .conversations()
            .iter()
            .map(|c| c.id.as_str())
            .collect()
    }

    #[test]
    fn live_messages_keep_arrival_order() {
        let mut store = ConversationStore::new();
        store.apply_live_event(team_up("1", &["A", "B"], None));
        for i in 0..20 {
            store.apply_live_event(live(msg("1", "A", &format!("m{}", i))));
        }
        let contents: Vec<&str> = store
            .messages("1")
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        let expected: Vec<String> = (0..20).map(|i| format!("m{}", i)).collect();
        assert_eq!(contents, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn history_then_live_appends() {
        let mut store = ConversationStore::new();
        let snapshot: HistorySnapshot = vec![(
            "c".to_string(),
            entry(&["A"], None, vec![msg("c", "A", "h1"), msg("c", "A", "h2")]),
        )]
            .into_iter()
            .collect();
        store.apply_history_snapshot(snapshot);
        for i in 0..3 {
            store.apply_live_event(live(msg("c", "B", &format!("l{}", i))));
        }
        assert_eq!(store.messages("c").len(), 5);
        assert_eq!(store.conversation("c").unwrap().latest_message_preview, "[B]: l2");
    }

    #[test]
    fn reapplying_history_is_idempotent() {
        let snapshot: HistorySnapshot = vec![
            ("a".to_string(), entry(&["A"], Some("Alpha"), vec![msg("a", "A", "x")])),
            ("b".to_string(), entry(&["B"], None, vec![msg("b", "B", "y")]))
        ]
            .into_iter()
            .collect();

        let mut store = ConversationStore::new();
        store.apply_history_snapshot(snapshot.clone());
        store.apply_live_event(live(msg("b", "B", "z")));
        let before_a = store.messages("a").to_vec();
        let before_b = store.messages("b").to_vec();
        let before_list = store.conversations().to_vec();

        store.apply_history_snapshot(snapshot.clone());
        assert_eq!(store.messages("a"), before_a.as_slice());
        assert_eq!(store.messages("b"), before_b.as_slice());
        assert_eq!(store.conversations(), before_list.as_slice());

        store.apply_live_event(live(msg("b", "B", "w")));
        store.apply_live_event(live(msg("a", "A", "v")));
        store.apply_history_snapshot(snapshot.clone());
        store.apply_history_snapshot(snapshot);
        let contents = |id: &str| -> Vec<String> {
            store
                .messages(id)
                .iter()
                .map(|m| m.content.clone())
                .collect()
        };
        assert_eq!(contents("a"), vec!["x", "v"]);
        assert_eq!(contents("b"), vec!["y", "z", "w"]);
        assert_eq!(ids(&store), vec!["b", "a"]);
    }

    #[test]
    fn live_events_before_history_survive() {
        let mut store = ConversationStore::new();
        store.apply_live_event(team_up("new", &["N"], None));
        store.apply_live_event(live(msg("new", "N", "fresh")));
        store.apply_live_event(live(msg("old", "O", "late")));

        let snapshot: HistorySnapshot = vec![(
            "old".to_string(),
            entry(&["O", "P"], None, vec![msg("old", "O", "earlier")]),
        )]
            .into_iter()
            .collect();
        store.apply_history_snapshot(snapshot);

        assert_eq!(ids(&store), vec!["new", "old"]);
        assert_eq!(store.messages("new").len(), 1);
        let old: Vec<&str> = store
            .messages("old")
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(old, vec!["earlier", "late"]);

        let old_conv = store.conversation("old").unwrap();
        assert_eq!(old_conv.display_name, "O, P");
        assert_eq!(old_conv.latest_message_preview, "[O]: late");
    }

    #[test]
    fn history_already_holding_live_messages_is_not_duplicated() {
        let mut store = ConversationStore::new();
        store.apply_live_event(live(msg("c", "A", "one")));
        store.apply_live_event(live(msg("c", "B", "two")));

        let snapshot: HistorySnapshot = vec![(
            "c".to_string(),
            entry(&["A", "B"], None, vec![msg("c", "S", "intro"), msg("c", "A", "one")]),
        )]
            .into_iter()
            .collect();
        store.apply_history_snapshot(snapshot);

        let contents: Vec<&str> = store
            .messages("c")
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["intro", "one", "two"]);
    }

    #[test]
    fn history_list_is_reverse_of_response_order() {
        let mut store = ConversationStore::new();
        let snapshot: HistorySnapshot = vec![
            ("1".to_string(), entry(&["A"], None, vec![])),
            ("2".to_string(), entry(&["B"], None, vec![])),
            ("3".to_string(), entry(&["C"], None, vec![]))
        ]
            .into_iter()
            .collect();
        let change = store.apply_history_snapshot(snapshot);
        assert_eq!(ids(&store), vec!["3", "2", "1"]);
        assert!(change.list_changed);
        assert_eq!(change.logs_changed.len(), 3);
        assert_eq!(store.conversation("1").unwrap().latest_message_preview, "");
    }

    #[test]
    fn message_for_unknown_conversation_creates_placeholder() {
        let mut store = ConversationStore::new();
        store.apply_live_event(team_up("1", &["A"], None));
        let change = store.apply_live_event(live(msg("ghost", "G", "boo")));
        assert!(change.touches("ghost"));
        assert_eq!(ids(&store), vec!["ghost", "1"]);
        let ghost = store.conversation("ghost").unwrap();
        assert_eq!(ghost.display_name, "ghost");
        assert!(ghost.participant_names.is_empty());
        assert_eq!(store.messages("ghost").len(), 1);
    }

    #[test]
    fn messages_do_not_reorder_by_default() {
        let mut store = ConversationStore::new();
        store.apply_live_event(team_up("1", &["A"], None));
        store.apply_live_event(team_up("2", &["B"], None));
        store.apply_live_event(live(msg("1", "A", "hi")));
        assert_eq!(ids(&store), vec!["2", "1"]);
    }

    #[test]
    fn bump_on_message_moves_conversation_to_front() {
        let mut store = ConversationStore::new().with_bump_on_message(true);
        store.apply_live_event(team_up("1", &["A"], None));
        store.apply_live_event(team_up("2", &["B"], None));
        store.apply_live_event(live(msg("1", "A", "hi")));
        assert_eq!(ids(&store), vec!["1", "2"]);
    }

    #[test]
    fn repeated_team_up_keeps_ids_unique() {
        let mut store = ConversationStore::new();
        store.apply_live_event(team_up("1", &["A"], None));
        store.apply_live_event(live(msg("1", "A", "hi")));
        store.apply_live_event(team_up("2", &["B"], None));
        store.apply_live_event(team_up("1", &["A", "C"], Some("Crew")));

        assert_eq!(ids(&store), vec!["1", "2"]);
        let first = store.conversation("1").unwrap();
        assert_eq!(first.display_name, "Crew");
        assert_eq!(first.latest_message_preview, "[A]: hi");
        assert_eq!(store.messages("1").len(), 1);
    }

    #[test]
    fn unrecognized_event_changes_nothing() {
        let mut store = ConversationStore::new();
        assert!(store.apply_live_event(LiveEvent::Unrecognized).is_empty());
        assert!(store.conversations().is_empty());
        assert!(store.messages("anything").is_empty());
    }
}
