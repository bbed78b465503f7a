use crate::config::ViewerConfig;
use crate::models::chat::Message;
use crate::models::websocket::ChannelState;
use crate::render::{ MessagePane, Renderer };
use crate::store::{ ConversationStore, StoreChange, StoreUpdate };
use crate::viewport::ScrollPolicy;
use log::{ debug, info };
use tokio::sync::{ mpsc, watch };

pub const NO_SELECTION_TITLE: &str = "Select a group";

/// Single consumer of the update queue: owns the store, the open conversation
/// and the scroll decision, and tells the renderer what to draw.
pub struct ChatView {
    store: ConversationStore,
    selection: Option<String>,
    scroll: ScrollPolicy,
    channel_state: ChannelState,
}

impl ChatView {
    pub fn new(store: ConversationStore, scroll: ScrollPolicy) -> Self {
        Self {
            store,
            selection: None,
            scroll,
            channel_state: ChannelState::Disconnected,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(
            ConversationStore::new().with_bump_on_message(config.bump_on_message),
            ScrollPolicy::new(config.scroll_threshold)
        )
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel_state
    }

    pub fn title(&self) -> &str {
        match &self.selection {
            None => NO_SELECTION_TITLE,
            Some(id) =>
                self.store
                    .conversation(id)
                    .map(|c| c.display_name.as_str())
                    .unwrap_or(id.as_str()),
        }
    }

    pub fn selected_messages(&self) -> &[Message] {
        match &self.selection {
            Some(id) => self.store.messages(id),
            None => &[],
        }
    }

    pub fn select<R: Renderer + ?Sized>(&mut self, comm_id: &str, renderer: &mut R) {
        self.scroll.before_update(renderer.viewport());
        self.selection = Some(comm_id.to_string());
        renderer.render_conversations(self.store.conversations(), self.selection());
        self.render_selected(renderer);
    }

    /// Applies one queued update and redraws what it touched.
    pub fn apply<R: Renderer + ?Sized>(&mut self, update: StoreUpdate, renderer: &mut R) {
        // Sampled before the log grows, decided after.
        self.scroll.before_update(renderer.viewport());

        let change = match update {
            StoreUpdate::History(snapshot) => self.store.apply_history_snapshot(snapshot),
            StoreUpdate::Live(event) => self.store.apply_live_event(event),
            StoreUpdate::Channel(state) => {
                self.channel_state = state;
                renderer.render_channel_state(state);
                StoreChange::default()
            }
        };

        if change.list_changed {
            renderer.render_conversations(self.store.conversations(), self.selection());
        }
        let selected_touched = self.selection
            .as_deref()
            .map(|id| change.touches(id))
            .unwrap_or(false);
        if selected_touched {
            self.render_selected(renderer);
        } else {
            self.scroll.after_update();
        }
    }

    /// Drains the queue in order until it closes or `shutdown` fires.
    pub async fn run<R: Renderer + ?Sized>(
        &mut self,
        mut updates: mpsc::UnboundedReceiver<StoreUpdate>,
        renderer: &mut R,
        mut shutdown: watch::Receiver<bool>
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("Shutdown requested; closing view");
                    break;
                }
                update = updates.recv() => match update {
                    Some(update) => self.apply(update, renderer),
                    None => {
                        debug!("All update producers finished");
                        break;
                    }
                },
            }
        }
    }

    fn render_selected<R: Renderer + ?Sized>(&mut self, renderer: &mut R) {
        let scroll_to_bottom = self.scroll.after_update();
        let Some(comm_id) = self.selection.as_deref() else {
            return;
        };
        let messages = self.store.messages(comm_id);
        let pane = MessagePane {
            comm_id,
            title: self.title(),
            goal: messages.first().and_then(|m| m.goal.as_deref()),
            messages,
        };
        renderer.render_messages(pane, scroll_to_bottom);
    }
}
