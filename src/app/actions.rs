use std::sync::Arc;

use crossbeam_channel::Sender;
use tokio::runtime::Handle;

use super::state::{AppEvent, Command};
use crate::service::NoteApi;

/// Runs state commands against the API on the async runtime and reports back over a channel.
pub struct ActionDispatcher {
    api: Arc<dyn NoteApi>,
    handle: Handle,
    events: Sender<AppEvent>,
}

impl ActionDispatcher {
    pub fn new(api: Arc<dyn NoteApi>, handle: Handle, events: Sender<AppEvent>) -> Self {
        Self {
            api,
            handle,
            events,
        }
    }

    pub fn dispatch_all(&self, commands: Vec<Command>) {
        for command in commands {
            self.dispatch(command);
        }
    }

    pub fn dispatch(&self, command: Command) {
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        match command {
            Command::FetchNotes(ticket) => {
                let params = ticket.key.params();
                tracing::debug!(?params, generation = ticket.generation, "fetching notes");
                self.handle.spawn(async move {
                    let result = api
                        .list(&params)
                        .await
                        .map_err(|err| err.user_message());
                    deliver(&events, AppEvent::NotesLoaded { ticket, result });
                });
            }
            Command::CreateNote { request, note } => {
                tracing::debug!(request, title = %note.title, "creating note");
                self.handle.spawn(async move {
                    let result = api.create(&note).await.map_err(|err| err.user_message());
                    deliver(&events, AppEvent::NoteCreated { request, result });
                });
            }
            Command::DeleteNote { id, title } => {
                tracing::debug!(%id, "deleting note");
                self.handle.spawn(async move {
                    let result = api.delete(&id).await.map_err(|err| err.user_message());
                    deliver(&events, AppEvent::NoteDeleted { id, title, result });
                });
            }
        }
    }
}

fn deliver(events: &Sender<AppEvent>, event: AppEvent) {
    // only fails once the event loop has gone away
    if events.send(event).is_err() {
        tracing::debug!("dropping completion after shutdown");
    }
}
