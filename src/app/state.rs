use std::sync::Arc;
use std::time::Instant;

use ratatui::layout::Rect;

use crate::components::{
    FormField, Modal, ModalHit, NoteForm, NoteList, OverlayHost, Pagination, SearchBox,
    SubmitOutcome,
};
use crate::config::AppConfig;
use crate::debounce::Debouncer;
use crate::model::{ListParams, NewNote, Note, NotePage};
use crate::query::{CachePolicy, KeyPrefix, QueryCache, QueryKey, QueryView, Ticket};

/// Side effects the state asks the runtime to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchNotes(Ticket),
    CreateNote { request: u64, note: NewNote },
    DeleteNote { id: String, title: String },
}

/// Completions the runtime feeds back. Errors arrive already rendered for display.
#[derive(Debug, Clone)]
pub enum AppEvent {
    NotesLoaded {
        ticket: Ticket,
        result: Result<NotePage, String>,
    },
    NoteCreated {
        request: u64,
        result: Result<Note, String>,
    },
    NoteDeleted {
        id: String,
        title: String,
        result: Result<Note, String>,
    },
}

/// What the list region shows. Exactly one applies at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus<'a> {
    Loading,
    Failed(&'a str),
    Empty,
    Loaded {
        notes: &'a [Note],
        refreshing: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    List,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Cancel,
    Escape,
    Backdrop,
    Created,
}

#[derive(Debug)]
pub struct ModalState {
    modal: Modal,
    form: NoteForm,
    request: Option<u64>,
}

impl ModalState {
    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn form(&self) -> &NoteForm {
        &self.form
    }
}

pub struct AppState {
    per_page: u32,
    page: u32,
    search: SearchBox,
    debouncer: Debouncer<String>,
    debounced_search: String,
    reset_page_on_change: bool,
    cache: QueryCache,
    list: NoteList,
    modal: Option<ModalState>,
    overlay: Arc<dyn OverlayHost>,
    next_request: u64,
    status_message: Option<String>,
    pub focus: FocusPane,
}

impl AppState {
    pub fn new(config: &AppConfig, overlay: Arc<dyn OverlayHost>) -> Self {
        Self {
            per_page: config.list.per_page.max(1),
            page: 1,
            search: SearchBox::default(),
            debouncer: Debouncer::new(config.search.debounce_duration()),
            debounced_search: String::new(),
            reset_page_on_change: config.search.reset_page_on_change,
            cache: QueryCache::new(CachePolicy::from(&config.cache)),
            list: NoteList::default(),
            modal: None,
            overlay,
            next_request: 1,
            status_message: None,
            focus: FocusPane::List,
        }
    }

    /// Issues the first list request.
    pub fn start(&mut self, now: Instant) -> Vec<Command> {
        self.sync_query(now)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn search(&self) -> &SearchBox {
        &self.search
    }

    pub fn debounced_search(&self) -> &str {
        &self.debounced_search
    }

    pub fn list(&self) -> &NoteList {
        &self.list
    }

    pub fn modal(&self) -> Option<&ModalState> {
        self.modal.as_ref()
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal.is_some()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn current_key(&self) -> QueryKey {
        QueryKey::notes(&ListParams::new(
            self.page,
            self.per_page,
            self.debounced_search.clone(),
        ))
    }

    pub fn list_status(&self) -> ListStatus<'_> {
        match self.cache.view(&self.current_key()) {
            QueryView::Loading => ListStatus::Loading,
            QueryView::Failed(message) => ListStatus::Failed(message),
            QueryView::Ready { page, .. } if page.is_empty() => ListStatus::Empty,
            QueryView::Ready { page, refreshing } => ListStatus::Loaded {
                notes: &page.notes,
                refreshing,
            },
        }
    }

    pub fn visible_notes(&self) -> &[Note] {
        match self.list_status() {
            ListStatus::Loaded { notes, .. } => notes,
            _ => &[],
        }
    }

    /// Page controls for the current result. Hidden unless a result with more than one page is shown.
    pub fn pagination(&self) -> Pagination {
        let total = match self.cache.view(&self.current_key()) {
            QueryView::Ready { page, .. } => page.total_pages,
            _ => 0,
        };
        Pagination::new(total, self.page)
    }

    fn sync_query(&mut self, now: Instant) -> Vec<Command> {
        let key = self.current_key();
        self.cache
            .ensure(&key, now)
            .map(Command::FetchNotes)
            .into_iter()
            .collect()
    }

    // search

    pub fn focus_search(&mut self) {
        self.focus = FocusPane::Search;
        self.search.focus();
    }

    pub fn blur_search(&mut self) {
        self.focus = FocusPane::List;
        self.search.blur();
    }

    pub fn search_insert(&mut self, ch: char, now: Instant) {
        let change = self.search.insert_char(ch);
        self.on_search_input(change, now);
    }

    pub fn search_backspace(&mut self, now: Instant) {
        let change = self.search.backspace();
        self.on_search_input(change, now);
    }

    pub fn search_delete(&mut self, now: Instant) {
        let change = self.search.delete();
        self.on_search_input(change, now);
    }

    pub fn search_clear(&mut self, now: Instant) {
        let change = self.search.clear();
        self.on_search_input(change, now);
    }

    pub fn search_move(&mut self, delta: isize) {
        if delta < 0 {
            self.search.move_left();
        } else {
            self.search.move_right();
        }
    }

    pub fn search_home(&mut self) {
        self.search.move_home();
    }

    pub fn search_end(&mut self) {
        self.search.move_end();
    }

    fn on_search_input(&mut self, change: Option<String>, now: Instant) {
        if let Some(value) = change {
            self.debouncer.push(value, now);
        }
    }

    /// Applies the pending search immediately instead of waiting out the debounce.
    pub fn commit_search(&mut self, now: Instant) -> Vec<Command> {
        match self.debouncer.flush() {
            Some(value) => self.apply_debounced_search(value, now),
            None => Vec::new(),
        }
    }

    /// Advances timers. Called on every event-loop tick.
    pub fn tick(&mut self, now: Instant) -> Vec<Command> {
        match self.debouncer.poll(now) {
            Some(value) => self.apply_debounced_search(value, now),
            None => Vec::new(),
        }
    }

    fn apply_debounced_search(&mut self, value: String, now: Instant) -> Vec<Command> {
        if value == self.debounced_search {
            return Vec::new();
        }
        tracing::debug!(search = %value, "search settled");
        self.debounced_search = value;
        if self.reset_page_on_change {
            self.page = 1;
        }
        self.list.reset();
        self.sync_query(now)
    }

    // pagination

    pub fn set_page(&mut self, page: u32, now: Instant) -> Vec<Command> {
        let page = page.max(1);
        if page == self.page {
            return Vec::new();
        }
        self.page = page;
        self.list.reset();
        self.sync_query(now)
    }

    /// Handles a 0-indexed selection from the page controls.
    pub fn select_page_index(&mut self, index: usize, now: Instant) -> Vec<Command> {
        match self.pagination().select(index) {
            Some(page) => self.set_page(page, now),
            None => Vec::new(),
        }
    }

    pub fn next_page(&mut self, now: Instant) -> Vec<Command> {
        match self.pagination().next() {
            Some(page) => self.set_page(page, now),
            None => Vec::new(),
        }
    }

    pub fn previous_page(&mut self, now: Instant) -> Vec<Command> {
        match self.pagination().previous() {
            Some(page) => self.set_page(page, now),
            None => Vec::new(),
        }
    }

    pub fn refresh(&mut self, now: Instant) -> Vec<Command> {
        self.cache.invalidate(&KeyPrefix::Exact(self.current_key()));
        self.sync_query(now)
    }

    // list

    pub fn move_selection(&mut self, delta: isize) {
        if self.overlay.scroll_locked() {
            return;
        }
        let len = self.visible_notes().len();
        self.list.move_selection(delta, len);
    }

    pub fn request_delete(&mut self) {
        let notes = self.visible_notes().to_vec();
        let title = self
            .list
            .request_delete(&notes)
            .map(|pending| pending.title.clone());
        match title {
            Some(title) => self.set_status_message(Some(format!(
                "Delete \"{title}\"? y to confirm, any other key cancels"
            ))),
            None => self.set_status_message(Some("No note selected")),
        }
    }

    pub fn has_pending_delete(&self) -> bool {
        self.list.pending_delete().is_some()
    }

    pub fn confirm_delete(&mut self) -> Vec<Command> {
        match self.list.confirm_delete() {
            Some(pending) => {
                self.set_status_message(Some(format!("Deleting \"{}\"…", pending.title)));
                vec![Command::DeleteNote {
                    id: pending.id,
                    title: pending.title,
                }]
            }
            None => Vec::new(),
        }
    }

    pub fn cancel_delete(&mut self) {
        if self.list.cancel_delete() {
            self.set_status_message(Some("Delete canceled"));
        }
    }

    // modal

    /// Opens the create form. Refuses when the host has nowhere to draw it.
    pub fn open_modal(&mut self, frame: Rect) -> bool {
        if self.modal.is_some() {
            return true;
        }
        if self.overlay.attachment(frame).is_none() {
            tracing::debug!(?frame, "create form has no area to draw in");
            self.set_status_message(Some("Terminal too small for the create form"));
            return false;
        }
        self.blur_search();
        self.modal = Some(ModalState {
            modal: Modal::mount(self.overlay.clone()),
            form: NoteForm::new(),
            request: None,
        });
        true
    }

    pub fn close_modal(&mut self, reason: CloseReason) {
        if let Some(mut state) = self.modal.take() {
            state.modal.unmount();
            tracing::debug!(?reason, "create form closed");
        }
    }

    /// Escape closes the modal only when it holds the escape listener.
    pub fn escape(&mut self) -> bool {
        let owns = self
            .modal
            .as_ref()
            .map(|state| state.modal.owns_escape())
            .unwrap_or(false);
        if owns {
            self.close_modal(CloseReason::Escape);
        }
        owns
    }

    /// Routes a click while the modal is open. Returns whether the modal consumed it.
    pub fn modal_click(&mut self, frame: Rect, column: u16, row: u16) -> bool {
        let Some(state) = self.modal.as_ref() else {
            return false;
        };
        match state.modal.hit(frame, column, row) {
            Some(ModalHit::Backdrop) => {
                self.close_modal(CloseReason::Backdrop);
                true
            }
            Some(ModalHit::Content) => true,
            None => false,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut NoteForm> {
        self.modal.as_mut().map(|state| &mut state.form)
    }

    /// Enter inside the form: newline in content, cancel on the Cancel button, submit elsewhere.
    pub fn form_enter(&mut self) -> Vec<Command> {
        let Some(focus) = self.modal.as_ref().map(|state| state.form.focus()) else {
            return Vec::new();
        };
        match focus {
            FormField::Content => {
                if let Some(form) = self.form_mut() {
                    form.insert_newline();
                }
                Vec::new()
            }
            FormField::Cancel => {
                self.close_modal(CloseReason::Cancel);
                Vec::new()
            }
            _ => self.submit_form(),
        }
    }

    pub fn submit_form(&mut self) -> Vec<Command> {
        let request = self.next_request;
        let Some(state) = self.modal.as_mut() else {
            return Vec::new();
        };
        match state.form.submit() {
            SubmitOutcome::Accepted(note) => {
                self.next_request += 1;
                state.request = Some(request);
                vec![Command::CreateNote { request, note }]
            }
            SubmitOutcome::Rejected(errors) => {
                tracing::debug!(%errors, "create form rejected locally");
                Vec::new()
            }
            SubmitOutcome::Busy => Vec::new(),
        }
    }

    // completions

    pub fn apply(&mut self, event: AppEvent, now: Instant) -> Vec<Command> {
        match event {
            AppEvent::NotesLoaded { ticket, result } => {
                if let Err(message) = &result {
                    tracing::warn!(key = ?ticket.key, %message, "note list fetch failed");
                }
                let reported_pages = result.as_ref().ok().map(|page| page.total_pages);
                let current = ticket.key == self.current_key();
                if !self.cache.complete(&ticket, result, now) || !current {
                    return Vec::new();
                }
                // the last page can vanish under us, e.g. after deleting its only note
                if let Some(total) = reported_pages.filter(|total| *total > 0) {
                    if self.page > total {
                        tracing::debug!(page = self.page, total, "page out of range, stepping back");
                        return self.set_page(total, now);
                    }
                }
                let len = self.visible_notes().len();
                self.list.clamp(len);
                Vec::new()
            }
            AppEvent::NoteCreated { request, result } => {
                let from_open_form = self
                    .modal
                    .as_ref()
                    .map(|state| state.request == Some(request))
                    .unwrap_or(false);
                match result {
                    Ok(note) => {
                        tracing::info!(id = %note.id, "note created");
                        self.cache.invalidate(&KeyPrefix::notes());
                        if from_open_form {
                            self.close_modal(CloseReason::Created);
                        }
                        self.set_status_message(Some("Note created"));
                        self.sync_query(now)
                    }
                    Err(message) => {
                        tracing::warn!(%message, "note creation failed");
                        if from_open_form {
                            if let Some(form) = self.form_mut() {
                                form.submit_failed(message);
                            }
                        } else {
                            self.set_status_message(Some(format!("Create failed: {message}")));
                        }
                        Vec::new()
                    }
                }
            }
            AppEvent::NoteDeleted { id, title, result } => match result {
                Ok(_) => {
                    tracing::info!(%id, "note deleted");
                    self.cache.invalidate(&KeyPrefix::notes());
                    self.set_status_message(Some(format!("Deleted \"{title}\"")));
                    self.sync_query(now)
                }
                Err(message) => {
                    tracing::warn!(%id, %message, "note deletion failed");
                    self.set_status_message(Some(format!("Delete failed: {message}")));
                    Vec::new()
                }
            },
        }
    }

    /// Cancels the debounce timer and unmounts any open modal.
    pub fn shutdown(&mut self) {
        if self.debouncer.cancel() {
            tracing::debug!("dropped pending search on shutdown");
        }
        self.close_modal(CloseReason::Cancel);
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.shutdown();
    }
}
