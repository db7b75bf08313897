pub mod modal;
pub mod note_form;
pub mod note_list;
pub mod pagination;
pub mod search_box;
mod text_input;

pub use modal::{Modal, ModalHit, OverlayHost, TerminalOverlay};
pub use note_form::{FormField, NoteForm, SubmitOutcome, ValidationErrors};
pub use note_list::NoteList;
pub use pagination::{PageControl, Pagination};
pub use search_box::SearchBox;
pub use text_input::TextInput;
