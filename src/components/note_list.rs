use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::model::Note;

const PREVIEW_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: String,
    pub title: String,
}

/// Selection and delete confirmation over whatever page is currently shown.
#[derive(Debug, Clone, Default)]
pub struct NoteList {
    selected: usize,
    pending_delete: Option<PendingDelete>,
}

impl NoteList {
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn reset(&mut self) {
        self.selected = 0;
        self.pending_delete = None;
    }

    /// Keeps the selection inside a freshly loaded page.
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    pub fn move_selection(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as isize + delta).clamp(0, len as isize - 1);
        self.selected = next as usize;
    }

    pub fn selected_note<'a>(&self, notes: &'a [Note]) -> Option<&'a Note> {
        notes.get(self.selected)
    }

    pub fn request_delete(&mut self, notes: &[Note]) -> Option<&PendingDelete> {
        let note = self.selected_note(notes)?;
        self.pending_delete = Some(PendingDelete {
            id: note.id.clone(),
            title: note.title.clone(),
        });
        self.pending_delete.as_ref()
    }

    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }

    pub fn confirm_delete(&mut self) -> Option<PendingDelete> {
        self.pending_delete.take()
    }

    pub fn cancel_delete(&mut self) -> bool {
        self.pending_delete.take().is_some()
    }
}

/// First non-empty lines of the note body joined on one line.
pub fn preview(note: &Note, max_lines: usize) -> String {
    let joined = note
        .content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect::<Vec<_>>()
        .join(" ");
    joined.chars().take(PREVIEW_CHARS).collect()
}

/// Renders a server timestamp as `YYYY-MM-DD HH:MM`, or echoes it when it does not parse.
pub fn format_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::from("—");
    };
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|dt| {
            dt.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .ok()
        })
        .unwrap_or_else(|| raw.to_string())
}
