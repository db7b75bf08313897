use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Notes are always requested twelve to a page unless the config says otherwise.
pub const DEFAULT_PER_PAGE: u32 = 12;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum NoteTag {
    #[default]
    Todo,
    Work,
    Personal,
    Meeting,
    Shopping,
}

impl NoteTag {
    pub fn all() -> Vec<NoteTag> {
        NoteTag::iter().collect()
    }

    /// Cycles through the closed tag set, wrapping at either end.
    pub fn step(self, delta: isize) -> NoteTag {
        let tags = Self::all();
        let len = tags.len() as isize;
        let idx = tags.iter().position(|tag| *tag == self).unwrap_or(0) as isize;
        let next = (idx + delta).rem_euclid(len);
        tags[next as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub tag: NoteTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePage {
    pub notes: Vec<Note>,
    pub total_pages: u32,
}

impl NotePage {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub tag: NoteTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListParams {
    pub page: u32,
    pub per_page: u32,
    pub search: String,
}

impl ListParams {
    pub fn new(page: u32, per_page: u32, search: impl Into<String>) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            search: search.into(),
        }
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn decodes_note_with_unknown_fields() {
        let raw = r#"{
            "id": "65ca67e7ae7f10c88b598384",
            "title": "Groceries",
            "content": "milk, eggs",
            "tag": "Shopping",
            "createdAt": "2024-02-12T18:46:31.597Z",
            "updatedAt": "2024-02-12T18:46:31.597Z",
            "owner": "someone"
        }"#;
        let note: Note = serde_json::from_str(raw).expect("note decodes");
        assert_eq!(note.tag, NoteTag::Shopping);
        assert_eq!(note.created_at.as_deref(), Some("2024-02-12T18:46:31.597Z"));
    }

    #[test]
    fn rejects_tag_outside_closed_set() {
        let raw = r#"{"id":"1","title":"x","content":"","tag":"Errands"}"#;
        assert!(serde_json::from_str::<Note>(raw).is_err());
        assert!(NoteTag::from_str("Errands").is_err());
    }

    #[test]
    fn tag_step_wraps_both_ways() {
        assert_eq!(NoteTag::Todo.step(-1), NoteTag::Shopping);
        assert_eq!(NoteTag::Shopping.step(1), NoteTag::Todo);
        assert_eq!(NoteTag::Work.step(2), NoteTag::Meeting);
    }

    #[test]
    fn list_params_clamp_page_to_one() {
        let params = ListParams::new(0, 12, "meeting");
        assert_eq!(params.page, 1);
    }
}
