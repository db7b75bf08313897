use std::fmt;
use std::str::FromStr;

use super::TextInput;
use crate::model::{NewNote, NoteTag};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 50;
pub const CONTENT_MAX_CHARS: usize = 500;

const MSG_REQUIRED: &str = "Required";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Content,
    Tag,
    Cancel,
    Submit,
}

impl FormField {
    const ORDER: [FormField; 5] = [
        FormField::Title,
        FormField::Content,
        FormField::Tag,
        FormField::Cancel,
        FormField::Submit,
    ];

    fn step(self, delta: isize) -> FormField {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0) as isize;
        let len = Self::ORDER.len() as isize;
        Self::ORDER[(idx + delta).rem_euclid(len) as usize]
    }
}

/// Per-field messages; `None` means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tag: Option<String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tag.is_none()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("title", &self.title),
            ("content", &self.content),
            ("tag", &self.tag),
        ]
        .into_iter()
        .filter_map(|(name, msg)| msg.as_ref().map(|m| format!("{name}: {m}")))
        .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub fn validate_title(title: &str) -> Option<String> {
    let len = title.chars().count();
    if len == 0 {
        Some(MSG_REQUIRED.to_string())
    } else if len < TITLE_MIN_CHARS {
        Some(format!("Minimum {TITLE_MIN_CHARS} characters"))
    } else if len > TITLE_MAX_CHARS {
        Some(format!("Maximum {TITLE_MAX_CHARS} characters"))
    } else {
        None
    }
}

pub fn validate_content(content: &str) -> Option<String> {
    if content.chars().count() > CONTENT_MAX_CHARS {
        Some(format!("Maximum {CONTENT_MAX_CHARS} characters"))
    } else {
        None
    }
}

pub fn parse_tag(raw: &str) -> Result<NoteTag, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MSG_REQUIRED.to_string());
    }
    NoteTag::from_str(raw).map_err(|_| {
        let allowed: Vec<String> = NoteTag::all().iter().map(ToString::to_string).collect();
        format!("Must be one of: {}", allowed.join(", "))
    })
}

/// Checks a draft the same way the form does; the server still has the final word.
pub fn validate_note(title: &str, content: &str, tag: &str) -> Result<NewNote, ValidationErrors> {
    let parsed_tag = parse_tag(tag);
    let errors = ValidationErrors {
        title: validate_title(title),
        content: validate_content(content),
        tag: parsed_tag.as_ref().err().cloned(),
    };
    match parsed_tag {
        Ok(tag) if errors.is_empty() => Ok(NewNote {
            title: title.to_string(),
            content: content.to_string(),
            tag,
        }),
        _ => Err(errors),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Touched {
    title: bool,
    content: bool,
    tag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(NewNote),
    Rejected(ValidationErrors),
    /// A create is already in flight.
    Busy,
}

#[derive(Debug, Clone)]
pub struct NoteForm {
    title: TextInput,
    content: TextInput,
    tag: NoteTag,
    focus: FormField,
    touched: Touched,
    submitting: bool,
    submit_error: Option<String>,
}

impl Default for NoteForm {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteForm {
    pub fn new() -> Self {
        Self {
            title: TextInput::default(),
            content: TextInput::default(),
            tag: NoteTag::Todo,
            focus: FormField::Title,
            touched: Touched::default(),
            submitting: false,
            submit_error: None,
        }
    }

    pub fn title(&self) -> &TextInput {
        &self.title
    }

    pub fn content(&self) -> &TextInput {
        &self.content
    }

    pub fn tag(&self) -> NoteTag {
        self.tag
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn focus_next(&mut self) {
        self.move_focus(1);
    }

    pub fn focus_previous(&mut self) {
        self.move_focus(-1);
    }

    pub fn set_focus(&mut self, field: FormField) {
        self.blur(self.focus);
        self.focus = field;
    }

    fn move_focus(&mut self, delta: isize) {
        self.set_focus(self.focus.step(delta));
    }

    fn blur(&mut self, field: FormField) {
        match field {
            FormField::Title => self.touched.title = true,
            FormField::Content => self.touched.content = true,
            FormField::Tag => self.touched.tag = true,
            FormField::Cancel | FormField::Submit => {}
        }
    }

    fn active_input(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            FormField::Title => Some(&mut self.title),
            FormField::Content => Some(&mut self.content),
            _ => None,
        }
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        self.active_input()
            .map(|input| input.insert_char(ch))
            .unwrap_or(false)
    }

    /// Only the content field is multi-line.
    pub fn insert_newline(&mut self) -> bool {
        if self.focus != FormField::Content {
            return false;
        }
        self.content.insert_char('\n')
    }

    pub fn backspace(&mut self) -> bool {
        self.active_input()
            .map(TextInput::backspace)
            .unwrap_or(false)
    }

    pub fn delete(&mut self) -> bool {
        self.active_input().map(TextInput::delete).unwrap_or(false)
    }

    pub fn move_left(&mut self) -> bool {
        if self.focus == FormField::Tag {
            self.tag = self.tag.step(-1);
            return true;
        }
        self.active_input()
            .map(TextInput::move_left)
            .unwrap_or(false)
    }

    pub fn move_right(&mut self) -> bool {
        if self.focus == FormField::Tag {
            self.tag = self.tag.step(1);
            return true;
        }
        self.active_input()
            .map(TextInput::move_right)
            .unwrap_or(false)
    }

    /// Home/End inside the focused text field.
    pub fn move_home(&mut self) -> bool {
        self.active_input()
            .map(TextInput::move_home)
            .unwrap_or(false)
    }

    pub fn move_end(&mut self) -> bool {
        self.active_input().map(TextInput::move_end).unwrap_or(false)
    }

    pub fn errors(&self) -> ValidationErrors {
        ValidationErrors {
            title: validate_title(self.title.value()),
            content: validate_content(self.content.value()),
            tag: None,
        }
    }

    /// Errors for fields the user has already left or tried to submit.
    pub fn visible_errors(&self) -> ValidationErrors {
        let all = self.errors();
        ValidationErrors {
            title: all.title.filter(|_| self.touched.title),
            content: all.content.filter(|_| self.touched.content),
            tag: all.tag.filter(|_| self.touched.tag),
        }
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        self.touched = Touched {
            title: true,
            content: true,
            tag: true,
        };
        if self.submitting {
            return SubmitOutcome::Busy;
        }
        let errors = self.errors();
        if !errors.is_empty() {
            return SubmitOutcome::Rejected(errors);
        }
        self.submitting = true;
        self.submit_error = None;
        SubmitOutcome::Accepted(NewNote {
            title: self.title.value().to_string(),
            content: self.content.value().to_string(),
            tag: self.tag,
        })
    }

    /// Re-enables submit and keeps the draft so the user can retry.
    pub fn submit_failed(&mut self, message: impl Into<String>) {
        self.submitting = false;
        self.submit_error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn form_with(title: &str, content: &str) -> NoteForm {
        let mut form = NoteForm::new();
        for ch in title.chars() {
            form.insert_char(ch);
        }
        form.focus_next();
        for ch in content.chars() {
            form.insert_char(ch);
        }
        form
    }

    #[test]
    fn short_title_is_rejected_with_minimum_message() {
        let mut form = form_with("ab", "");
        let outcome = form.submit();
        assert_matches!(outcome, SubmitOutcome::Rejected(ref errors)
            if errors.title.as_deref() == Some("Minimum 3 characters"));
        assert!(!form.is_submitting());
    }

    #[test]
    fn empty_title_is_required_and_long_fields_are_capped() {
        assert_eq!(validate_title("").as_deref(), Some("Required"));
        assert_eq!(
            validate_title(&"t".repeat(51)).as_deref(),
            Some("Maximum 50 characters")
        );
        assert_eq!(validate_title(&"t".repeat(50)), None);
        assert_eq!(
            validate_content(&"c".repeat(501)).as_deref(),
            Some("Maximum 500 characters")
        );
        assert_eq!(validate_content(""), None);
    }

    #[test]
    fn errors_stay_hidden_until_field_is_left() {
        let mut form = NoteForm::new();
        form.insert_char('a');
        assert!(form.visible_errors().is_empty());
        form.focus_next();
        assert_eq!(
            form.visible_errors().title.as_deref(),
            Some("Minimum 3 characters")
        );
    }

    #[test]
    fn accepted_submit_disables_until_failure() {
        let mut form = form_with("Plan trip", "book hotel");
        form.set_focus(FormField::Tag);
        form.move_right();
        let outcome = form.submit();
        assert_matches!(outcome, SubmitOutcome::Accepted(ref note)
            if note.title == "Plan trip" && note.tag == NoteTag::Work && note.content == "book hotel");
        assert!(form.is_submitting());
        assert_eq!(form.submit(), SubmitOutcome::Busy);

        form.submit_failed("HTTP 500: boom");
        assert!(!form.is_submitting());
        assert_eq!(form.submit_error(), Some("HTTP 500: boom"));
        assert_eq!(form.title().value(), "Plan trip");
    }

    #[test]
    fn home_and_end_only_move_inside_text_fields() {
        let mut form = NoteForm::new();
        "ilk".chars().for_each(|ch| {
            form.insert_char(ch);
        });
        assert!(form.move_home());
        form.insert_char('m');
        assert_eq!(form.title().value(), "milk");
        assert!(form.move_end());
        assert_eq!(form.title().before_cursor(), "milk");
        form.set_focus(FormField::Tag);
        assert!(!form.move_home());
    }

    #[test]
    fn newline_only_in_content() {
        let mut form = NoteForm::new();
        assert!(!form.insert_newline());
        form.set_focus(FormField::Content);
        assert!(form.insert_newline());
        assert_eq!(form.content().value(), "\n");
    }

    #[test]
    fn validate_note_checks_tag_membership() {
        let err = validate_note("Groceries", "", "Errands").unwrap_err();
        assert!(err.tag.as_deref().unwrap_or_default().starts_with("Must be one of"));
        let note = validate_note("Groceries", "milk", "Shopping").expect("valid");
        assert_eq!(note.tag, NoteTag::Shopping);
        assert_eq!(err.to_string(), format!("tag: {}", err.tag.clone().unwrap_or_default()));
    }
}
