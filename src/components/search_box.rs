use super::TextInput;

/// Controlled search input. Every edit is reported as the full new value;
/// debouncing happens in the orchestrator, not here.
#[derive(Debug, Clone, Default)]
pub struct SearchBox {
    input: TextInput,
    focused: bool,
}

impl SearchBox {
    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn input(&self) -> &TextInput {
        &self.input
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn insert_char(&mut self, ch: char) -> Option<String> {
        self.input.insert_char(ch);
        self.changed()
    }

    pub fn backspace(&mut self) -> Option<String> {
        if self.input.backspace() {
            self.changed()
        } else {
            None
        }
    }

    pub fn delete(&mut self) -> Option<String> {
        if self.input.delete() {
            self.changed()
        } else {
            None
        }
    }

    pub fn clear(&mut self) -> Option<String> {
        if self.input.clear() {
            self.changed()
        } else {
            None
        }
    }

    pub fn move_left(&mut self) {
        self.input.move_left();
    }

    pub fn move_right(&mut self) {
        self.input.move_right();
    }

    pub fn move_home(&mut self) {
        self.input.move_home();
    }

    pub fn move_end(&mut self) {
        self.input.move_end();
    }

    fn changed(&self) -> Option<String> {
        Some(self.input.value().to_string())
    }
}
