use unicode_segmentation::UnicodeSegmentation;

/// Single text buffer with a grapheme-aware cursor, shared by the search box and the form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Byte offset of the cursor.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.value, self.cursor);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.value.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.value, self.cursor);
        self.value.drain(self.cursor..next);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.value, self.cursor);
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.value.len() {
            return false;
        }
        self.cursor = next_grapheme_boundary(&self.value, self.cursor);
        true
    }

    pub fn move_home(&mut self) -> bool {
        let changed = self.cursor != 0;
        self.cursor = 0;
        changed
    }

    pub fn move_end(&mut self) -> bool {
        let changed = self.cursor != self.value.len();
        self.cursor = self.value.len();
        changed
    }

    pub fn clear(&mut self) -> bool {
        if self.value.is_empty() {
            return false;
        }
        self.value.clear();
        self.cursor = 0;
        true
    }

    /// Text before the cursor; the renderer uses its width to place the terminal cursor.
    pub fn before_cursor(&self) -> &str {
        &self.value[..self.cursor]
    }
}

fn prev_grapheme_boundary(text: &str, idx: usize) -> usize {
    text[..idx]
        .grapheme_indices(true)
        .next_back()
        .map(|(pos, _)| pos)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, idx: usize) -> usize {
    text[idx..]
        .graphemes(true)
        .next()
        .map(|g| idx + g.len())
        .unwrap_or(text.len())
}
