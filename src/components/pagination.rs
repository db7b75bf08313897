use unicode_width::UnicodeWidthStr;

const DEFAULT_RANGE: usize = 2;
const DEFAULT_MARGIN: usize = 3;
const BREAK_LABEL: &str = "…";
const PREVIOUS_LABEL: &str = "‹ Prev";
const NEXT_LABEL: &str = "Next ›";

/// One clickable element of the pagination bar. Page indices are 0-based,
/// matching how the bar reports selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    Previous,
    Page { index: usize, active: bool },
    Break,
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    page_count: u32,
    current: u32,
    range: usize,
    margin: usize,
}

impl Pagination {
    /// `current` is the 1-indexed page shown by the app.
    pub fn new(page_count: u32, current: u32) -> Self {
        Self {
            page_count,
            current: current.clamp(1, page_count.max(1)),
            range: DEFAULT_RANGE,
            margin: DEFAULT_MARGIN,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.page_count > 1
    }

    /// Translates a 0-indexed selection into the 1-indexed page used everywhere else.
    pub fn select(&self, index: usize) -> Option<u32> {
        if !self.is_visible() {
            return None;
        }
        let last = self.page_count as usize - 1;
        Some(index.min(last) as u32 + 1)
    }

    pub fn previous(&self) -> Option<u32> {
        if self.current <= 1 {
            return None;
        }
        self.select(self.current as usize - 2)
    }

    pub fn next(&self) -> Option<u32> {
        if self.current >= self.page_count {
            return None;
        }
        self.select(self.current as usize)
    }

    pub fn activate(&self, control: PageControl) -> Option<u32> {
        match control {
            PageControl::Previous => self.previous(),
            PageControl::Next => self.next(),
            PageControl::Page { index, .. } => self.select(index),
            PageControl::Break => None,
        }
    }

    /// Controls to draw, in order. Empty when there is at most one page.
    pub fn controls(&self) -> Vec<PageControl> {
        if !self.is_visible() {
            return Vec::new();
        }
        let count = self.page_count as usize;
        let selected = self.current as usize - 1;
        let mut controls = vec![PageControl::Previous];

        if count <= self.range {
            controls.extend((0..count).map(|index| PageControl::Page {
                index,
                active: index == selected,
            }));
        } else {
            let mut left = self.range / 2;
            let mut right = self.range - left;
            if selected > count - right {
                right = count - selected;
                left = self.range - right;
            } else if selected < left {
                left = selected;
                right = self.range - left;
            }
            let window_end = if selected == 0 && self.range > 1 {
                selected + right - 1
            } else {
                selected + right
            };
            let window_start = selected.saturating_sub(left);

            for index in 0..count {
                let page = index + 1;
                let in_margin = page <= self.margin || page > count.saturating_sub(self.margin);
                let in_window = index >= window_start && index <= window_end;
                if in_margin || in_window {
                    controls.push(PageControl::Page {
                        index,
                        active: index == selected,
                    });
                } else if controls.last() != Some(&PageControl::Break) {
                    controls.push(PageControl::Break);
                }
            }
        }

        controls.push(PageControl::Next);
        controls
    }

    pub fn label(control: PageControl) -> String {
        match control {
            PageControl::Previous => PREVIOUS_LABEL.to_string(),
            PageControl::Next => NEXT_LABEL.to_string(),
            PageControl::Break => BREAK_LABEL.to_string(),
            PageControl::Page { index, active } => {
                if active {
                    format!("[{}]", index + 1)
                } else {
                    format!(" {} ", index + 1)
                }
            }
        }
    }

    /// Finds the control under a column offset, assuming labels are joined by one space.
    pub fn control_at(&self, offset: u16) -> Option<PageControl> {
        let mut start = 0u16;
        for control in self.controls() {
            let width = Self::label(control).width() as u16;
            if offset >= start && offset < start + width {
                return Some(control);
            }
            start += width + 1;
        }
        None
    }
}
