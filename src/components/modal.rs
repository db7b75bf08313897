//! Overlay container and the host capability it mounts into.
//!
//! A [`Modal`] owns two resources on its host while mounted: a scroll lock on
//! the background and an escape listener. Both are released exactly once,
//! either by [`Modal::unmount`] or when the modal is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use ratatui::layout::Rect;

use crate::config::UiOptions;

pub type ListenerId = u64;

static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);

/// Where overlays get drawn and which background behaviours they suspend.
pub trait OverlayHost: Send + Sync {
    /// Area an overlay may occupy inside `frame`, or `None` when there is nowhere to attach.
    fn attachment(&self, frame: Rect) -> Option<Rect>;
    fn lock_scroll(&self);
    fn unlock_scroll(&self);
    fn add_escape_listener(&self, id: ListenerId);
    fn remove_escape_listener(&self, id: ListenerId);
    /// Listener that should receive the next Escape press.
    fn escape_target(&self) -> Option<ListenerId>;
    fn scroll_locked(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalHit {
    Content,
    Backdrop,
}

pub struct Modal {
    id: ListenerId,
    host: Arc<dyn OverlayHost>,
    mounted: bool,
}

impl Modal {
    pub fn mount(host: Arc<dyn OverlayHost>) -> Self {
        let id = NEXT_LISTENER.fetch_add(1, Ordering::Relaxed);
        host.lock_scroll();
        host.add_escape_listener(id);
        tracing::debug!(id, "modal mounted");
        Self {
            id,
            host,
            mounted: true,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Releases the scroll lock and the escape listener. Safe to call more than once.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.host.remove_escape_listener(self.id);
        self.host.unlock_scroll();
        tracing::debug!(id = self.id, "modal unmounted");
    }

    pub fn owns_escape(&self) -> bool {
        self.mounted && self.host.escape_target() == Some(self.id)
    }

    pub fn area(&self, frame: Rect) -> Option<Rect> {
        if !self.mounted {
            return None;
        }
        self.host.attachment(frame)
    }

    /// Classifies a click. `None` when the modal has nothing on screen.
    pub fn hit(&self, frame: Rect, column: u16, row: u16) -> Option<ModalHit> {
        let area = self.area(frame)?;
        let inside = column >= area.x
            && column < area.x.saturating_add(area.width)
            && row >= area.y
            && row < area.y.saturating_add(area.height);
        Some(if inside {
            ModalHit::Content
        } else {
            ModalHit::Backdrop
        })
    }
}

impl Drop for Modal {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl fmt::Debug for Modal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modal")
            .field("id", &self.id)
            .field("mounted", &self.mounted)
            .finish()
    }
}

#[derive(Debug, Default)]
struct LayerState {
    scroll_locks: usize,
    escape_listeners: Vec<ListenerId>,
}

/// Overlay layer drawn centred over the terminal frame.
#[derive(Debug, Clone)]
pub struct TerminalOverlay {
    enabled: bool,
    width_percent: u16,
    height_percent: u16,
    min_width: u16,
    min_height: u16,
    state: Arc<Mutex<LayerState>>,
}

impl TerminalOverlay {
    pub fn new(options: &UiOptions) -> Self {
        Self {
            enabled: options.modal_enabled,
            width_percent: options.modal_width.clamp(10, 100),
            height_percent: options.modal_height.clamp(10, 100),
            min_width: 30,
            min_height: 12,
            state: Arc::new(Mutex::new(LayerState::default())),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().escape_listeners.len()
    }
}

impl OverlayHost for TerminalOverlay {
    fn attachment(&self, frame: Rect) -> Option<Rect> {
        if !self.enabled {
            return None;
        }
        let area = centered_rect(self.width_percent, self.height_percent, frame);
        if area.width < self.min_width || area.height < self.min_height {
            return None;
        }
        Some(area)
    }

    fn lock_scroll(&self) {
        self.state.lock().scroll_locks += 1;
    }

    fn unlock_scroll(&self) {
        let mut state = self.state.lock();
        state.scroll_locks = state.scroll_locks.saturating_sub(1);
    }

    fn add_escape_listener(&self, id: ListenerId) {
        self.state.lock().escape_listeners.push(id);
    }

    fn remove_escape_listener(&self, id: ListenerId) {
        self.state.lock().escape_listeners.retain(|l| *l != id);
    }

    fn escape_target(&self) -> Option<ListenerId> {
        self.state.lock().escape_listeners.last().copied()
    }

    fn scroll_locked(&self) -> bool {
        self.state.lock().scroll_locks > 0
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width.saturating_mul(percent_x) / 100;
    let height = area.height.saturating_mul(percent_y) / 100;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Host that records every call so tests can check pairing.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingHost {
        pub locks: Mutex<usize>,
        pub unlocks: Mutex<usize>,
        pub listeners: Mutex<Vec<ListenerId>>,
        pub detached: bool,
    }

    impl OverlayHost for RecordingHost {
        fn attachment(&self, frame: Rect) -> Option<Rect> {
            if self.detached {
                None
            } else {
                Some(centered_rect(50, 50, frame))
            }
        }
        fn lock_scroll(&self) {
            *self.locks.lock() += 1;
        }
        fn unlock_scroll(&self) {
            *self.unlocks.lock() += 1;
        }
        fn add_escape_listener(&self, id: ListenerId) {
            self.listeners.lock().push(id);
        }
        fn remove_escape_listener(&self, id: ListenerId) {
            self.listeners.lock().retain(|l| *l != id);
        }
        fn escape_target(&self) -> Option<ListenerId> {
            self.listeners.lock().last().copied()
        }
        fn scroll_locked(&self) -> bool {
            *self.locks.lock() > *self.unlocks.lock()
        }
    }

    fn frame() -> Rect {
        Rect::new(0, 0, 100, 40)
    }

    #[test]
    fn unmount_then_drop_restores_once() {
        let host = Arc::new(RecordingHost::default());
        let mut modal = Modal::mount(host.clone());
        assert!(host.scroll_locked());
        assert!(modal.owns_escape());

        modal.unmount();
        modal.unmount();
        drop(modal);

        assert_eq!(*host.locks.lock(), 1);
        assert_eq!(*host.unlocks.lock(), 1);
        assert!(host.listeners.lock().is_empty());
    }

    #[test]
    fn drop_alone_releases_resources() {
        let host = Arc::new(RecordingHost::default());
        {
            let _modal = Modal::mount(host.clone());
        }
        assert_eq!(*host.unlocks.lock(), 1);
        assert!(host.escape_target().is_none());
    }

    #[test]
    fn clicks_inside_content_do_not_reach_backdrop() {
        let host = Arc::new(RecordingHost::default());
        let modal = Modal::mount(host);
        let area = modal.area(frame()).expect("attached");
        assert_eq!(modal.hit(frame(), area.x + 1, area.y + 1), Some(ModalHit::Content));
        assert_eq!(modal.hit(frame(), 0, 0), Some(ModalHit::Backdrop));
    }

    #[test]
    fn missing_attachment_renders_nothing() {
        let host = Arc::new(RecordingHost {
            detached: true,
            ..RecordingHost::default()
        });
        let modal = Modal::mount(host);
        assert_eq!(modal.area(frame()), None);
        assert_eq!(modal.hit(frame(), 10, 10), None);
    }

    #[test]
    fn terminal_overlay_declines_tiny_frames() {
        let overlay = TerminalOverlay::new(&UiOptions::default());
        assert!(overlay.attachment(Rect::new(0, 0, 120, 40)).is_some());
        assert!(overlay.attachment(Rect::new(0, 0, 20, 8)).is_none());

        let disabled = TerminalOverlay::new(&UiOptions {
            modal_enabled: false,
            ..UiOptions::default()
        });
        assert!(disabled.attachment(Rect::new(0, 0, 120, 40)).is_none());
    }

    #[test]
    fn nested_modals_hand_escape_back() {
        let overlay = Arc::new(TerminalOverlay::new(&UiOptions::default()));
        let outer = Modal::mount(overlay.clone());
        let mut inner = Modal::mount(overlay.clone());
        assert!(inner.owns_escape());
        assert!(!outer.owns_escape());
        inner.unmount();
        assert!(outer.owns_escape());
        assert!(overlay.scroll_locked());
        drop(outer);
        assert!(!overlay.scroll_locked());
        assert_eq!(overlay.listener_count(), 0);
    }
}
