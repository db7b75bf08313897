use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::components::{Pagination, TerminalOverlay};
use crate::config::AppConfig;
use crate::service::NoteApi;
use crate::ui::{self, FrameLayout};

mod actions;
pub mod state;

pub use actions::ActionDispatcher;
pub use state::{AppEvent, AppState, CloseReason, Command, FocusPane, ListStatus};

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    NextPage,
    PreviousPage,
    Refresh,
    NewNote,
    StartSearch,
    DeleteNote,
}

pub struct App {
    pub config: Arc<AppConfig>,
    state: AppState,
    dispatcher: ActionDispatcher,
    events: Receiver<AppEvent>,
    // owns the workers behind `dispatcher`
    _runtime: tokio::runtime::Runtime,
    list_state: ListState,
    layout: FrameLayout,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, api: Arc<dyn NoteApi>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("notehub-io")
            .enable_all()
            .build()
            .context("starting async runtime")?;
        let (tx, rx): (Sender<AppEvent>, Receiver<AppEvent>) = crossbeam_channel::unbounded();
        let dispatcher = ActionDispatcher::new(api, runtime.handle().clone(), tx);
        let overlay = Arc::new(TerminalOverlay::new(&config.ui));
        let state = AppState::new(&config, overlay);
        Ok(Self {
            tick_rate: config.ui.tick_rate(),
            config,
            state,
            dispatcher,
            events: rx,
            _runtime: runtime,
            list_state: ListState::default(),
            layout: FrameLayout::default(),
            should_quit: false,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let commands = self.state.start(Instant::now());
        self.dispatcher.dispatch_all(commands);

        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        self.state.shutdown();
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    self.layout = ui::draw_app(frame, &self.state, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, _) => {
                        // next draw picks up the new size
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        let now = Instant::now();
        let completions: Vec<AppEvent> = self.events.try_iter().collect();
        for event in completions {
            let commands = self.state.apply(event, now);
            self.dispatcher.dispatch_all(commands);
        }
        let commands = self.state.tick(now);
        self.dispatcher.dispatch_all(commands);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        let now = Instant::now();

        if self.state.is_modal_open() {
            self.handle_form_key(key);
            return;
        }

        if self.state.search().is_focused() {
            self.handle_search_key(key, now);
            return;
        }

        if self.state.has_pending_delete() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    let commands = self.state.confirm_delete();
                    self.dispatcher.dispatch_all(commands);
                }
                _ => self.state.cancel_delete(),
            }
            return;
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let action = match key.code {
            KeyCode::Char('q') if plain => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Char('l') | KeyCode::Char(']') | KeyCode::Right | KeyCode::PageDown => {
                Some(Action::NextPage)
            }
            KeyCode::Char('h') | KeyCode::Char('[') | KeyCode::Left | KeyCode::PageUp => {
                Some(Action::PreviousPage)
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Refresh)
            }
            KeyCode::Char('n') if plain => Some(Action::NewNote),
            KeyCode::Char('/') if plain => Some(Action::StartSearch),
            KeyCode::Char('d') if plain => Some(Action::DeleteNote),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action, now);
        }
    }

    fn handle_action(&mut self, action: Action, now: Instant) {
        let commands = match action {
            Action::Quit => {
                self.should_quit = true;
                Vec::new()
            }
            Action::SelectNext => {
                self.state.move_selection(1);
                Vec::new()
            }
            Action::SelectPrevious => {
                self.state.move_selection(-1);
                Vec::new()
            }
            Action::NextPage => self.state.next_page(now),
            Action::PreviousPage => self.state.previous_page(now),
            Action::Refresh => self.state.refresh(now),
            Action::NewNote => {
                if self.state.open_modal(self.layout.frame) {
                    self.state.set_status_message(None::<String>);
                }
                Vec::new()
            }
            Action::StartSearch => {
                self.state.focus_search();
                Vec::new()
            }
            Action::DeleteNote => {
                self.state.request_delete();
                Vec::new()
            }
        };
        self.dispatcher.dispatch_all(commands);
    }

    fn handle_search_key(&mut self, key: KeyEvent, now: Instant) {
        let commands = match key.code {
            KeyCode::Esc => {
                self.state.blur_search();
                Vec::new()
            }
            KeyCode::Enter => {
                self.state.blur_search();
                self.state.commit_search(now)
            }
            KeyCode::Backspace => {
                self.state.search_backspace(now);
                Vec::new()
            }
            KeyCode::Delete => {
                self.state.search_delete(now);
                Vec::new()
            }
            KeyCode::Left => {
                self.state.search_move(-1);
                Vec::new()
            }
            KeyCode::Right => {
                self.state.search_move(1);
                Vec::new()
            }
            KeyCode::Home => {
                self.state.search_home();
                Vec::new()
            }
            KeyCode::End => {
                self.state.search_end();
                Vec::new()
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.search_clear(now);
                Vec::new()
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                self.state.search_insert(ch, now);
                Vec::new()
            }
            _ => Vec::new(),
        };
        self.dispatcher.dispatch_all(commands);
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let commands = match key.code {
            KeyCode::Esc => {
                self.state.escape();
                Vec::new()
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.submit_form()
            }
            KeyCode::Enter => self.state.form_enter(),
            _ => {
                if let Some(form) = self.state.form_mut() {
                    match key.code {
                        KeyCode::Tab => form.focus_next(),
                        KeyCode::BackTab => form.focus_previous(),
                        KeyCode::Backspace => {
                            form.backspace();
                        }
                        KeyCode::Delete => {
                            form.delete();
                        }
                        KeyCode::Left => {
                            form.move_left();
                        }
                        KeyCode::Right => {
                            form.move_right();
                        }
                        KeyCode::Home => {
                            form.move_home();
                        }
                        KeyCode::End => {
                            form.move_end();
                        }
                        KeyCode::Char(ch)
                            if !key.modifiers.intersects(
                                KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                            ) =>
                        {
                            form.insert_char(ch);
                        }
                        _ => {}
                    }
                }
                Vec::new()
            }
        };
        self.dispatcher.dispatch_all(commands);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let now = Instant::now();
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self
                    .state
                    .modal_click(self.layout.frame, mouse.column, mouse.row)
                {
                    return;
                }
                if self.state.is_modal_open() {
                    // degraded modal with no area swallows clicks
                    return;
                }
                if let Some(area) = self.layout.pagination {
                    if contains(area, mouse.column, mouse.row) {
                        let pagination: Pagination = self.state.pagination();
                        let target = pagination
                            .control_at(mouse.column - area.x)
                            .and_then(|control| pagination.activate(control));
                        if let Some(page) = target {
                            let commands = self.state.set_page(page, now);
                            self.dispatcher.dispatch_all(commands);
                        }
                    }
                }
            }
            MouseEventKind::ScrollDown if contains(self.layout.list, mouse.column, mouse.row) => {
                self.state.move_selection(1);
            }
            MouseEventKind::ScrollUp if contains(self.layout.list, mouse.column, mouse.row) => {
                self.state.move_selection(-1);
            }
            _ => {}
        }
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
