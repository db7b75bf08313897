use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{AppState, FocusPane, ListStatus, ModalState};
use crate::components::note_list::{format_timestamp, preview};
use crate::components::{FormField, NoteForm, PageControl, Pagination, TextInput};
use crate::highlight::{build_highlight_regex, highlight_spans};

const PREVIEW_LINES: usize = 2;

/// Screen regions the event loop needs for mouse routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLayout {
    pub frame: Rect,
    pub list: Rect,
    pub pagination: Option<Rect>,
}

pub fn draw_app(frame: &mut Frame, state: &AppState, list_state: &mut ListState) -> FrameLayout {
    let area = frame.size();
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(area);

    draw_toolbar(frame, state, vertical[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(vertical[1]);

    draw_notes(frame, state, list_state, columns[0]);
    draw_detail(frame, state, columns[1]);

    let pagination = draw_pagination(frame, &state.pagination(), vertical[2]);

    let status = Paragraph::new(build_status_line(state)).style(Style::default().fg(Color::Gray));
    frame.render_widget(status, vertical[3]);

    if let Some(modal) = state.modal() {
        draw_modal(frame, modal);
    }

    FrameLayout {
        frame: area,
        list: columns[0],
        pagination,
    }
}

fn draw_toolbar(frame: &mut Frame, state: &AppState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(18)])
        .split(area);

    let focused = state.search().is_focused();
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let value = state.search().value();
    let text = if value.is_empty() && !focused {
        Line::from(Span::styled(
            "Press / to search notes",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(value.to_string())
    };
    let search = Paragraph::new(text).block(
        Block::default()
            .title("Search")
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(search, chunks[0]);
    if focused && state.modal().is_none() {
        let input = state.search().input();
        frame.set_cursor(
            chunks[0].x + 1 + input.before_cursor().width() as u16,
            chunks[0].y + 1,
        );
    }

    let create = Paragraph::new(Line::from(Span::styled(
        "Create note +",
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL).title("n"));
    frame.render_widget(create, chunks[1]);
}

fn draw_notes(frame: &mut Frame, state: &AppState, list_state: &mut ListState, area: Rect) {
    let border_style = if matches!(state.focus, FocusPane::List) && state.modal().is_none() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let (notes, refreshing) = match state.list_status() {
        ListStatus::Loading => {
            render_message(frame, area, "Notes", "Loading notes…", Color::Gray);
            list_state.select(None);
            return;
        }
        ListStatus::Failed(message) => {
            render_message(
                frame,
                area,
                "Notes",
                &format!("Could not load notes: {message}"),
                Color::Red,
            );
            list_state.select(None);
            return;
        }
        ListStatus::Empty => {
            render_message(frame, area, "Notes", "No notes found", Color::Gray);
            list_state.select(None);
            return;
        }
        ListStatus::Loaded { notes, refreshing } => (notes, refreshing),
    };

    let regex = build_highlight_regex(state.debounced_search());
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let items: Vec<ListItem> = notes
        .iter()
        .map(|note| {
            let title = Line::from(highlight_spans(
                &note.title,
                regex.as_ref(),
                highlight_style,
                Style::default().add_modifier(Modifier::BOLD),
            ));
            let meta = Line::from(vec![
                Span::styled(format!("#{}", note.tag), Style::default().fg(Color::Magenta)),
                Span::raw(" • "),
                Span::styled(
                    format!("Updated {}", format_timestamp(note.updated_at.as_deref())),
                    Style::default().fg(Color::Gray),
                ),
            ]);
            let body = Line::from(highlight_spans(
                &preview(note, PREVIEW_LINES),
                regex.as_ref(),
                highlight_style,
                Style::default(),
            ));
            ListItem::new(vec![title, meta, body])
        })
        .collect();

    let mut title = format!("Notes · page {}", state.page());
    if refreshing {
        title.push_str(" (refreshing)");
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    list_state.select(Some(state.list().selected()));
    frame.render_stateful_widget(list, area, list_state);
}

fn render_message(frame: &mut Frame, area: Rect, title: &str, message: &str, color: Color) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(color),
    )))
    .block(Block::default().title(title.to_string()).borders(Borders::ALL))
    .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_detail(frame: &mut Frame, state: &AppState, area: Rect) {
    let notes = state.visible_notes();
    let text = state
        .list()
        .selected_note(notes)
        .map(|note| {
            let mut lines = vec![
                Line::from(Span::styled(
                    note.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!(
                        "#{} • created {} • updated {}",
                        note.tag,
                        format_timestamp(note.created_at.as_deref()),
                        format_timestamp(note.updated_at.as_deref())
                    ),
                    Style::default().fg(Color::Gray),
                )),
                Line::from(""),
            ];
            lines.extend(note.content.lines().map(|line| Line::from(line.to_string())));
            Text::from(lines)
        })
        .unwrap_or_else(|| Text::from("Select a note to see its contents."));

    let detail = Paragraph::new(text)
        .block(Block::default().title("Note").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, area);
}

/// Draws the page bar and returns where it landed, if anything was drawn.
fn draw_pagination(frame: &mut Frame, pagination: &Pagination, area: Rect) -> Option<Rect> {
    let controls = pagination.controls();
    if controls.is_empty() {
        return None;
    }
    let mut spans = Vec::with_capacity(controls.len() * 2);
    for (idx, control) in controls.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw(" "));
        }
        let label = Pagination::label(*control);
        let style = match control {
            PageControl::Page { active: true, .. } => Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            PageControl::Break => Style::default().fg(Color::DarkGray),
            _ => Style::default(),
        };
        spans.push(Span::styled(label, style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
    Some(area)
}

fn build_status_line(state: &AppState) -> Text<'static> {
    let hints = if state.modal().is_some() {
        "Tab next field • ←/→ change tag • Ctrl-s create • Esc close"
    } else if state.search().is_focused() {
        "Type to filter • Enter search now • Esc done"
    } else {
        "/ search • n new note • d delete • ←/→ page • Ctrl-r refresh • q quit"
    };
    let mut lines = Vec::with_capacity(2);
    if let Some(message) = state.status_message() {
        lines.push(Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Yellow),
        )));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        hints,
        Style::default().fg(Color::DarkGray),
    )));
    Text::from(lines)
}

fn draw_modal(frame: &mut Frame, state: &ModalState) {
    // no attachment point, nothing to draw
    let Some(area) = state.modal().area(frame.size()) else {
        return;
    };
    frame.render_widget(Clear, area);
    let block = Block::default()
        .title("Create note")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    draw_form(frame, state.form(), inner);
}

fn draw_form(frame: &mut Frame, form: &NoteForm, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    let errors = form.visible_errors();
    let focus = form.focus();

    let title_block = field_block("Title", focus == FormField::Title);
    let title_inner = title_block.inner(rows[0]);
    frame.render_widget(
        Paragraph::new(form.title().value().to_string()).block(title_block),
        rows[0],
    );
    frame.render_widget(error_line(errors.title.as_deref()), rows[1]);

    let content_block = field_block("Content", focus == FormField::Content);
    let content_inner = content_block.inner(rows[2]);
    frame.render_widget(
        Paragraph::new(form.content().value().to_string()).block(content_block),
        rows[2],
    );
    frame.render_widget(error_line(errors.content.as_deref()), rows[3]);

    let tag_style = if focus == FormField::Tag {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw("Tag: "),
            Span::styled(format!("‹ {} ›", form.tag()), tag_style),
        ])),
        rows[4],
    );

    let submit_label = if form.is_submitting() {
        "[ Creating… ]"
    } else {
        "[ Create note ]"
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            button("[ Cancel ]", focus == FormField::Cancel, false),
            Span::raw("  "),
            button(submit_label, focus == FormField::Submit, form.is_submitting()),
        ])),
        rows[5],
    );
    frame.render_widget(error_line(form.submit_error()), rows[6]);

    match focus {
        FormField::Title => place_cursor(frame, form.title(), title_inner),
        FormField::Content => place_cursor(frame, form.content(), content_inner),
        _ => {}
    }
}

fn field_block(title: &'static str, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(style)
}

fn error_line(message: Option<&str>) -> Paragraph<'static> {
    let text = message.map(str::to_string).unwrap_or_default();
    Paragraph::new(Line::from(Span::styled(text, Style::default().fg(Color::Red))))
}

fn button(label: &'static str, focused: bool, disabled: bool) -> Span<'static> {
    let style = if disabled {
        Style::default().fg(Color::DarkGray)
    } else if focused {
        Style::default()
            .bg(Color::Cyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Span::styled(label, style)
}

fn place_cursor(frame: &mut Frame, input: &TextInput, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let before = input.before_cursor();
    let row = before.matches('\n').count() as u16;
    let col = before.rsplit('\n').next().unwrap_or("").width() as u16;
    let x = (area.x + col).min(area.x + area.width - 1);
    let y = (area.y + row).min(area.y + area.height - 1);
    frame.set_cursor(x, y);
}
