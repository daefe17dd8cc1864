use crate::commands::initial_selection;
use anyhow::Result;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use fieldcal::month::{DAYS_PER_WEEK, WEEKDAY_LABELS, WEEKS_PER_GRID};
use fieldcal::storage::{save_calendar, Calendar, StoreLocation};
use fieldcal::{
    resolve_cell_date, CalendarController, DateKey, DayCell, Event, EventId, EventIndex,
    Membership, MonthStep,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::ListState;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const MAX_DOTS: usize = 3;
const PREVIEW_CHARS: usize = 60;

pub fn run(calendar: Calendar, location: StoreLocation) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(calendar, location);
    let result = app.event_loop(&mut terminal);
    app.save_selection();
    teardown_terminal(&mut terminal)?;
    result
}

/// Up to three dots, then `+N` for the rest.
pub fn dot_marker(count: usize) -> String {
    let mut marker = "•".repeat(count.min(MAX_DOTS));
    if count > MAX_DOTS {
        marker.push_str(&format!("+{}", count - MAX_DOTS));
    }
    marker
}

struct App {
    calendar: Calendar,
    location: StoreLocation,
    controller: CalendarController,
    index: EventIndex,
    focus: Focus,
    focus_cell: (usize, usize),
    event_idx: usize,
    event_offset: usize,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Viewing(Event),
    Creating(EventForm),
    Editing { target: Event, form: EventForm },
    ConfirmDelete { target: Event },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Focus {
    Grid,
    Events,
}

struct EventForm {
    title: FieldValue,
    date: FieldValue,
    details: FieldValue,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Title,
    Date,
    Details,
}

enum FormAction {
    Create,
    Edit(Event),
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char_boundary(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        let target_start = line_starts[line_idx - 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        let target_start = line_starts[line_idx + 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl App {
    fn new(calendar: Calendar, location: StoreLocation) -> Self {
        let status = format!("Loaded calendar from {}", location.path.display());
        let controller = CalendarController::new(initial_selection(&calendar));
        let index = calendar.events.index();
        let mut app = App {
            calendar,
            location,
            controller,
            index,
            focus: Focus::Grid,
            focus_cell: (0, 0),
            event_idx: 0,
            event_offset: 0,
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
        };
        app.refocus_grid();
        app
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let TermEvent::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Viewing(_) => self.handle_viewing_key(key),
            Mode::Creating(_) | Mode::Editing { .. } => self.handle_form_key(key),
            Mode::ConfirmDelete { .. } => self.handle_confirm_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Grid => Focus::Events,
                    Focus::Events => Focus::Grid,
                };
                return Ok(false);
            }
            KeyCode::Char('[') | KeyCode::PageUp => {
                self.change_month(MonthStep::Previous);
                return Ok(false);
            }
            KeyCode::Char(']') | KeyCode::PageDown => {
                self.change_month(MonthStep::Next);
                return Ok(false);
            }
            KeyCode::Char('t') => {
                let today = DateKey::today();
                self.controller.jump_to(today);
                self.event_idx = 0;
                self.refocus_grid();
                self.status = format!("Jumped to today ({})", today);
                return Ok(false);
            }
            KeyCode::Char('n') => {
                self.mode = Mode::Creating(EventForm::new(self.controller.selected()));
                self.status =
                    "New event (Tab/Shift-Tab move, Ctrl+Enter save, Esc cancel)".into();
                return Ok(false);
            }
            KeyCode::Char('e') => {
                if let Some(event) = self.current_event().cloned() {
                    self.status = format!("Editing {}", event.id);
                    self.mode = Mode::Editing {
                        target: event.clone(),
                        form: EventForm::from_event(&event),
                    };
                } else {
                    self.status = "No event selected to edit".into();
                }
                return Ok(false);
            }
            KeyCode::Char('d') => {
                if let Some(event) = self.current_event().cloned() {
                    self.status = format!("Delete {}? (y to confirm, n/Esc to cancel)", event.id);
                    self.mode = Mode::ConfirmDelete {
                        target: event.clone(),
                    };
                } else {
                    self.status = "No event selected to delete".into();
                }
                return Ok(false);
            }
            _ => {}
        }

        match self.focus {
            Focus::Grid => self.handle_grid_key(key),
            Focus::Events => self.handle_events_key(key),
        }
    }

    fn handle_grid_key(&mut self, key: KeyEvent) -> Result<bool> {
        let (row, col) = self.focus_cell;
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.focus_cell = (row, col.saturating_sub(1)),
            KeyCode::Right | KeyCode::Char('l') => {
                self.focus_cell = (row, (col + 1).min(DAYS_PER_WEEK - 1))
            }
            KeyCode::Up | KeyCode::Char('k') => self.focus_cell = (row.saturating_sub(1), col),
            KeyCode::Down | KeyCode::Char('j') => {
                self.focus_cell = ((row + 1).min(WEEKS_PER_GRID - 1), col)
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.select_focused(),
            _ => {}
        }
        Ok(false)
    }

    fn handle_events_key(&mut self, key: KeyEvent) -> Result<bool> {
        let len = self.selected_events().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.event_idx = self.event_idx.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.event_idx + 1 < len {
                    self.event_idx += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Esc => self.focus = Focus::Grid,
            KeyCode::Enter => {
                if let Some(event) = self.current_event() {
                    self.mode = Mode::Viewing(event.clone());
                } else {
                    self.status = "No events on this day".into();
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_viewing_key(&mut self, key: KeyEvent) -> Result<bool> {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('x')
        ) {
            self.mode = Mode::Normal;
        }
        Ok(false)
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut close_form = false;
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match &mut mode {
            Mode::Creating(form) => {
                close_form = self.process_form_key(FormAction::Create, form, key);
            }
            Mode::Editing { target, form } => {
                let target = target.clone();
                close_form = self.process_form_key(FormAction::Edit(target), form, key);
            }
            Mode::Viewing(_) | Mode::ConfirmDelete { .. } | Mode::Normal => {}
        }
        self.mode = if close_form { Mode::Normal } else { mode };
        Ok(false)
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<bool> {
        let target = match &self.mode {
            Mode::ConfirmDelete { target } => target.clone(),
            _ => return Ok(false),
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let removed = self
                    .locate_target(&target)
                    .and_then(|pos| self.calendar.events.remove_at(pos).map_err(Into::into));
                match removed {
                    Ok(removed) => self.persist(format!("Deleted \"{}\"", removed.title)),
                    Err(err) => self.status = format!("Delete failed: {}", err),
                }
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    fn process_form_key(&mut self, action: FormAction, form: &mut EventForm, key: KeyEvent) -> bool {
        let mut close_form = false;
        match key.code {
            KeyCode::Esc => {
                close_form = true;
                self.status = "Canceled".into();
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Left => form.active_field_mut().move_left(),
            KeyCode::Right => form.active_field_mut().move_right(),
            KeyCode::Up => form.active_field_mut().move_up(),
            KeyCode::Down => form.active_field_mut().move_down(),
            KeyCode::Enter => {
                let control = key.modifiers.contains(KeyModifiers::CONTROL);
                if form.field == FormField::Details && !control {
                    form.active_field_mut().insert_char('\n');
                } else {
                    close_form = self.try_submit(action, form);
                }
            }
            KeyCode::Backspace => form.active_field_mut().backspace(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    form.active_field_mut().insert_char(c);
                }
            }
            _ => {}
        }
        close_form
    }

    fn try_submit(&mut self, action: FormAction, form: &EventForm) -> bool {
        let result = match action {
            FormAction::Create => self.create_event_from_form(form),
            FormAction::Edit(target) => self.edit_event_from_form(&target, form),
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                self.status = format!("Could not save: {}", err);
                false
            }
        }
    }

    fn create_event_from_form(&mut self, form: &EventForm) -> Result<()> {
        let date = DateKey::parse(&form.date.value)?;
        let id = EventId::generate();
        let event = Event::new(
            id,
            date,
            form.title.value.trim().to_string(),
            form.details.value.trim_end().to_string(),
        );
        let title = event.title.clone();
        self.calendar.events.add(event)?;
        self.persist(format!("Created \"{}\" on {}", title, date));
        Ok(())
    }

    fn edit_event_from_form(&mut self, target: &Event, form: &EventForm) -> Result<()> {
        let date = DateKey::parse(&form.date.value)?;
        let title = form.title.value.trim().to_string();
        let details = form.details.value.trim_end().to_string();
        let pos = self.locate_target(target)?;
        self.calendar.events.update_at(pos, |event| {
            event.date = date;
            event.title = title.clone();
            event.details = details.clone();
        })?;
        self.persist(format!("Updated {}", target.id));
        Ok(())
    }

    /// Ids may repeat, so the sidebar's copy of the event is matched whole.
    fn locate_target(&self, target: &Event) -> Result<usize> {
        self.calendar
            .events
            .position_of(target)
            .ok_or_else(|| anyhow::anyhow!("event {} changed since it was opened", target.id))
    }

    fn change_month(&mut self, step: MonthStep) {
        self.controller.advance_month(step);
        self.refocus_grid();
        self.status = format!("Showing {}", self.controller.cursor().label());
    }

    /// Puts grid focus on the selected date when it is visible, else on
    /// the 1st of the displayed month.
    fn refocus_grid(&mut self) {
        let grid = self.controller.current_grid();
        let first = self.controller.cursor().first_day();
        self.focus_cell = grid
            .position_of(self.controller.selected())
            .or_else(|| grid.position_of(first))
            .unwrap_or((0, 0));
    }

    fn focused_cell(&self) -> Option<DayCell> {
        let (row, col) = self.focus_cell;
        self.controller.current_grid().cell(row, col)
    }

    fn select_focused(&mut self) {
        if let Some(cell) = self.focused_cell() {
            let date = self.controller.select_cell(cell);
            self.event_idx = 0;
            self.event_offset = 0;
            self.status = format!("Selected {} ({} event(s))", date, self.index.count(&date));
        }
    }

    fn selected_events(&self) -> &[Event] {
        self.controller.events_for_selected(&self.index)
    }

    fn current_event(&self) -> Option<&Event> {
        self.selected_events().get(self.event_idx)
    }

    fn ensure_event_bounds(&mut self) {
        let len = self.selected_events().len();
        self.event_idx = self.event_idx.min(len.saturating_sub(1));
        self.event_offset = self.event_offset.min(len.saturating_sub(1));
    }

    /// Rebuilds the index and writes the store. A failed write is reported
    /// in the status line and the log, the in-memory state is kept.
    fn persist(&mut self, message: impl Into<String>) {
        self.calendar.selected = Some(self.controller.selected());
        self.index = self.calendar.events.index();
        match save_calendar(&self.location, &self.calendar) {
            Ok(()) => {
                self.last_save = Instant::now();
                self.status = message.into();
            }
            Err(err) => {
                tracing::warn!(error = %format!("{:#}", err), "saving calendar failed");
                self.status = format!("Save failed: {:#}", err);
            }
        }
        self.ensure_event_bounds();
    }

    fn save_selection(&mut self) {
        let selected = Some(self.controller.selected());
        if self.calendar.selected == selected {
            return;
        }
        self.calendar.selected = selected;
        if let Err(err) = save_calendar(&self.location, &self.calendar) {
            tracing::warn!(error = %format!("{:#}", err), "saving selection failed");
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(16),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(layout[1]);
        self.draw_grid(f, body[0]);
        self.draw_sidebar(f, body[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Viewing(event) => draw_event_modal(f, event),
            Mode::Creating(form) => draw_form(f, "New Event", form),
            Mode::Editing { form, .. } => draw_form(f, "Edit Event", form),
            Mode::ConfirmDelete { target } => draw_confirm(f, target),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "fieldcal ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.calendar.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(self.location.scope.label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{} event(s)", self.calendar.events.len()),
                Style::default().fg(Color::Magenta),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_grid(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let grid = self.controller.current_grid();
        let cursor = grid.cursor();
        let focused = self.focus == Focus::Grid;
        let block = Block::default()
            .title(Span::styled(
                format!("◀ {} ▶", cursor.label()),
                Style::default()
                    .fg(if focused { Color::Cyan } else { Color::Gray })
                    .add_modifier(Modifier::BOLD),
            ))
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused {
                Color::Cyan
            } else {
                Color::DarkGray
            }));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut row_constraints = vec![Constraint::Length(1)];
        row_constraints.extend((0..WEEKS_PER_GRID).map(|_| Constraint::Ratio(1, WEEKS_PER_GRID as u32)));
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(row_constraints)
            .split(inner);
        let row_cells = rows
            .iter()
            .map(|row| {
                Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints((0..DAYS_PER_WEEK).map(|_| Constraint::Ratio(1, DAYS_PER_WEEK as u32)))
                    .split(*row)
            })
            .collect::<Vec<_>>();

        for (col, label) in WEEKDAY_LABELS.iter().enumerate() {
            let color = match col {
                0 => Color::LightRed,
                6 => Color::LightBlue,
                _ => Color::Gray,
            };
            let heading = Paragraph::new(*label)
                .alignment(Alignment::Center)
                .style(Style::default().fg(color).add_modifier(Modifier::BOLD));
            f.render_widget(heading, row_cells[0][col]);
        }

        let today = DateKey::today();
        let selected = self.controller.selected();
        for (row, col, cell) in grid.iter() {
            let date = resolve_cell_date(cursor, cell);
            let is_focus = focused && self.focus_cell == (row, col);
            let style = cell_style(cell, date == selected, date == today, is_focus);
            let lines = vec![
                Line::from(format!("{}", cell.day)),
                Line::from(Span::styled(
                    dot_marker(self.index.count(&date)),
                    Style::default().fg(Color::LightYellow),
                )),
            ];
            let widget = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .style(style);
            f.render_widget(widget, row_cells[row + 1][col]);
        }
    }

    fn draw_sidebar(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        self.ensure_event_bounds();
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let focused = self.focus == Focus::Events;
        let accent = if focused { Color::Cyan } else { Color::DarkGray };
        let selected = Paragraph::new(Line::from(Span::styled(
            self.controller.selected().to_canonical(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title("Selected date")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent)),
        );
        f.render_widget(selected, sections[0]);

        let events = self.controller.events_for_selected(&self.index);
        let count = events.len();
        let items = if events.is_empty() {
            vec![ListItem::new("No events")]
        } else {
            events.iter().map(event_list_item).collect()
        };

        let mut state = ListState::default();
        let viewport = (sections[1].height.saturating_sub(2) / 2) as usize;
        let offset = adjust_offset(self.event_idx, self.event_offset, viewport, 1, count);
        *state.offset_mut() = offset;
        if focused && count > 0 {
            state.select(Some(self.event_idx));
        }
        let block = Block::default()
            .title(Span::styled(
                format!("Events ({})", count),
                Style::default()
                    .fg(if focused { Color::Cyan } else { Color::Gray })
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, sections[1], &mut state);
        self.event_offset = offset;
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let detail_line = match self.current_event() {
            Some(event) if self.focus == Focus::Events => selected_event_detail(event),
            _ => match self.focused_cell() {
                Some(cell) => {
                    let date = resolve_cell_date(self.controller.cursor(), cell);
                    Line::from(format!("{} • {} event(s)", date, self.index.count(&date)))
                }
                None => Line::from(""),
            },
        };
        let detail = Paragraph::new(detail_line).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(match self.focus {
                    Focus::Grid => "Focused",
                    Focus::Events => "Event",
                }),
        );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let mut spans = vec![
            Span::styled("[ ]", Style::default().fg(Color::LightCyan)),
            Span::raw(" month  "),
            Span::styled("t", Style::default().fg(Color::LightCyan)),
            Span::raw(" today  "),
            Span::styled("Tab", Style::default().fg(Color::LightCyan)),
            Span::raw(" focus  "),
        ];
        match self.focus {
            Focus::Grid => spans.extend([
                Span::styled("←↑↓→ / h j k l", Style::default().fg(Color::LightCyan)),
                Span::raw(" move  "),
                Span::styled("Enter", Style::default().fg(Color::LightGreen)),
                Span::raw(" select day  "),
            ]),
            Focus::Events => spans.extend([
                Span::styled("↑↓", Style::default().fg(Color::LightCyan)),
                Span::raw(" browse  "),
                Span::styled("Enter", Style::default().fg(Color::LightGreen)),
                Span::raw(" details  "),
            ]),
        }
        spans.extend([
            Span::styled("n", Style::default().fg(Color::LightMagenta)),
            Span::raw(" new  "),
            Span::styled("e", Style::default().fg(Color::LightYellow)),
            Span::raw(" edit  "),
            Span::styled("d", Style::default().fg(Color::LightRed)),
            Span::raw(" delete  "),
            Span::styled("q", Style::default().fg(Color::LightRed)),
            Span::raw(" quit"),
        ]);
        Line::from(spans)
    }
}

impl EventForm {
    fn new(date: DateKey) -> Self {
        EventForm {
            title: FieldValue::new(""),
            date: FieldValue::new(&date.to_canonical()),
            details: FieldValue::new(""),
            field: FormField::Title,
        }
    }

    fn from_event(event: &Event) -> Self {
        EventForm {
            title: FieldValue::new(&event.title),
            date: FieldValue::new(&event.date.to_canonical()),
            details: FieldValue::new(&event.details),
            field: FormField::Title,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Date,
            FormField::Date => FormField::Details,
            FormField::Details => FormField::Title,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Details,
            FormField::Date => FormField::Title,
            FormField::Details => FormField::Date,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            FormField::Title => &mut self.title,
            FormField::Date => &mut self.date,
            FormField::Details => &mut self.details,
        }
    }
}

fn cell_style(cell: DayCell, selected: bool, today: bool, focused: bool) -> Style {
    let mut style = Style::default().fg(match cell.membership {
        Membership::Current => Color::White,
        Membership::Previous | Membership::Next => Color::DarkGray,
    });
    if today {
        style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
    }
    if selected {
        style = style
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
    }
    if focused {
        style = style
            .bg(Color::Cyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD);
    }
    style
}

fn draw_confirm(f: &mut ratatui::Frame<'_>, target: &Event) {
    let area = centered_rect(50, 30, f.size());
    let body = vec![
        Line::from(Span::styled(
            format!("Delete \"{}\" on {}?", target.title, target.date),
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press y to confirm, n or Esc to cancel"),
    ];
    let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
        Block::default()
            .title(Span::styled(
                "Confirm Delete",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightRed)),
    );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_event_modal(f: &mut ratatui::Frame<'_>, event: &Event) {
    let area = centered_rect(60, 50, f.size());
    let mut lines = vec![
        Line::from(Span::styled(
            event.title.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Date: ", Style::default().fg(Color::Gray)),
            Span::styled(event.date.to_canonical(), Style::default().fg(Color::LightRed)),
        ]),
        Line::from(""),
    ];
    lines.extend(event.details.lines().map(|l| Line::from(l.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Esc or Enter to close",
        Style::default().fg(Color::DarkGray),
    )));
    let dialog = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(Span::styled(
                format!("Event {}", event.id),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_form(f: &mut ratatui::Frame<'_>, title: &str, form: &EventForm) {
    let area = centered_rect(70, 60, f.size());
    let mut fields = Vec::new();
    fields.extend(field_lines(
        "Title",
        &form.title,
        form.field == FormField::Title,
    ));
    fields.extend(field_lines(
        "Date (YYYY-MM-DD)",
        &form.date,
        form.field == FormField::Date,
    ));
    fields.extend(field_lines(
        "Details",
        &form.details,
        form.field == FormField::Details,
    ));
    fields.push(Line::from(Span::styled(
        "Ctrl+Enter to save • Esc to cancel • Tab/Shift-Tab to move • Enter adds newline in Details",
        Style::default().fg(Color::Gray),
    )));
    let dialog = Paragraph::new(fields)
        .block(
            Block::default()
                .title(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn prev_char_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn event_list_item(event: &Event) -> ListItem<'static> {
    let title = Line::from(vec![
        Span::styled("● ", Style::default().fg(Color::LightYellow)),
        Span::styled(
            truncate_text(&event.title, 40),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    let preview = Line::from(Span::styled(
        format!("  {}", event.preview(PREVIEW_CHARS).replace('\n', " ")),
        Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
    ));
    ListItem::new(vec![title, preview])
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        prefix.clone()
                    } else {
                        spacer.clone()
                    },
                    label_style,
                ),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn selected_event_detail(event: &Event) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            event.title.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(event.date.to_canonical(), Style::default().fg(Color::LightRed)),
    ];
    if !event.details.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            event.preview(PREVIEW_CHARS),
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        ));
    }
    Line::from(spans)
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
