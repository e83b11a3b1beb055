use std::io::{self, Stdout};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Clear, List, ListItem, ListState, Paragraph, Row, Table, Wrap,
};
use ratatui::{Frame, Terminal};
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info};
use warden_core::focus::Focus;
use warden_core::forms::{Form, FormItem};
use warden_core::navigation::{
    ConfirmChoice, ConfirmModal, MenuEntry, NavInput, NavigationError, Navigator,
};
use warden_core::operations::Category;
use warden_core::popup::{Popup, PopupBody, PopupKind, PopupSize, Severity};
use warden_core::query_executor::RecordBackend;

const CONFIRM_SIZE: PopupSize = PopupSize {
    width: 50,
    height: 8,
};

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("backend error: {0}")]
    Backend(#[from] NavigationError),
}

/// Runs the console until the operator quits or a backend call fails.
/// The terminal is restored on both paths.
pub fn run<B: RecordBackend>(
    navigator: &mut Navigator<B>,
    runtime: &Runtime,
) -> Result<(), TuiError> {
    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, navigator, runtime);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    info!("terminal ready");
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("terminal restored");
    Ok(())
}

fn run_loop<B: RecordBackend>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    navigator: &mut Navigator<B>,
    runtime: &Runtime,
) -> Result<(), TuiError> {
    loop {
        terminal.draw(|frame| render(frame, navigator))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                if let Some(input) = map_key_event(key) {
                    debug!(?input, "key input");
                    runtime.block_on(navigator.handle(input))?;
                }
            }
        }

        if navigator.should_quit() {
            break;
        }
    }

    Ok(())
}

fn map_key_event(key: KeyEvent) -> Option<NavInput> {
    match (key.modifiers, key.code) {
        (_, KeyCode::Enter) => Some(NavInput::Select),
        (_, KeyCode::Esc) => Some(NavInput::Cancel),
        (_, KeyCode::Tab) => Some(NavInput::Next),
        (_, KeyCode::BackTab) => Some(NavInput::Previous),
        (_, KeyCode::Up) => Some(NavInput::Up),
        (_, KeyCode::Down) => Some(NavInput::Down),
        (_, KeyCode::Left) => Some(NavInput::Left),
        (_, KeyCode::Right) => Some(NavInput::Right),
        (_, KeyCode::Backspace) => Some(NavInput::Backspace),
        (modifiers, KeyCode::Char(ch))
            if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Some(NavInput::Char(ch))
        }
        _ => None,
    }
}

fn render<B: RecordBackend>(frame: &mut Frame<'_>, navigator: &Navigator<B>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(3)])
        .split(frame.area());
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 5),
            Constraint::Ratio(1, 5),
            Constraint::Ratio(3, 5),
        ])
        .split(rows[0]);

    let focus = navigator.focus();
    render_menu(frame, panes[0], navigator, focus == Focus::Menu);
    render_submenu(frame, panes[1], navigator, focus == Focus::Submenu);
    render_form_area(frame, panes[2], navigator, focus == Focus::Form);

    let footer = Paragraph::new(Line::from(key_hints(focus)))
        .block(Block::default().borders(Borders::ALL).title("Keys"));
    frame.render_widget(footer, rows[1]);

    if let Some(confirm) = navigator.confirm() {
        render_confirm(frame, confirm);
    }
    if let Some(popup) = navigator.popup() {
        render_popup(frame, popup);
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title)
}

fn highlight(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    }
}

fn render_menu<B: RecordBackend>(
    frame: &mut Frame<'_>,
    area: Rect,
    navigator: &Navigator<B>,
    focused: bool,
) {
    let items = MenuEntry::ALL
        .iter()
        .map(|entry| ListItem::new(format!("[{}] {}", entry.shortcut(), entry.title())))
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(pane_block("Menu", focused))
        .highlight_style(highlight(focused));
    let mut state = ListState::default().with_selected(Some(navigator.menu_cursor()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_submenu<B: RecordBackend>(
    frame: &mut Frame<'_>,
    area: Rect,
    navigator: &Navigator<B>,
    focused: bool,
) {
    let title = navigator.category().map_or("Operations", Category::title);
    let items = navigator
        .submenu_entries()
        .iter()
        .map(|operation| ListItem::new(format!("[{}] {}", operation.shortcut(), operation.title())))
        .collect::<Vec<_>>();
    let selected = (!items.is_empty()).then_some(navigator.submenu_cursor());
    let list = List::new(items)
        .block(pane_block(title, focused))
        .highlight_style(highlight(focused));
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_form_area<B: RecordBackend>(
    frame: &mut Frame<'_>,
    area: Rect,
    navigator: &Navigator<B>,
    focused: bool,
) {
    let title = navigator
        .active_operation()
        .map_or_else(String::new, |(category, operation)| {
            format!("{} - {}", category.title(), operation.title())
        });
    let block = pane_block(&title, focused);

    let Some(form) = navigator.form() else {
        frame.render_widget(block, area);
        return;
    };

    let paragraph = match form.notice_text() {
        Some(notice) => Paragraph::new(Line::from(Span::styled(
            notice,
            Style::default().fg(Color::Yellow),
        )))
        .alignment(Alignment::Center),
        None => Paragraph::new(form_lines(form, focused)),
    };
    frame.render_widget(paragraph.block(block).wrap(Wrap { trim: false }), area);
}

fn form_lines(form: &Form, focused: bool) -> Vec<Line<'static>> {
    let active = focused.then(|| form.focused_item());
    let mut lines = Vec::with_capacity(form.fields().len() + 2);

    for (index, field) in form.fields().iter().enumerate() {
        let selected = active == Some(FormItem::Field(index));
        let value = if field.is_choice() {
            format!("< {} >", field.value())
        } else if selected {
            format!("{}_", field.value())
        } else {
            field.value().to_string()
        };
        let label_style = if selected {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", field.name()), label_style),
            Span::raw(value),
        ]));
    }

    let button_style = if active == Some(FormItem::Button) {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("[ {} ]", form.button_label()),
        button_style,
    )));
    lines
}

fn render_confirm(frame: &mut Frame<'_>, confirm: &ConfirmModal) {
    let area = fixed_centered_rect(CONFIRM_SIZE, frame.area());
    frame.render_widget(Clear, area);

    let button = |label: &'static str, choice: ConfirmChoice| {
        let style = if confirm.selected == choice {
            Style::default()
                .fg(Color::Red)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        Span::styled(format!("[ {label} ]"), style)
    };

    let body = Paragraph::new(vec![
        Line::from(confirm.text),
        Line::from(""),
        Line::from(vec![
            button("No", ConfirmChoice::No),
            Span::raw("  "),
            button("Yes", ConfirmChoice::Yes),
        ])
        .alignment(Alignment::Center),
    ])
    .wrap(Wrap { trim: true })
    .style(Style::default().fg(Color::White).bg(Color::Red))
    .block(Block::default().borders(Borders::ALL).title("Confirm"));
    frame.render_widget(body, area);
}

fn render_popup(frame: &mut Frame<'_>, popup: &Popup) {
    let area = fixed_centered_rect(popup.size, frame.area());
    frame.render_widget(Clear, area);

    let border = match popup.kind {
        PopupKind::Error => Style::default().fg(Color::Red),
        PopupKind::Result | PopupKind::Table => Style::default().fg(Color::Cyan),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(popup.title);

    match &popup.body {
        PopupBody::Message(lines) => {
            let lines = lines
                .iter()
                .map(|line| {
                    Line::from(Span::styled(
                        line.text.clone(),
                        Style::default().fg(severity_color(line.severity)),
                    ))
                })
                .collect::<Vec<_>>();
            let paragraph = Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
        }
        PopupBody::Table {
            columns,
            rows,
            scroll,
        } => {
            let header = Row::new(columns.iter().map(String::as_str)).style(
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            );
            let body = rows
                .iter()
                .skip(*scroll)
                .map(|row| Row::new(row.iter().map(String::as_str)));
            let widths = columns.iter().map(|_| Constraint::Fill(1));
            let table = Table::new(body, widths).header(header).block(block);
            frame.render_widget(table, area);
        }
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

/// Centers a box of `size`, shrunk to fit `area`.
fn fixed_centered_rect(size: PopupSize, area: Rect) -> Rect {
    let width = size.width.min(area.width);
    let height = size.height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn key_hints(focus: Focus) -> &'static str {
    match focus {
        Focus::Menu => "Up/Down: move | Enter: open | a/b/w: jump | q: quit",
        Focus::Submenu => "Up/Down: move | Enter: select | letter: jump | Esc: back",
        Focus::Form => "Tab/Up/Down: field | Left/Right: choice | Enter: next/submit | Esc: back",
        Focus::Confirm => "Left/Right: choose | Enter: confirm | Esc: cancel",
        Focus::Popup => "Up/Down: scroll | Enter/Esc/Tab: close",
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Cell;
    use ratatui::layout::Rect;
    use ratatui::Terminal;
    use warden_core::navigation::{NavInput, Navigator};
    use warden_core::popup::PopupSize;
    use warden_core::query_executor::{
        BackendError, MutationOutcome, QueryExecutor, RecordBackend, RowStream,
    };
    use warden_core::records::{CellValue, RawRow};
    use warden_core::statements::SqlParam;

    use super::{fixed_centered_rect, map_key_event, render};

    #[derive(Debug, Default)]
    struct StaticBackend {
        rows: Vec<RawRow>,
    }

    struct StaticStream {
        rows: std::vec::IntoIter<RawRow>,
    }

    #[async_trait]
    impl RowStream for StaticStream {
        async fn next_row(&mut self) -> Result<Option<RawRow>, BackendError> {
            Ok(self.rows.next())
        }
    }

    #[async_trait]
    impl RecordBackend for StaticBackend {
        type Stream = StaticStream;

        async fn mutate(
            &self,
            _sql: &str,
            _params: &[SqlParam],
        ) -> Result<MutationOutcome, BackendError> {
            Ok(MutationOutcome {
                rows_affected: 1,
                last_insert_id: Some(9),
            })
        }

        async fn query(
            &self,
            _sql: &str,
            _params: &[SqlParam],
        ) -> Result<Self::Stream, BackendError> {
            Ok(StaticStream {
                rows: self.rows.clone().into_iter(),
            })
        }

        async fn disconnect(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn drive(navigator: &mut Navigator<StaticBackend>, inputs: &[NavInput]) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build");
        for input in inputs {
            runtime
                .block_on(navigator.handle(*input))
                .expect("input should be handled");
        }
    }

    fn draw(navigator: &Navigator<StaticBackend>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("terminal");
        terminal
            .draw(|frame| render(frame, navigator))
            .expect("frame should draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(Cell::symbol)
            .collect()
    }

    #[test]
    fn keymap_covers_navigation_keys() {
        let key = |code| map_key_event(KeyEvent::new(code, KeyModifiers::NONE));
        assert_eq!(key(KeyCode::Enter), Some(NavInput::Select));
        assert_eq!(key(KeyCode::Esc), Some(NavInput::Cancel));
        assert_eq!(key(KeyCode::Tab), Some(NavInput::Next));
        assert_eq!(key(KeyCode::BackTab), Some(NavInput::Previous));
        assert_eq!(key(KeyCode::Backspace), Some(NavInput::Backspace));
        assert_eq!(key(KeyCode::Char('w')), Some(NavInput::Char('w')));
        assert_eq!(
            map_key_event(KeyEvent::new(KeyCode::Char('W'), KeyModifiers::SHIFT)),
            Some(NavInput::Char('W'))
        );
    }

    #[test]
    fn control_chords_are_not_text() {
        assert_eq!(
            map_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            None
        );
        assert_eq!(
            map_key_event(KeyEvent::new(KeyCode::F(1), KeyModifiers::NONE)),
            None
        );
    }

    #[test]
    fn popup_rect_is_centered_and_clamped() {
        let area = Rect::new(0, 0, 100, 30);
        let rect = fixed_centered_rect(
            PopupSize {
                width: 40,
                height: 10,
            },
            area,
        );
        assert_eq!(rect, Rect::new(30, 10, 40, 10));

        let small = fixed_centered_rect(
            PopupSize {
                width: 80,
                height: 24,
            },
            Rect::new(0, 0, 60, 12),
        );
        assert_eq!(small, Rect::new(0, 0, 60, 12));
    }

    #[test]
    fn initial_frame_lists_menu_entries() {
        let navigator = Navigator::new(QueryExecutor::new(StaticBackend::default()));
        let screen = draw(&navigator);
        assert!(screen.contains("[a] Admins"));
        assert!(screen.contains("[w] Whitelist"));
        assert!(screen.contains("[q] Quit"));
    }

    #[test]
    fn form_and_stub_notice_are_drawn() {
        let mut navigator = Navigator::new(QueryExecutor::new(StaticBackend::default()));
        drive(&mut navigator, &[NavInput::Char('a'), NavInput::Char('a')]);
        let screen = draw(&navigator);
        assert!(screen.contains("[a] Add"));
        assert!(screen.contains("ckey:"));
        assert!(screen.contains("flags:"));

        drive(&mut navigator, &[NavInput::Cancel, NavInput::Char('u')]);
        assert!(draw(&navigator).contains("Not Implemented. Perform in game."));
    }

    #[test]
    fn search_results_are_drawn_as_a_table_popup() {
        let backend = StaticBackend {
            rows: vec![RawRow::new(vec![
                CellValue::Int(3),
                CellValue::Text("alice".to_string()),
                CellValue::Text("human".to_string()),
            ])],
        };
        let mut navigator = Navigator::new(QueryExecutor::new(backend));
        drive(
            &mut navigator,
            &[
                NavInput::Char('w'),
                NavInput::Char('s'),
                NavInput::Next,
                NavInput::Char('%'),
                NavInput::Next,
                NavInput::Select,
            ],
        );

        let screen = draw(&navigator);
        assert!(screen.contains("Search Results"));
        assert!(screen.contains("alice"));
        assert!(screen.contains("race"));
    }
}
