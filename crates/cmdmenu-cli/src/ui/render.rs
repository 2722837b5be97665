//! TUI rendering functions.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Focus, OutputLine};

const MIN_MENU_WIDTH: u16 = 16;
const MAX_MENU_WIDTH: u16 = 40;

/// Draw the full UI.
pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(5),    // Menu + output
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(menu_width(app)), Constraint::Min(10)])
        .split(chunks[1]);

    draw_header(frame, app, chunks[0]);
    draw_menu(frame, app, body[0]);
    draw_output(frame, app, body[1]);
    draw_input(frame, app, chunks[2]);
    draw_status_bar(frame, app, chunks[3]);
}

#[allow(clippy::cast_possible_truncation)]
fn menu_width(app: &App) -> u16 {
    let widest = app
        .items
        .iter()
        .filter_map(|item| item.label())
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0);
    // borders + highlight symbol
    (widest.min(usize::from(MAX_MENU_WIDTH)) as u16 + 4).clamp(MIN_MENU_WIDTH, MAX_MENU_WIDTH)
}

fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let state = match (app.running, app.last_exit) {
        (true, _) => Span::styled(
            format!(
                "running: {}",
                app.current_label.as_deref().unwrap_or("command")
            ),
            Style::default().fg(Color::Green),
        ),
        (false, Some(code)) => Span::styled(
            format!("exit {code}"),
            Style::default().fg(if code == 0 { Color::DarkGray } else { Color::Red }),
        ),
        (false, None) => Span::styled("idle", Style::default().fg(Color::DarkGray)),
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            app.title.as_str(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        state,
    ]));
    frame.render_widget(header, area);
}

fn draw_menu(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let rule = "─".repeat(area.width.saturating_sub(4) as usize);
    let items: Vec<ListItem<'_>> = app
        .items
        .iter()
        .map(|item| match item.label() {
            Some(label) => {
                let style = if item.command().is_some() {
                    Style::default()
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                ListItem::new(Span::styled(label, style))
            }
            None => ListItem::new(Span::styled(
                rule.clone(),
                Style::default().fg(Color::DarkGray),
            )),
        })
        .collect();

    let highlight = if app.focus == Focus::Menu {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Menu"))
        .highlight_style(highlight)
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(app.selected);
    frame.render_stateful_widget(list, area, &mut state);
}

fn output_line(line: &OutputLine) -> Line<'_> {
    Line::from(
        line.segments
            .iter()
            .map(|segment| {
                if segment.is_error {
                    Span::styled(segment.text.as_str(), Style::default().fg(Color::Red))
                } else {
                    Span::raw(segment.text.as_str())
                }
            })
            .collect::<Vec<_>>(),
    )
}

#[allow(clippy::cast_possible_truncation)]
fn draw_output(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let lines: Vec<Line<'_>> = app.output.lines().map(output_line).collect();

    let inner_height = area.height.saturating_sub(2); // minus borders
    let inner_width = area.width.saturating_sub(2) as usize; // minus borders

    // Count wrapped visual lines using unicode display width
    let total: u16 = lines
        .iter()
        .map(|line| {
            if inner_width == 0 {
                return 1u16;
            }
            let display_width: usize = line
                .spans
                .iter()
                .map(|s| UnicodeWidthStr::width(s.content.as_ref()))
                .sum();
            1u16.max(
                display_width
                    .saturating_add(inner_width - 1)
                    .checked_div(inner_width)
                    .unwrap_or(1) as u16,
            )
        })
        .fold(0u16, u16::saturating_add);

    app.viewport_height = inner_height;
    app.total_lines = total;

    // Offset is distance from the bottom
    let max_scroll = total.saturating_sub(inner_height);
    let scroll = if app.scroll_pinned {
        max_scroll
    } else {
        max_scroll.saturating_sub(app.scroll_offset)
    };

    let title = if app.scroll_pinned {
        "Output".to_string()
    } else {
        format!(
            "Output [scroll: {}/{}]",
            max_scroll.saturating_sub(scroll),
            max_scroll
        )
    };

    let output = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(output, area);
}

#[allow(clippy::cast_possible_truncation)]
fn draw_input(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let (title, style) = if app.running {
        ("Input", Style::default())
    } else {
        ("Input (no process)", Style::default().fg(Color::DarkGray))
    };
    let border_style = if app.focus == Focus::Input {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let input = Paragraph::new(app.input.as_str()).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );
    frame.render_widget(input, area);

    if app.focus != Focus::Input {
        return;
    }
    // Keep the cursor visible on long input by clamping it to the box.
    let cursor_width =
        UnicodeWidthStr::width(&app.input[..app.cursor_pos.min(app.input.len())]) as u16;
    let cursor_x = area
        .x
        .saturating_add(1)
        .saturating_add(cursor_width)
        .min(area.x.saturating_add(area.width.saturating_sub(2)));
    frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
}

fn draw_status_bar(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let hints = match app.focus {
        Focus::Menu => " | Enter: run | Tab: input | Ctrl+L: clear | q: quit",
        Focus::Input => " | Enter: send | Esc: menu | Ctrl+C: quit",
    };
    let status = Paragraph::new(Line::from(vec![
        Span::styled(&app.status, Style::default().fg(Color::DarkGray)),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(status, area);
}
