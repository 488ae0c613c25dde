use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, InputMode, Page};
use crate::models::Notice;
use crate::views::forms::{FieldKind, Form};

use super::pages::{render_guide, render_hearings, render_report, render_tracker};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Page tabs
            Constraint::Min(0),    // Page body
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    render_tabs(frame, app, chunks[0]);

    match app.page {
        Page::Tracker => render_tracker(frame, app, chunks[1]),
        Page::Report => render_report(frame, app, chunks[1]),
        Page::Hearings => render_hearings(frame, app, chunks[1]),
        Page::Guide => render_guide(frame, app, chunks[1]),
    }

    render_status(frame, app, chunks[2]);

    match &app.mode {
        InputMode::Normal => {}
        InputMode::Help => render_help(frame),
        InputMode::Prompt(kind) => render_prompt(frame, kind.label(), &app.prompt),
        InputMode::Form => {
            if let Some(form) = &app.form {
                render_form(frame, form);
            }
        }
        InputMode::Picker => render_picker(frame, app),
        InputMode::Confirm(pending) => render_confirm(frame, &pending.question()),
    }
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Page::ALL
        .iter()
        .enumerate()
        .map(|(i, page)| Line::from(format!("{} {}", i + 1, page.title())))
        .collect();
    let selected = Page::ALL.iter().position(|p| *p == app.page).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .title(format!(" Renewable Opposition Hub · {} store ", app.backend_name()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = match app.notices.last() {
        Some(notice) => {
            let color = match notice {
                Notice::Info(_) => Color::Gray,
                Notice::Success(_) => Color::Green,
                Notice::Warning(_) => Color::Yellow,
                Notice::Error(_) => Color::Red,
            };
            (notice.message().to_string(), Style::default().fg(color))
        }
        None => (
            match app.page {
                Page::Tracker => "j/k:nav  Enter:select  /:search  a:add  e:survey  d:remove  ?:help  q:quit",
                Page::Report => "j/k:state  h/l:county  c:search  n/N:markers  ?:help  q:quit",
                Page::Hearings => "j/k:nav  h/l:topic  /:search  a:add  e:edit  r:removed  ?:help  q:quit",
                Page::Guide => "j/k:scroll  1-4:pages  q:quit",
            }
            .to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_prompt(frame: &mut Frame, label: &str, input: &str) {
    let area = centered_rect(60, 20, frame.area());

    let block = Block::default()
        .title(format!(" {label} (Enter to apply, Esc to cancel) "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(area);

    // Clear the area first
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(format!("> {input}_")).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

/// Lines of the form pre-wrapped to `width`, plus the row of the focused
/// field's label so the popup can keep it in view.
fn form_lines(form: &Form, width: usize) -> (Vec<Line<'static>>, usize) {
    let width = width.saturating_sub(4).max(10);
    let mut lines = Vec::new();
    let mut focus_line = 0;

    if !form.errors.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Please fill in all required fields: {}", form.errors.join(", ")),
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::default());
    }

    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        if focused {
            focus_line = lines.len();
        }
        let label_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        lines.push(Line::from(Span::styled(
            format!("{}{}", if focused { "▶ " } else { "  " }, field.label),
            label_style,
        )));

        let cursor = if focused { "_" } else { "" };
        if let FieldKind::Choice(_) = field.kind {
            lines.push(Line::from(format!("    ◀ {} ▶", field.value)));
            continue;
        }
        let text = format!("{}{cursor}", field.value);
        let mut rows = Vec::new();
        for paragraph in text.split('\n') {
            let wrapped = textwrap::wrap(paragraph, width);
            if wrapped.is_empty() {
                rows.push(String::new());
            }
            rows.extend(wrapped.into_iter().map(|row| row.into_owned()));
        }
        lines.extend(rows.into_iter().map(|row| Line::from(format!("    {row}"))));
    }
    (lines, focus_line)
}

fn render_form(frame: &mut Frame, form: &Form) {
    let area = centered_rect(80, 85, frame.area());

    let block = Block::default()
        .title(format!(
            " {} · Tab/↑↓ fields, ←→ choices, Ctrl+S save, Esc cancel ",
            form.title()
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);

    let (lines, focus_line) = form_lines(form, usize::from(inner.width));
    let scroll = focus_line.saturating_sub(usize::from(inner.height) / 3);

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0)),
        area,
    );
}

fn render_picker(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 60, frame.area());

    let items: Vec<ListItem> = app
        .removed_projects
        .iter()
        .map(|t| {
            let when = t
                .created_at
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::raw(t.project.clone()),
                Span::styled(format!("  {when}"), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let title = if items.is_empty() {
        " Removed Projects · none (Esc to close) ".to_string()
    } else {
        format!(
            " Removed Projects ({}) · Enter restore, A restore all, D delete, Esc close ",
            items.len()
        )
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select((!app.removed_projects.is_empty()).then_some(app.picker_index));

    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_confirm(frame: &mut Frame, question: &str) {
    let area = centered_rect(50, 20, frame.area());

    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let text = vec![
        Line::from(question.to_string()),
        Line::default(),
        Line::from(Span::styled(
            "y to confirm, any other key to cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 80, frame.area());

    let help_text = vec![
        "",
        " Pages:",
        "   1-4 / Tab   Tracker, Report, Hearings, Guide",
        "   R           Reload data",
        "",
        " Tracker:",
        "   j / k       Move in project list",
        "   Enter       Select project (pins it to the top)",
        "   / c         Search name / county",
        "   s t y v     Cycle state / sentiment / type / survey filter",
        "   x           Clear filters",
        "   a e d u     Add project / edit survey / remove / removed list",
        "",
        " Maps:",
        "   + - wheel   Zoom",
        "   H J K L     Pan",
        "   n / N       Next / previous marker",
        "   b  C  0     Basemap, clustering, reset view",
        "   click       Select marker",
        "",
        " Hearings:",
        "   h / l       Previous / next topic",
        "   a e d       Add / edit / remove entry",
        "   r u D       Removed view / restore / delete permanently",
        "   o           Open first source link",
        "",
        " General:",
        "   ?           Toggle this help",
        "   q           Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::forms::{Form, STATE};

    #[test]
    fn popup_is_centered_inside_parent() {
        let parent = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(60, 20, parent);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.x, 20);
        assert!(popup.y >= 19 && popup.bottom() <= 31);
    }

    #[test]
    fn form_lines_track_focused_field_and_errors() {
        let mut form = Form::add_project();
        form.errors = vec!["County".to_string()];
        form.focus = form.fields.iter().position(|f| f.label == STATE).unwrap();
        let (lines, focus_line) = form_lines(&form, 40);
        // Error banner + blank, then two lines per single-line field.
        assert_eq!(focus_line, 4);
        assert!(lines[focus_line].to_string().contains(STATE));
    }

    #[test]
    fn long_answers_wrap_to_popup_width() {
        let mut form = Form::add_project();
        let last = form.fields.len() - 1;
        form.fields[last].value = "word ".repeat(40);
        form.focus = 0;
        let (narrow, _) = form_lines(&form, 30);
        let (wide, _) = form_lines(&form, 120);
        assert!(narrow.len() > wide.len());
    }
}
