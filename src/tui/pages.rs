use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::filter::survey_counts;
use crate::map::{intensity_legend, sentiment_color, sentiment_legend, MapEvent, BAD_COLOR, MIXED_COLOR};
use crate::models::{Project, QaEntry};
use crate::topics::{first_url, response_parts};
use crate::views::detail::{bold_spans, detail_sections, location_line, sentiment_badge, Section};

use super::map_view::render_map;

fn heading(text: &str, color: Color) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Renders `**bold**` markup with an optional prefix.
fn rich_line(prefix: &str, text: &str, style: Style) -> Line<'static> {
    let mut spans = vec![Span::styled(prefix.to_string(), style)];
    for (run, bold) in bold_spans(text) {
        let run_style = if bold { style.add_modifier(Modifier::BOLD) } else { style };
        spans.push(Span::styled(run, run_style));
    }
    Line::from(spans)
}

fn detail_lines(project: &Project) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            project.name.clone(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            location_line(project),
            Style::default().fg(Color::Gray),
        )),
    ];

    for section in detail_sections(project) {
        lines.push(Line::default());
        match &section {
            Section::Overview(rows) => {
                lines.push(heading(section.heading(), Color::Cyan));
                for (label, value) in rows {
                    let value_style = if *label == "Sentiment" {
                        Style::default().fg(sentiment_color(project.sentiment))
                    } else {
                        Style::default()
                    };
                    lines.push(Line::from(vec![
                        Span::styled(format!("{label}: "), Style::default().fg(Color::DarkGray)),
                        Span::styled(value.clone(), value_style),
                    ]));
                }
            }
            Section::SentimentDetail(items) => {
                lines.push(heading(section.heading(), Color::Cyan));
                for item in items {
                    lines.push(rich_line("• ", item, Style::default()));
                }
            }
            Section::Moratoria { text, warning } => {
                let (mark, color) = if *warning {
                    ("⚠ ", MIXED_COLOR)
                } else {
                    ("✓ ", Color::Blue)
                };
                lines.push(heading(&format!("{mark}{}", section.heading()), color));
                lines.push(rich_line("", text, Style::default().fg(color)));
            }
            Section::RecentProjects(items) => {
                lines.push(heading(section.heading(), Color::Cyan));
                for item in items {
                    match &item.header {
                        Some(header) => {
                            lines.push(Line::from(Span::styled(
                                header.clone(),
                                Style::default().add_modifier(Modifier::BOLD),
                            )));
                            lines.push(rich_line("  ", &item.text, Style::default()));
                        }
                        None => lines.push(rich_line("• ", &item.text, Style::default())),
                    }
                }
            }
            Section::Survey(answers) => {
                lines.push(heading(section.heading(), Color::Magenta));
                for (title, question, answer) in answers {
                    lines.push(Line::from(Span::styled(
                        title.to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(Span::styled(
                        question.to_string(),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                    for text in answer.lines() {
                        lines.push(rich_line("  ", text, Style::default()));
                    }
                }
            }
            Section::Notes(notes) => {
                lines.push(heading(section.heading(), Color::Cyan));
                for text in notes.lines() {
                    lines.push(rich_line("", text, Style::default()));
                }
            }
        }
    }
    lines
}

fn filter_lines(app: &App, shown: usize) -> Vec<Line<'static>> {
    let f = &app.filter;
    let dim = Style::default().fg(Color::DarkGray);
    let value = |v: Option<String>| v.unwrap_or_else(|| "All".to_string());
    vec![
        Line::from(vec![
            Span::styled("/ name: ", dim),
            Span::raw(f.name_query.clone()),
            Span::styled("  c county: ", dim),
            Span::raw(f.county_query.clone()),
        ]),
        Line::from(vec![
            Span::styled("s state: ", dim),
            Span::raw(value(f.state.clone())),
            Span::styled("  t sentiment: ", dim),
            Span::raw(value(f.sentiment.map(|s| s.label().to_string()))),
        ]),
        Line::from(vec![
            Span::styled("y type: ", dim),
            Span::raw(value(f.facility_type.clone())),
            Span::styled("  v survey: ", dim),
            Span::raw(f.survey.label()),
        ]),
        Line::from(Span::styled(
            format!(
                "Showing {shown} of {} projects ({})",
                app.table.projects.len(),
                f.summary()
            ),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(Span::styled(
            {
                let (with, without) = survey_counts(&app.table.projects);
                format!("Surveys: {with} with responses, {without} without")
            },
            dim,
        )),
    ]
}

pub fn render_tracker(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(28),
            Constraint::Percentage(42),
            Constraint::Percentage(30),
        ])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(columns[0]);

    let filtered = app.filtered();
    let filters = Paragraph::new(filter_lines(app, filtered.count))
        .block(Block::default().title(" Filters ").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(filters, left[0]);

    let listed = app.listed_projects();
    let items: Vec<ListItem> = listed
        .iter()
        .map(|p| {
            let selected = app.selected_project.as_deref() == Some(p.name.as_str());
            let name_style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} ", sentiment_badge(p.sentiment)),
                    Style::default().fg(sentiment_color(p.sentiment)),
                ),
                Span::styled(p.name.clone(), name_style),
                Span::styled(
                    format!("  {}", p.state.as_deref().unwrap_or("")),
                    Style::default().fg(Color::Blue),
                ),
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(" Projects ({} of {}) ", listed.len(), filtered.count))
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select((!listed.is_empty()).then_some(app.list_index));
    frame.render_stateful_widget(list, left[1], &mut state);

    let markers = app.tracker_markers();
    let selected = match &app.tracker_map.last_event {
        Some(MapEvent::ProjectSelected { project }) => Some(project.as_str()),
        _ => app.selected_project.as_deref(),
    };
    let canvas = render_map(
        frame,
        columns[1],
        "Project Map",
        &app.tracker_map,
        &markers,
        selected,
        &sentiment_legend(&filtered.rows),
    );
    app.tracker_map_area.set(canvas);

    let detail = match app.current_project() {
        Some(project) => detail_lines(project),
        None => vec![Line::from("No project matches the current filters.")],
    };
    let paragraph = Paragraph::new(detail)
        .block(
            Block::default()
                .title(" Details ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    frame.render_widget(paragraph, columns[2]);
}

fn tally_lines<K: std::fmt::Display>(title: &str, counts: impl IntoIterator<Item = (K, usize)>) -> Vec<Line<'static>> {
    let mut lines = vec![Line::default(), heading(title, Color::Cyan)];
    lines.extend(
        counts
            .into_iter()
            .map(|(k, n)| Line::from(format!("  {k}: {n}"))),
    );
    lines
}

pub fn render_report(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(28),
            Constraint::Percentage(42),
            Constraint::Percentage(30),
        ])
        .split(area);

    let report = &app.report;
    let mut overview = Vec::new();
    if let Some(error) = &app.report_error {
        overview.push(Line::from(Span::styled(error.clone(), Style::default().fg(BAD_COLOR))));
    }
    let summary = report.summary();
    overview.extend([
        Line::from(format!("States with opposition: {}", summary.states_with_opposition)),
        Line::from(format!("Contested projects: {}", summary.contested_projects)),
        Line::from(format!("Restrictions: {}", summary.restrictions)),
        Line::from(format!(
            "Litigation: {} ({:.1}%)",
            summary.litigation_count, summary.litigation_pct
        )),
        Line::from(format!("Cancellation rate: {:.1}%", summary.cancellation_pct)),
        Line::from(format!(
            "Average capacity: {}",
            summary
                .average_capacity_mw
                .map_or_else(|| "N/A".to_string(), |mw| format!("{mw:.0} MW"))
        )),
    ]);
    overview.extend(tally_lines("Contested by type", report.contested_by_type()));
    overview.extend(tally_lines("Contested by status", report.contested_by_status()));
    overview.extend(tally_lines("Restrictions by type", report.restrictions_by_type()));
    overview.extend(tally_lines("Cancellations by year", report.cancellations_by_year()));
    overview.extend(tally_lines("Restrictions by year", report.restrictions_by_year()));
    frame.render_widget(
        Paragraph::new(overview)
            .block(Block::default().title(" 2025 Overview ").borders(Borders::ALL))
            .wrap(Wrap { trim: true }),
        columns[0],
    );

    let states = app.report_states();
    let markers = app.report_markers();
    let selected = app.report_state();
    let canvas = render_map(
        frame,
        columns[1],
        "Opposition Intensity",
        &app.report_map,
        &markers,
        selected.as_deref(),
        &intensity_legend(&states),
    );
    app.report_map_area.set(canvas);

    let mut lines = Vec::new();
    if !app.report_view.county_query.trim().is_empty() {
        let found = report.search_counties(&app.report_view.county_query);
        lines.push(heading(
            &format!("Counties matching \"{}\": {}", app.report_view.county_query.trim(), found.len()),
            Color::Yellow,
        ));
        lines.extend(found.iter().take(8).map(|(c, s)| Line::from(format!("  {c}, {s}"))));
        lines.push(Line::default());
    }

    match selected.as_deref().and_then(|s| states.iter().find(|o| o.state == s)) {
        Some(state) => {
            let county = app.report_view.county.as_deref();
            lines.push(heading(
                &format!(
                    "{}: {} restrictions, {} contested projects",
                    state.state, state.restrictions, state.projects
                ),
                Color::Cyan,
            ));
            lines.push(Line::from(Span::styled(
                format!("◀ h  {}  l ▶", county.unwrap_or("All counties")),
                Style::default().fg(Color::DarkGray),
            )));

            let detail = report.county_detail(&state.state, county);
            if detail.restrictions.is_empty() && detail.projects.is_empty() {
                lines.push(Line::from(Span::styled(
                    "No opposition data found in the 2025 report",
                    Style::default().fg(BAD_COLOR),
                )));
            }
            if !detail.restrictions.is_empty() {
                lines.push(Line::default());
                lines.push(heading("Restrictions", MIXED_COLOR));
                for r in &detail.restrictions {
                    lines.push(Line::from(Span::styled(
                        r.title.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(format!(
                        "  {} · {} · {}",
                        r.restriction_type.as_deref().unwrap_or("N/A"),
                        r.status.as_deref().unwrap_or("N/A"),
                        r.year_adopted.map_or_else(|| "N/A".to_string(), |y| format!("{y:.0}"))
                    )));
                }
            }
            if !detail.projects.is_empty() {
                lines.push(Line::default());
                lines.push(heading("Contested projects", BAD_COLOR));
                for p in &detail.projects {
                    lines.push(Line::from(Span::styled(
                        p.title.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(format!(
                        "  {} · {} · {} · litigation: {}",
                        p.project_type.as_deref().unwrap_or("N/A"),
                        p.status.as_deref().unwrap_or("N/A"),
                        p.capacity.as_deref().unwrap_or("N/A"),
                        if p.has_litigation() { "yes" } else { "no" }
                    )));
                }
            }
        }
        None => lines.push(Line::from("No state selected.")),
    }

    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .title(" State Detail ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Green)),
            )
            .wrap(Wrap { trim: false }),
        columns[2],
    );
}

fn entry_lines(entry: &QaEntry) -> Vec<Line<'static>> {
    let (lead, bullets) = response_parts(&entry.response);
    let mut lines = vec![
        Line::from(Span::styled(
            format!("#{} · {}", entry.id, entry.topic_label()),
            Style::default().fg(Color::DarkGray),
        )),
        heading("Concern / Question", Color::Cyan),
        rich_line("", &entry.question, Style::default()),
        Line::default(),
        heading("Response", Color::Cyan),
    ];
    if !lead.is_empty() {
        lines.push(rich_line("", &lead, Style::default()));
    }
    for bullet in bullets {
        lines.push(rich_line("• ", &bullet, Style::default()));
    }
    if let Some(sources) = entry.sources.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(Line::default());
        lines.push(heading("Sources", Color::Cyan));
        lines.extend(sources.lines().map(|l| Line::from(l.to_string())));
        if let Some(url) = first_url(sources) {
            lines.push(Line::from(Span::styled(
                format!("o: open {url}"),
                Style::default().fg(Color::Blue),
            )));
        }
    }
    lines
}

pub fn render_hearings(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);

    let groups = app.hearing_groups();
    let total: usize = groups.iter().map(|g| g.count()).sum();
    let mut topics = vec![ListItem::new(format!("All topics ({total})"))];
    topics.extend(
        groups
            .iter()
            .map(|g| ListItem::new(format!("{} ({})", g.topic, g.count()))),
    );
    let view = if app.hearings.show_removed { "Removed" } else { "Active" };
    let topic_list = List::new(topics)
        .block(
            Block::default()
                .title(format!(" Topics · {view} "))
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut topic_state = ListState::default();
    topic_state.select(Some(app.hearings.topic_index));
    frame.render_stateful_widget(topic_list, columns[0], &mut topic_state);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(columns[1]);

    let entries = app.hearing_entries();
    let items: Vec<ListItem> = entries
        .iter()
        .map(|e| ListItem::new(e.question_preview(100)))
        .collect();
    let query = if app.hearings.query.trim().is_empty() {
        String::new()
    } else {
        format!(" matching \"{}\"", app.hearings.query.trim())
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(" {} entries{query} ", entries.len()))
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select((!entries.is_empty()).then_some(app.hearings.entry_index));
    frame.render_stateful_widget(list, right[0], &mut state);

    let body = match app.current_entry() {
        Some(entry) => entry_lines(entry),
        None if app.hearings.show_removed => vec![Line::from("No removed Q&A entries.")],
        None => vec![Line::from("No Q&A entries yet. Press 'a' to add one.")],
    };
    frame.render_widget(
        Paragraph::new(body)
            .block(
                Block::default()
                    .title(" Response ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Magenta)),
            )
            .wrap(Wrap { trim: false }),
        right[1],
    );
}

const GUIDE: &str = "\
Opposition Tracker
  Browse every project on the map and in the list. Filters compose: a project
  has to match all of them. Press Enter (or click a marker, or n/N) to pin a
  project to the top of the list and show its details.
  a adds a project. Sentiment, moratoria and recent projects are filled in
  from the county report for its state when one is available.
  e opens the survey for the current project. Saving a survey for a baseline
  project copies it into the record store with the answers.
  d removes a project from every view; u lists removed projects, where Enter
  restores one, A restores all and D permanently deletes a user-added one.

2025 Opposition Report
  State and local restrictions and contested projects from the 2025 report.
  j/k pick a state, h/l step through its counties, c searches counties.
  Marker colour shows opposition intensity relative to the busiest state.

Public Hearings Resources
  Questions raised at public hearings with prepared responses, grouped by
  topic. h/l change topic, / searches, a adds and e edits an entry.
  d removes an entry; r switches to removed entries where u restores and
  D deletes permanently after confirmation. o opens the first source link.

Maps
  +/- or the mouse wheel zoom, H/J/K/L pan, b changes the basemap, C toggles
  clustering (click a cluster to zoom into it) and 0 resets the view.

Data
  The baseline workbook, report CSVs and county reports are read from the
  data directory in the config file. Records are kept in the hosted store
  when SUPABASE_URL and SUPABASE_KEY are set, otherwise in a local database.
  R reloads everything.";

pub fn render_guide(frame: &mut Frame, app: &App, area: Rect) {
    let paragraph = Paragraph::new(GUIDE)
        .block(Block::default().title(" User Guide ").borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .scroll((app.guide_scroll, 0));
    frame.render_widget(paragraph, area);
}
