use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Map, Points},
        Block, Borders, Paragraph,
    },
    Frame,
};

use crate::map::{cluster_markers, LegendEntry, MapState, Marker};

/// Draws the map with its legend and returns the inner canvas area, which
/// is what mouse clicks are resolved against.
pub fn render_map(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    state: &MapState,
    markers: &[Marker],
    selected: Option<&str>,
    legend: &[LegendEntry],
) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let style = state.basemap.style();
    let viewport = state.viewport;
    let clusters = state
        .clustered
        .then(|| cluster_markers(markers, viewport.cluster_cell()));

    let block = Block::default()
        .title(format!(
            " {title} [{}{}] zoom {} ",
            state.basemap.label(),
            if state.clustered { ", clustered" } else { "" },
            viewport.zoom
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(chunks[0]);

    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .background_color(style.background)
        .x_bounds(viewport.x_bounds())
        .y_bounds(viewport.y_bounds())
        .paint(|ctx| {
            ctx.draw(&Map {
                resolution: style.resolution,
                color: style.land,
            });
            ctx.layer();

            match &clusters {
                Some(clusters) => {
                    for cluster in clusters {
                        if cluster.members.len() == 1 {
                            ctx.draw(&Points {
                                coords: &[(cluster.lon, cluster.lat)],
                                color: cluster.color,
                            });
                        } else {
                            ctx.print(
                                cluster.lon,
                                cluster.lat,
                                Span::styled(
                                    format!("({})", cluster.members.len()),
                                    Style::default()
                                        .fg(cluster.color)
                                        .add_modifier(Modifier::BOLD),
                                ),
                            );
                        }
                    }
                }
                None => {
                    for marker in markers {
                        ctx.print(
                            marker.lon,
                            marker.lat,
                            Span::styled("●", Style::default().fg(marker.color)),
                        );
                    }
                }
            }

            if let Some(marker) = selected.and_then(|id| markers.iter().find(|m| m.id == id)) {
                ctx.print(
                    marker.lon,
                    marker.lat,
                    Span::styled(
                        format!("◉ {}", marker.tooltip),
                        Style::default()
                            .fg(Color::White)
                            .bg(marker.color)
                            .add_modifier(Modifier::BOLD),
                    ),
                );
            }
        });
    frame.render_widget(canvas, chunks[0]);

    let mut spans = vec![Span::raw(" ")];
    for entry in legend {
        spans.push(Span::styled("■ ", Style::default().fg(entry.color)));
        spans.push(Span::raw(format!("{} ({})  ", entry.label, entry.count)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);

    inner
}
