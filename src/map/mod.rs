//! Map model: marker colours, clustering, viewport and hit testing. The
//! canvas drawing itself lives in `tui::map_view`.

use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::canvas::MapResolution;

use crate::models::{Project, Sentiment};
use crate::report::{state_centroid, StateOpposition};

pub const GOOD_COLOR: Color = Color::Rgb(0x2e, 0xcc, 0x71);
pub const MIXED_COLOR: Color = Color::Rgb(0xf3, 0x9c, 0x12);
pub const BAD_COLOR: Color = Color::Rgb(0xe7, 0x4c, 0x3c);
pub const NO_DATA_COLOR: Color = Color::Rgb(0x95, 0xa5, 0xa6);

pub fn sentiment_color(sentiment: Sentiment) -> Color {
    match sentiment {
        Sentiment::Good => GOOD_COLOR,
        Sentiment::Mixed => MIXED_COLOR,
        Sentiment::Bad => BAD_COLOR,
        Sentiment::NoData => NO_DATA_COLOR,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Basemap {
    #[default]
    DarkGray,
    Satellite,
    Topographic,
    Streets,
    Oceans,
}

/// How a basemap is drawn on the terminal canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasemapStyle {
    pub resolution: MapResolution,
    pub land: Color,
    pub background: Color,
}

impl Basemap {
    pub const ALL: [Basemap; 5] = [
        Basemap::DarkGray,
        Basemap::Satellite,
        Basemap::Topographic,
        Basemap::Streets,
        Basemap::Oceans,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Basemap::DarkGray => "Dark Gray",
            Basemap::Satellite => "Satellite",
            Basemap::Topographic => "Topographic",
            Basemap::Streets => "Streets",
            Basemap::Oceans => "Oceans",
        }
    }

    pub fn cycle(&self) -> Self {
        let i = Self::ALL.iter().position(|b| b == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn style(&self) -> BasemapStyle {
        match self {
            Basemap::DarkGray => BasemapStyle {
                resolution: MapResolution::High,
                land: Color::DarkGray,
                background: Color::Black,
            },
            Basemap::Satellite => BasemapStyle {
                resolution: MapResolution::High,
                land: Color::Rgb(0x5b, 0x6e, 0x3a),
                background: Color::Rgb(0x0b, 0x1a, 0x2e),
            },
            Basemap::Topographic => BasemapStyle {
                resolution: MapResolution::High,
                land: Color::Rgb(0xb8, 0x9b, 0x6d),
                background: Color::Rgb(0x1e, 0x2a, 0x1e),
            },
            Basemap::Streets => BasemapStyle {
                resolution: MapResolution::Low,
                land: Color::Gray,
                background: Color::Rgb(0x20, 0x20, 0x20),
            },
            Basemap::Oceans => BasemapStyle {
                resolution: MapResolution::Low,
                land: Color::Rgb(0x9a, 0xb8, 0xc8),
                background: Color::Rgb(0x0a, 0x2a, 0x4a),
            },
        }
    }
}

/// Opposition intensity bands for the report's state map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntensityLevel {
    Low,
    Medium,
    High,
}

impl IntensityLevel {
    pub const ALL: [IntensityLevel; 3] = [
        IntensityLevel::Low,
        IntensityLevel::Medium,
        IntensityLevel::High,
    ];

    pub fn from_intensity(intensity: f64) -> Self {
        if intensity < 0.33 {
            IntensityLevel::Low
        } else if intensity < 0.66 {
            IntensityLevel::Medium
        } else {
            IntensityLevel::High
        }
    }

    pub fn color(&self) -> Color {
        match self {
            IntensityLevel::Low => Color::Green,
            IntensityLevel::Medium => Color::Rgb(0xff, 0xa5, 0x00),
            IntensityLevel::High => Color::Red,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IntensityLevel::Low => "Low",
            IntensityLevel::Medium => "Medium",
            IntensityLevel::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Project name or state code.
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub color: Color,
    /// "<name> - <category>"
    pub tooltip: String,
}

/// One marker per row with usable coordinates.
pub fn project_markers(rows: &[&Project]) -> Vec<Marker> {
    rows.iter()
        .filter_map(|p| {
            let (lat, lon) = p.coordinates()?;
            Some(Marker {
                id: p.name.clone(),
                lat,
                lon,
                color: sentiment_color(p.sentiment),
                tooltip: format!("{} - {}", p.name, p.sentiment),
            })
        })
        .collect()
}

pub fn state_markers(states: &[StateOpposition]) -> Vec<Marker> {
    states
        .iter()
        .filter_map(|s| {
            let (lat, lon) = state_centroid(&s.state)?;
            let level = IntensityLevel::from_intensity(s.intensity);
            Some(Marker {
                id: s.state.clone(),
                lat,
                lon,
                color: level.color(),
                tooltip: format!("{} - {} opposition", s.state, level.label()),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub lat: f64,
    pub lon: f64,
    /// Indices into the marker slice.
    pub members: Vec<usize>,
    pub color: Color,
}

/// Buckets markers into a grid of `cell_deg` degrees. Each cluster sits at
/// its members' centroid and takes the most common member colour.
pub fn cluster_markers(markers: &[Marker], cell_deg: f64) -> Vec<Cluster> {
    use std::collections::BTreeMap;

    let cell_deg = if cell_deg > 0.0 { cell_deg } else { 1.0 };
    let mut cells: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
    for (i, m) in markers.iter().enumerate() {
        let key = (
            (m.lat / cell_deg).floor() as i64,
            (m.lon / cell_deg).floor() as i64,
        );
        cells.entry(key).or_default().push(i);
    }

    cells
        .into_values()
        .map(|members| {
            let n = members.len() as f64;
            let lat = members.iter().map(|&i| markers[i].lat).sum::<f64>() / n;
            let lon = members.iter().map(|&i| markers[i].lon).sum::<f64>() / n;

            let mut tally: Vec<(Color, usize)> = Vec::new();
            for &i in &members {
                match tally.iter_mut().find(|(c, _)| *c == markers[i].color) {
                    Some((_, count)) => *count += 1,
                    None => tally.push((markers[i].color, 1)),
                }
            }
            // First colour seen wins ties.
            let color = tally
                .iter()
                .fold(None::<(Color, usize)>, |best, &(c, n)| match best {
                    Some((_, bn)) if bn >= n => best,
                    _ => Some((c, n)),
                })
                .map(|(c, _)| c)
                .unwrap_or(NO_DATA_COLOR);

            Cluster {
                lat,
                lon,
                members,
                color,
            }
        })
        .collect()
}

const US_CENTER: (f64, f64) = (39.8283, -98.5795);
const DEFAULT_ZOOM: u8 = 4;
const MIN_ZOOM: u8 = 1;
const MAX_ZOOM: u8 = 10;

/// Visible window in degrees. At zoom 4 it spans 60° of longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center_lat: US_CENTER.0,
            center_lon: US_CENTER.1,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl Viewport {
    pub fn lon_span(&self) -> f64 {
        960.0 / f64::from(1u32 << self.zoom)
    }

    pub fn lat_span(&self) -> f64 {
        self.lon_span() / 2.0
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        let half = self.lon_span() / 2.0;
        [self.center_lon - half, self.center_lon + half]
    }

    pub fn y_bounds(&self) -> [f64; 2] {
        let half = self.lat_span() / 2.0;
        [self.center_lat - half, self.center_lat + half]
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + 1).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.saturating_sub(1).max(MIN_ZOOM);
    }

    /// Moves by an eighth of the visible span per step.
    pub fn pan(&mut self, east_steps: i32, north_steps: i32) {
        self.center_lon =
            (self.center_lon + f64::from(east_steps) * self.lon_span() / 8.0).clamp(-180.0, 180.0);
        self.center_lat =
            (self.center_lat + f64::from(north_steps) * self.lat_span() / 8.0).clamp(-90.0, 90.0);
    }

    pub fn center_on(&mut self, lat: f64, lon: f64) {
        self.center_lat = lat.clamp(-90.0, 90.0);
        self.center_lon = lon.clamp(-180.0, 180.0);
    }

    /// Grid size used for clustering at this zoom.
    pub fn cluster_cell(&self) -> f64 {
        self.lon_span() / 24.0
    }

    fn contains(&self, lat: f64, lon: f64) -> bool {
        let [x0, x1] = self.x_bounds();
        let [y0, y1] = self.y_bounds();
        (x0..=x1).contains(&lon) && (y0..=y1).contains(&lat)
    }

    /// Geographic position of the centre of a terminal cell inside `area`.
    pub fn cell_to_geo(&self, area: Rect, column: u16, row: u16) -> Option<(f64, f64)> {
        if area.width == 0
            || area.height == 0
            || column < area.x
            || row < area.y
            || column >= area.x + area.width
            || row >= area.y + area.height
        {
            return None;
        }
        let [x0, _] = self.x_bounds();
        let [_, y1] = self.y_bounds();
        let fx = (f64::from(column - area.x) + 0.5) / f64::from(area.width);
        let fy = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
        Some((y1 - fy * self.lat_span(), x0 + fx * self.lon_span()))
    }
}

/// Nearest point to a clicked cell, within about one and a half cells.
pub fn hit_test<I>(viewport: &Viewport, area: Rect, column: u16, row: u16, points: I) -> Option<usize>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (lat, lon) = viewport.cell_to_geo(area, column, row)?;
    let cell_w = viewport.lon_span() / f64::from(area.width);
    let cell_h = viewport.lat_span() / f64::from(area.height);

    points
        .into_iter()
        .enumerate()
        .filter(|(_, (plat, plon))| viewport.contains(*plat, *plon))
        .map(|(i, (plat, plon))| {
            let dx = (plon - lon) / cell_w;
            let dy = (plat - lat) / cell_h;
            (i, (dx * dx + dy * dy).sqrt())
        })
        .filter(|(_, d)| *d <= 1.5)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Structured selection emitted by the maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapEvent {
    ProjectSelected { project: String },
    StateSelected { state: String },
}

/// Interactive state of one map widget.
#[derive(Debug, Clone, Default)]
pub struct MapState {
    pub basemap: Basemap,
    pub clustered: bool,
    pub viewport: Viewport,
    /// Index into the current marker list for keyboard cycling.
    pub focus: Option<usize>,
    pub last_event: Option<MapEvent>,
}

impl MapState {
    pub fn reset_view(&mut self) {
        self.viewport = Viewport::default();
    }

    fn event_for(marker: &Marker, projects: bool) -> MapEvent {
        if projects {
            MapEvent::ProjectSelected {
                project: marker.id.clone(),
            }
        } else {
            MapEvent::StateSelected {
                state: marker.id.clone(),
            }
        }
    }

    /// Focuses the next (or previous) marker, centres on it and emits its event.
    pub fn cycle_focus(&mut self, markers: &[Marker], forward: bool, projects: bool) -> Option<MapEvent> {
        if markers.is_empty() {
            self.focus = None;
            return None;
        }
        let len = markers.len();
        let next = match (self.focus, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        self.focus = Some(next);
        let marker = &markers[next];
        self.viewport.center_on(marker.lat, marker.lon);
        let event = Self::event_for(marker, projects);
        self.last_event = Some(event.clone());
        Some(event)
    }

    /// Resolves a mouse click. With clustering on, clicking a multi-member
    /// cluster zooms into it instead of selecting.
    pub fn click(
        &mut self,
        area: Rect,
        column: u16,
        row: u16,
        markers: &[Marker],
        projects: bool,
    ) -> Option<MapEvent> {
        let index = if self.clustered {
            let clusters = cluster_markers(markers, self.viewport.cluster_cell());
            let hit = hit_test(
                &self.viewport,
                area,
                column,
                row,
                clusters.iter().map(|c| (c.lat, c.lon)),
            )?;
            let cluster = &clusters[hit];
            if cluster.members.len() > 1 {
                self.viewport.center_on(cluster.lat, cluster.lon);
                self.viewport.zoom_in();
                return None;
            }
            cluster.members[0]
        } else {
            hit_test(
                &self.viewport,
                area,
                column,
                row,
                markers.iter().map(|m| (m.lat, m.lon)),
            )?
        };

        self.focus = Some(index);
        let event = Self::event_for(&markers[index], projects);
        tracing::debug!("Map click selected {:?}", event);
        self.last_event = Some(event.clone());
        Some(event)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: Color,
    pub count: usize,
}

pub fn sentiment_legend(rows: &[&Project]) -> Vec<LegendEntry> {
    Sentiment::ALL
        .iter()
        .map(|&s| LegendEntry {
            label: s.label(),
            color: sentiment_color(s),
            count: rows.iter().filter(|p| p.sentiment == s).count(),
        })
        .collect()
}

pub fn intensity_legend(states: &[StateOpposition]) -> Vec<LegendEntry> {
    IntensityLevel::ALL
        .iter()
        .map(|&level| LegendEntry {
            label: level.label(),
            color: level.color(),
            count: states
                .iter()
                .filter(|s| IntensityLevel::from_intensity(s.intensity) == level)
                .count(),
        })
        .collect()
}
