use std::cell::Cell;
use std::path::Path;

use ratatui::layout::Rect;

use crate::config::Config;
use crate::dataset::{write_csv, Dataset, UnifiedTable};
use crate::db::LocalStore;
use crate::error::Result;
use crate::filter::{self, cycle_option, display_order, FilterOptions, FilterResult, ProjectFilter};
use crate::map::{project_markers, state_markers, MapEvent, MapState, Marker};
use crate::models::{Notice, Project, QaEntry, QaScope, Sentiment, Tombstone};
use crate::report::{OppositionReport, StateOpposition};
use crate::services::{county_sentiment, CountySentiment, SupabaseStore};
use crate::store::{RecordStore, StoreAdapter, WriteOutcome};
use crate::topics::{first_url, group_by_topic, search, topic_catalog, TopicGroup};
use crate::tui::AppAction;
use crate::views::{Form, FormKind, ProjectDraft, QaDraft};

const MAX_NOTICES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Tracker,
    Report,
    Hearings,
    Guide,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Tracker, Page::Report, Page::Hearings, Page::Guide];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Tracker => "Opposition Tracker",
            Page::Report => "2025 Opposition Report",
            Page::Hearings => "Public Hearings Resources",
            Page::Guide => "User Guide",
        }
    }

    fn index(&self) -> usize {
        Page::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Page::ALL[(self.index() + 1) % Page::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        Page::ALL[(self.index() + Page::ALL.len() - 1) % Page::ALL.len()]
    }
}

/// What a single-line prompt edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    ProjectName,
    County,
    QaSearch,
    ReportCounty,
}

impl PromptKind {
    pub fn label(&self) -> &'static str {
        match self {
            PromptKind::ProjectName => "Search project name",
            PromptKind::County => "Search county",
            PromptKind::QaSearch => "Search questions and responses",
            PromptKind::ReportCounty => "Search county in the 2025 report",
        }
    }
}

/// Destructive operations waiting for a second keypress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    DeleteUserProject(String),
    DeleteQa(i64),
}

impl Pending {
    pub fn question(&self) -> String {
        match self {
            Pending::DeleteUserProject(name) => format!("Permanently delete '{name}'? This cannot be undone."),
            Pending::DeleteQa(id) => format!("Permanently delete Q&A #{id}? This cannot be undone."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Help,
    Prompt(PromptKind),
    Form,
    /// Removed-projects list on the tracker page.
    Picker,
    Confirm(Pending),
}

#[derive(Debug, Clone, Default)]
pub struct HearingsView {
    /// 0 is "all topics"; otherwise an index into the topic groups plus one.
    pub topic_index: usize,
    pub entry_index: usize,
    pub query: String,
    pub show_removed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReportView {
    pub state_index: usize,
    pub county: Option<String>,
    pub county_query: String,
}

pub struct App {
    // Data
    pub table: UnifiedTable,
    pub removed_projects: Vec<Tombstone>,
    pub qa_active: Vec<QaEntry>,
    pub qa_removed: Vec<QaEntry>,
    pub report: OppositionReport,
    pub report_error: Option<String>,

    // UI State
    pub page: Page,
    pub mode: InputMode,
    pub filter: ProjectFilter,
    pub filter_options: FilterOptions,
    pub list_index: usize,
    pub selected_project: Option<String>,
    pub detail_scroll: u16,
    pub tracker_map: MapState,
    pub report_map: MapState,
    pub report_view: ReportView,
    pub hearings: HearingsView,
    pub guide_scroll: u16,
    pub prompt: String,
    pub form: Option<Form>,
    pub picker_index: usize,
    pub notices: Vec<Notice>,
    /// Screen areas of the two maps from the last draw, for mouse hit tests.
    pub tracker_map_area: Cell<Rect>,
    pub report_map_area: Cell<Rect>,

    // Services
    config: Config,
    store: StoreAdapter,
    dataset: Dataset,
}

/// Hosted store when credentials are configured, local database otherwise.
async fn open_store(config: &Config) -> Result<Box<dyn RecordStore>> {
    match config.hosted_credentials() {
        Some((url, key)) => {
            tracing::info!("Using hosted record store at {}", url);
            Ok(Box::new(SupabaseStore::new(url, key)?))
        }
        None => {
            tracing::info!("No hosted credentials; using local store {}", config.db_path);
            Ok(Box::new(LocalStore::open(&config.db_path).await?))
        }
    }
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let store = open_store(config).await?;
        Ok(Self::with_store(config, store).await)
    }

    pub async fn with_store(config: &Config, store: Box<dyn RecordStore>) -> Self {
        let (report, report_error) = match OppositionReport::load(config) {
            Ok(report) => (report, None),
            Err(e) => {
                tracing::warn!("Opposition report unavailable: {}", e);
                (
                    OppositionReport::default(),
                    Some(format!(
                        "Unable to load '{}' and '{}': {e}",
                        config.restrictions_csv, config.contested_csv
                    )),
                )
            }
        };

        let mut app = Self {
            table: UnifiedTable {
                projects: Vec::new(),
                source: None,
                notices: Vec::new(),
            },
            removed_projects: Vec::new(),
            qa_active: Vec::new(),
            qa_removed: Vec::new(),
            report,
            report_error,
            page: Page::default(),
            mode: InputMode::default(),
            filter: ProjectFilter::default(),
            filter_options: FilterOptions::default(),
            list_index: 0,
            selected_project: None,
            detail_scroll: 0,
            tracker_map: MapState::default(),
            report_map: MapState::default(),
            report_view: ReportView::default(),
            hearings: HearingsView::default(),
            guide_scroll: 0,
            prompt: String::new(),
            form: None,
            picker_index: 0,
            notices: Vec::new(),
            tracker_map_area: Cell::new(Rect::default()),
            report_map_area: Cell::new(Rect::default()),
            config: config.clone(),
            store: StoreAdapter::new(store),
            dataset: Dataset::new(config),
        };
        app.reload().await;
        app
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
        if self.notices.len() > MAX_NOTICES {
            self.notices.remove(0);
        }
    }

    /// Re-reads everything the views show. Read failures become notices.
    pub async fn reload(&mut self) {
        self.table = self.dataset.load(&self.store).await;
        for notice in self.table.notices.clone() {
            self.notify(notice);
        }
        self.filter_options = filter::options(&self.table.projects);

        let (removed, active, removed_qa) = futures::join!(
            self.store.removed_projects(),
            self.store.qa(QaScope::Active),
            self.store.qa(QaScope::Removed),
        );
        self.removed_projects = removed.rows;
        for error in [removed.error, active.error, removed_qa.error].into_iter().flatten() {
            self.notify(Notice::Error(error));
        }
        self.qa_active = active.rows;
        self.qa_removed = removed_qa.rows;

        if let Some(name) = &self.selected_project {
            if self.table.find(name).is_none() {
                self.selected_project = None;
            }
        }
        self.clamp_selections();
    }

    fn clamp_selections(&mut self) {
        let listed = self.listed_projects().len();
        self.list_index = self.list_index.min(listed.saturating_sub(1));
        self.picker_index = self
            .picker_index
            .min(self.removed_projects.len().saturating_sub(1));
        let groups = self.hearing_groups().len();
        self.hearings.topic_index = self.hearings.topic_index.min(groups);
        let entries = self.hearing_entries().len();
        self.hearings.entry_index = self.hearings.entry_index.min(entries.saturating_sub(1));
    }

    // Tracker

    pub fn filtered(&self) -> FilterResult<'_> {
        self.filter.apply(&self.table.projects)
    }

    /// Rows listed next to the map: the selected project first.
    pub fn listed_projects(&self) -> Vec<&Project> {
        display_order(&self.filtered().rows, self.selected_project.as_deref())
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.listed_projects().get(self.list_index).copied()
    }

    pub fn tracker_markers(&self) -> Vec<Marker> {
        project_markers(&self.filtered().rows)
    }

    fn filters_changed(&mut self) {
        self.list_index = 0;
        self.detail_scroll = 0;
        self.tracker_map.focus = None;
    }

    fn select_project(&mut self, name: String) {
        if let Some((lat, lon)) = self.table.find(&name).and_then(Project::coordinates) {
            self.tracker_map.viewport.center_on(lat, lon);
        }
        self.selected_project = Some(name);
        self.list_index = 0;
        self.detail_scroll = 0;
    }

    // Report

    pub fn report_states(&self) -> Vec<StateOpposition> {
        self.report.state_counts()
    }

    pub fn report_state(&self) -> Option<String> {
        self.report_states()
            .get(self.report_view.state_index)
            .map(|s| s.state.clone())
    }

    pub fn report_markers(&self) -> Vec<Marker> {
        state_markers(&self.report_states())
    }

    fn select_report_state(&mut self, state: &str) {
        if let Some(index) = self.report_states().iter().position(|s| s.state == state) {
            self.report_view.state_index = index;
            self.report_view.county = None;
        }
    }

    fn cycle_report_county(&mut self, forward: bool) {
        let Some(state) = self.report_state() else {
            return;
        };
        let counties = self.report.counties_in(&state);
        self.report_view.county = if forward {
            cycle_option(&self.report_view.county, &counties)
        } else {
            let reversed: Vec<String> = counties.into_iter().rev().collect();
            cycle_option(&self.report_view.county, &reversed)
        };
    }

    // Hearings

    fn hearing_source(&self) -> &[QaEntry] {
        if self.hearings.show_removed {
            &self.qa_removed
        } else {
            &self.qa_active
        }
    }

    pub fn hearing_groups(&self) -> Vec<TopicGroup<'_>> {
        group_by_topic(self.hearing_source())
    }

    pub fn hearing_topic(&self) -> Option<String> {
        let index = self.hearings.topic_index.checked_sub(1)?;
        self.hearing_groups().get(index).map(|g| g.topic.clone())
    }

    /// Entries of the selected topic matching the search query.
    pub fn hearing_entries(&self) -> Vec<&QaEntry> {
        let topic = self.hearing_topic();
        search(self.hearing_source(), &self.hearings.query, None)
            .into_iter()
            .filter(|e| topic.as_deref().map_or(true, |t| e.topic_label() == t))
            .collect()
    }

    pub fn current_entry(&self) -> Option<&QaEntry> {
        self.hearing_entries().get(self.hearings.entry_index).copied()
    }

    // Headless

    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let file = std::fs::File::create(path)?;
        write_csv(&self.table.projects, file)?;
        Ok(self.table.projects.len())
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let projects = &self.table.projects;
        let (with_survey, without_survey) = filter::survey_counts(projects);
        let mut lines = vec![
            format!(
                "Baseline: {}",
                self.table
                    .source
                    .as_ref()
                    .map_or_else(|| "unavailable".to_string(), |s| s.describe())
            ),
            format!("Record store: {}", self.backend_name()),
            format!(
                "Projects: {} across {} states ({} removed)",
                projects.len(),
                self.filter_options.states.len(),
                self.removed_projects.len()
            ),
        ];
        for sentiment in Sentiment::ALL {
            let count = projects.iter().filter(|p| p.sentiment == sentiment).count();
            lines.push(format!("  {sentiment}: {count}"));
        }
        lines.push(format!(
            "Surveys: {with_survey} with responses, {without_survey} without"
        ));
        lines.push(format!(
            "Public hearing Q&A: {} active, {} removed, {} topics",
            self.qa_active.len(),
            self.qa_removed.len(),
            group_by_topic(&self.qa_active).len()
        ));
        let summary = self.report.summary();
        lines.push(format!(
            "2025 report: {} restrictions, {} contested projects, {} states",
            summary.restrictions, summary.contested_projects, summary.states_with_opposition
        ));
        lines.extend(self.notices.iter().map(|n| format!("! {}", n.message())));
        lines
    }

    // Writes

    /// Successful writes invalidate the baseline cache and reload.
    async fn finish_write(&mut self, outcome: WriteOutcome) -> bool {
        if outcome.ok {
            self.notify(Notice::Success(outcome.message));
            self.dataset.invalidate();
            self.reload().await;
            true
        } else {
            self.notify(Notice::Error(outcome.message));
            false
        }
    }

    fn county_enrichment(&self, state: &str, county: &str) -> Option<CountySentiment> {
        let dir = self.config.data_path(&self.config.county_reports_dir);
        match county_sentiment(&dir, state, county) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("County sentiment lookup failed for {}, {}: {}", county, state, e);
                None
            }
        }
    }

    fn reject_form(&mut self, mut form: Form, missing: Vec<String>) {
        self.notify(Notice::Error(format!(
            "Please fill in all required fields: {}",
            missing.join(", ")
        )));
        form.errors = missing;
        self.form = Some(form);
    }

    async fn submit_form(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };

        let kind = form.kind.clone();
        let outcome = match kind {
            FormKind::AddProject => {
                let draft = ProjectDraft::from_form(&form);
                let missing = draft.missing_fields();
                if !missing.is_empty() {
                    return self.reject_form(form, missing);
                }
                if self.table.find(&draft.name).is_some() {
                    self.notify(Notice::Error(format!(
                        "A project named '{}' already exists",
                        draft.name
                    )));
                    self.form = Some(form);
                    return;
                }
                if self.removed_projects.iter().any(|t| t.project == draft.name) {
                    self.notify(Notice::Error(format!(
                        "'{}' was removed; restore it from the removed list instead",
                        draft.name
                    )));
                    self.form = Some(form);
                    return;
                }
                let enrichment = self.county_enrichment(&draft.state, &draft.county);
                if enrichment.is_none() {
                    tracing::info!("No county sentiment found for {}, {}", draft.county, draft.state);
                }
                self.store.add_user_project(&draft.into_record(enrichment)).await
            }
            FormKind::EditSurvey { project } => {
                let Some(found) = self.table.find(&project).cloned() else {
                    self.notify(Notice::Error(format!("Project '{project}' is no longer listed")));
                    self.mode = InputMode::Normal;
                    return;
                };
                self.store.save_survey(&found, &form.survey_answers()).await
            }
            FormKind::AddQa | FormKind::EditQa { .. } => {
                let draft = QaDraft::from_form(&form);
                let missing = draft.missing_fields();
                if !missing.is_empty() {
                    return self.reject_form(form, missing);
                }
                match kind {
                    FormKind::EditQa { id } => self.store.update_qa(id, &draft.into_new_qa()).await,
                    _ => self.store.add_qa(&draft.into_new_qa()).await,
                }
            }
        };

        if self.finish_write(outcome).await {
            self.mode = InputMode::Normal;
        } else {
            self.form = Some(form);
        }
    }

    async fn confirm(&mut self, pending: Pending) {
        let outcome = match pending {
            Pending::DeleteUserProject(name) => self.store.delete_user_project(&name).await,
            Pending::DeleteQa(id) => self.store.delete_qa(id).await,
        };
        self.finish_write(outcome).await;
    }

    fn handle_map_event(&mut self, event: MapEvent) {
        match event {
            MapEvent::ProjectSelected { project } => self.select_project(project),
            MapEvent::StateSelected { state } => self.select_report_state(&state),
        }
    }

    fn active_map(&mut self) -> Option<&mut MapState> {
        match self.page {
            Page::Tracker => Some(&mut self.tracker_map),
            Page::Report => Some(&mut self.report_map),
            _ => None,
        }
    }

    fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt = match kind {
            PromptKind::ProjectName => self.filter.name_query.clone(),
            PromptKind::County => self.filter.county_query.clone(),
            PromptKind::QaSearch => self.hearings.query.clone(),
            PromptKind::ReportCounty => self.report_view.county_query.clone(),
        };
        self.mode = InputMode::Prompt(kind);
    }

    fn apply_prompt(&mut self, kind: PromptKind) {
        let value = std::mem::take(&mut self.prompt);
        match kind {
            PromptKind::ProjectName => {
                self.filter.name_query = value;
                self.filters_changed();
            }
            PromptKind::County => {
                self.filter.county_query = value;
                self.filters_changed();
            }
            PromptKind::QaSearch => {
                self.hearings.query = value;
                self.hearings.entry_index = 0;
            }
            PromptKind::ReportCounty => {
                let first = self.report.search_counties(&value).into_iter().next();
                self.report_view.county_query = value;
                if let Some((county, state)) = first {
                    self.select_report_state(&state);
                    self.report_view.county = Some(county);
                }
            }
        }
    }

    fn move_selection(&mut self, down: bool) {
        let step = |index: usize, len: usize| {
            if down {
                (index + 1).min(len.saturating_sub(1))
            } else {
                index.saturating_sub(1)
            }
        };
        match self.page {
            Page::Tracker => {
                let len = self.listed_projects().len();
                self.list_index = step(self.list_index, len);
                self.detail_scroll = 0;
            }
            Page::Report => {
                let len = self.report_states().len();
                self.report_view.state_index = step(self.report_view.state_index, len);
                self.report_view.county = None;
            }
            Page::Hearings => {
                let len = self.hearing_entries().len();
                self.hearings.entry_index = step(self.hearings.entry_index, len);
            }
            Page::Guide => {
                self.guide_scroll = if down {
                    self.guide_scroll.saturating_add(1)
                } else {
                    self.guide_scroll.saturating_sub(1)
                };
            }
        }
    }

    fn change_topic(&mut self, forward: bool) {
        let count = self.hearing_groups().len() + 1;
        self.hearings.topic_index = if forward {
            (self.hearings.topic_index + 1) % count
        } else {
            (self.hearings.topic_index + count - 1) % count
        };
        self.hearings.entry_index = 0;
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => return Ok(true),

            AppAction::ShowHelp => self.mode = InputMode::Help,
            AppAction::HideHelp => self.mode = InputMode::Normal,

            AppAction::SwitchPage(page) => self.page = page,
            AppAction::NextPage => self.page = self.page.next(),
            AppAction::PrevPage => self.page = self.page.prev(),

            AppAction::Reload => {
                self.dataset.invalidate();
                self.reload().await;
                self.notify(Notice::Info(format!(
                    "Reloaded {} projects",
                    self.table.projects.len()
                )));
            }

            AppAction::MoveUp => self.move_selection(false),
            AppAction::MoveDown => self.move_selection(true),

            AppAction::MoveLeft | AppAction::MoveRight => {
                let forward = action == AppAction::MoveRight;
                match self.page {
                    Page::Report => self.cycle_report_county(forward),
                    Page::Hearings => self.change_topic(forward),
                    _ => {}
                }
            }

            AppAction::Select => {
                if self.page == Page::Tracker {
                    if let Some(name) = self.current_project().map(|p| p.name.clone()) {
                        self.tracker_map.last_event = Some(MapEvent::ProjectSelected {
                            project: name.clone(),
                        });
                        self.select_project(name);
                    }
                }
            }

            AppAction::ScrollDetail(delta) => {
                self.detail_scroll = self.detail_scroll.saturating_add_signed(delta);
            }

            AppAction::StartSearch => match self.page {
                Page::Tracker => self.open_prompt(PromptKind::ProjectName),
                Page::Report => self.open_prompt(PromptKind::ReportCounty),
                Page::Hearings => self.open_prompt(PromptKind::QaSearch),
                Page::Guide => {}
            },
            AppAction::StartCountySearch => match self.page {
                Page::Tracker => self.open_prompt(PromptKind::County),
                Page::Report => self.open_prompt(PromptKind::ReportCounty),
                _ => {}
            },

            AppAction::CycleState => {
                self.filter.state = cycle_option(&self.filter.state, &self.filter_options.states);
                self.filters_changed();
            }
            AppAction::CycleSentiment => {
                self.filter.sentiment = cycle_option(&self.filter.sentiment, &Sentiment::ALL);
                self.filters_changed();
            }
            AppAction::CycleType => {
                self.filter.facility_type =
                    cycle_option(&self.filter.facility_type, &self.filter_options.facility_types);
                self.filters_changed();
            }
            AppAction::CycleSurvey => {
                self.filter.survey = self.filter.survey.cycle();
                self.filters_changed();
            }
            AppAction::ClearFilters => {
                self.filter = ProjectFilter::default();
                self.filters_changed();
            }

            AppAction::ZoomIn => {
                if let Some(map) = self.active_map() {
                    map.viewport.zoom_in();
                }
            }
            AppAction::ZoomOut => {
                if let Some(map) = self.active_map() {
                    map.viewport.zoom_out();
                }
            }
            AppAction::Pan { east, north } => {
                if let Some(map) = self.active_map() {
                    map.viewport.pan(east, north);
                }
            }
            AppAction::CycleBasemap => {
                if let Some(map) = self.active_map() {
                    map.basemap = map.basemap.cycle();
                }
            }
            AppAction::ToggleClusters => {
                if let Some(map) = self.active_map() {
                    map.clustered = !map.clustered;
                }
            }
            AppAction::ResetMap => {
                if let Some(map) = self.active_map() {
                    map.reset_view();
                }
            }

            AppAction::NextMarker | AppAction::PrevMarker => {
                let forward = action == AppAction::NextMarker;
                let event = match self.page {
                    Page::Tracker => {
                        let markers = self.tracker_markers();
                        self.tracker_map.cycle_focus(&markers, forward, true)
                    }
                    Page::Report => {
                        let markers = self.report_markers();
                        self.report_map.cycle_focus(&markers, forward, false)
                    }
                    _ => None,
                };
                if let Some(event) = event {
                    self.handle_map_event(event);
                }
            }

            AppAction::MapClick { column, row } => {
                let event = match self.page {
                    Page::Tracker => {
                        let markers = self.tracker_markers();
                        let area = self.tracker_map_area.get();
                        self.tracker_map.click(area, column, row, &markers, true)
                    }
                    Page::Report => {
                        let markers = self.report_markers();
                        let area = self.report_map_area.get();
                        self.report_map.click(area, column, row, &markers, false)
                    }
                    _ => None,
                };
                if let Some(event) = event {
                    self.handle_map_event(event);
                }
            }

            AppAction::AddRecord => match self.page {
                Page::Tracker => {
                    self.form = Some(Form::add_project());
                    self.mode = InputMode::Form;
                }
                Page::Hearings => {
                    self.form = Some(Form::add_qa(&topic_catalog(&self.qa_active)));
                    self.mode = InputMode::Form;
                }
                _ => {}
            },

            AppAction::EditRecord => match self.page {
                Page::Tracker => {
                    if let Some(project) = self.current_project() {
                        self.form = Some(Form::edit_survey(project));
                        self.mode = InputMode::Form;
                    }
                }
                Page::Hearings if !self.hearings.show_removed => {
                    if let Some(entry) = self.current_entry() {
                        self.form = Some(Form::edit_qa(entry, &topic_catalog(&self.qa_active)));
                        self.mode = InputMode::Form;
                    }
                }
                _ => {}
            },

            AppAction::RemoveRecord => match self.page {
                Page::Tracker => {
                    if let Some(name) = self.current_project().map(|p| p.name.clone()) {
                        let outcome = self.store.remove_project(&name).await;
                        self.finish_write(outcome).await;
                    }
                }
                Page::Hearings if !self.hearings.show_removed => {
                    if let Some(id) = self.current_entry().map(|e| e.id) {
                        let outcome = self.store.remove_qa(id).await;
                        self.finish_write(outcome).await;
                    }
                }
                _ => {}
            },

            AppAction::ShowRemoved => match self.page {
                Page::Tracker => {
                    self.picker_index = 0;
                    self.mode = InputMode::Picker;
                }
                Page::Hearings => {
                    self.hearings.show_removed = !self.hearings.show_removed;
                    self.hearings.topic_index = 0;
                    self.hearings.entry_index = 0;
                }
                _ => {}
            },

            AppAction::RestoreRecord => {
                if self.page == Page::Hearings && self.hearings.show_removed {
                    if let Some(id) = self.current_entry().map(|e| e.id) {
                        let outcome = self.store.restore_qa(id).await;
                        self.finish_write(outcome).await;
                    }
                }
            }

            AppAction::DeleteRecord => {
                if self.page == Page::Hearings && self.hearings.show_removed {
                    if let Some(id) = self.current_entry().map(|e| e.id) {
                        self.mode = InputMode::Confirm(Pending::DeleteQa(id));
                    }
                }
            }

            AppAction::OpenSource => {
                let url = self
                    .current_entry()
                    .and_then(|e| e.sources.as_deref())
                    .and_then(first_url);
                match url {
                    Some(url) => {
                        if let Err(e) = open::that(&url) {
                            tracing::warn!("Failed to open {}: {}", url, e);
                            self.notify(Notice::Error(format!("Could not open {url}")));
                        }
                    }
                    None => self.notify(Notice::Info("No source link for this entry".to_string())),
                }
            }

            AppAction::PromptChar(c) => self.prompt.push(c),
            AppAction::PromptBackspace => {
                self.prompt.pop();
            }
            AppAction::PromptConfirm => {
                if let InputMode::Prompt(kind) = self.mode {
                    self.apply_prompt(kind);
                }
                self.mode = InputMode::Normal;
            }
            AppAction::PromptCancel => {
                self.prompt.clear();
                self.mode = InputMode::Normal;
            }

            AppAction::FormChar(c) => {
                if let Some(form) = self.form.as_mut() {
                    form.input(c);
                }
            }
            AppAction::FormBackspace => {
                if let Some(form) = self.form.as_mut() {
                    form.backspace();
                }
            }
            AppAction::FormEnter => {
                if let Some(form) = self.form.as_mut() {
                    form.enter();
                }
            }
            AppAction::FormNextField => {
                if let Some(form) = self.form.as_mut() {
                    form.next_field();
                }
            }
            AppAction::FormPrevField => {
                if let Some(form) = self.form.as_mut() {
                    form.prev_field();
                }
            }
            AppAction::FormCycle(forward) => {
                if let Some(form) = self.form.as_mut() {
                    form.cycle_choice(forward);
                }
            }
            AppAction::FormSubmit => self.submit_form().await,
            AppAction::FormCancel => {
                self.form = None;
                self.mode = InputMode::Normal;
            }

            AppAction::PickerUp => self.picker_index = self.picker_index.saturating_sub(1),
            AppAction::PickerDown => {
                let last = self.removed_projects.len().saturating_sub(1);
                self.picker_index = (self.picker_index + 1).min(last);
            }
            AppAction::PickerConfirm => {
                if let Some(name) = self.removed_projects.get(self.picker_index).map(|t| t.project.clone()) {
                    let outcome = self.store.restore_project(&name).await;
                    self.finish_write(outcome).await;
                }
            }
            AppAction::PickerRestoreAll => {
                if !self.removed_projects.is_empty() {
                    let outcome = self.store.restore_all_projects().await;
                    self.finish_write(outcome).await;
                }
            }
            AppAction::PickerDelete => {
                if let Some(name) = self.removed_projects.get(self.picker_index).map(|t| t.project.clone()) {
                    if self.dataset.baseline_names().contains(&name) {
                        self.notify(Notice::Warning(format!(
                            "'{name}' comes from the baseline file and can only be restored"
                        )));
                    } else {
                        self.mode = InputMode::Confirm(Pending::DeleteUserProject(name));
                    }
                }
            }
            AppAction::PickerCancel => self.mode = InputMode::Normal,

            AppAction::ConfirmYes => {
                if let InputMode::Confirm(pending) = std::mem::take(&mut self.mode) {
                    let back_to_picker = matches!(pending, Pending::DeleteUserProject(_));
                    self.confirm(pending).await;
                    if back_to_picker {
                        self.mode = InputMode::Picker;
                    }
                }
            }
            AppAction::ConfirmNo => {
                self.mode = match self.mode {
                    InputMode::Confirm(Pending::DeleteUserProject(_)) => InputMode::Picker,
                    _ => InputMode::Normal,
                };
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Viewport;
    use crate::models::NewQa;

    async fn app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            cache_ttl_ms: 60_000,
            ..Config::default()
        };
        let store = LocalStore::open_in_memory().await.unwrap();
        let app = App::with_store(&config, Box::new(store)).await;
        (dir, app)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_action(AppAction::FormChar(c)).await.unwrap();
        }
    }

    fn focus(app: &mut App, label: &str) {
        let index = app
            .form
            .as_ref()
            .unwrap()
            .fields
            .iter()
            .position(|f| f.label == label)
            .unwrap();
        app.form.as_mut().unwrap().focus = index;
    }

    #[tokio::test]
    async fn starts_on_sample_data_with_warning() {
        let (_dir, app) = app().await;
        assert_eq!(app.table.projects.len(), 2);
        assert!(app
            .notices
            .iter()
            .any(|n| matches!(n, Notice::Warning(_))));
        assert!(app.report_error.is_some());
        assert_eq!(app.page, Page::Tracker);
    }

    #[tokio::test]
    async fn invalid_project_form_is_rejected_without_writing() {
        let (_dir, mut app) = app().await;
        app.handle_action(AppAction::AddRecord).await.unwrap();
        app.handle_action(AppAction::FormSubmit).await.unwrap();

        assert_eq!(app.mode, InputMode::Form);
        let form = app.form.as_ref().unwrap();
        assert_eq!(form.errors.len(), 5);
        assert_eq!(app.table.projects.len(), 2);
    }

    #[tokio::test]
    async fn added_project_is_visible_after_submit() {
        use crate::views::forms::{COUNTY, LATITUDE, LONGITUDE, NAME, STATE};

        let (_dir, mut app) = app().await;
        app.handle_action(AppAction::AddRecord).await.unwrap();
        for (label, value) in [
            (NAME, "Bluebonnet Solar"),
            (STATE, "tx"),
            (COUNTY, "Travis County"),
            (LATITUDE, "30.27"),
            (LONGITUDE, "-97.74"),
        ] {
            focus(&mut app, label);
            type_text(&mut app, value).await;
        }
        app.handle_action(AppAction::FormSubmit).await.unwrap();

        assert_eq!(app.mode, InputMode::Normal);
        let added = app.table.find("Bluebonnet Solar").unwrap();
        assert_eq!(added.state.as_deref(), Some("TX"));
        assert_eq!(added.sentiment, Sentiment::NoData);
    }

    #[tokio::test]
    async fn adding_under_a_removed_name_is_rejected() {
        use crate::views::forms::{COUNTY, LATITUDE, LONGITUDE, NAME, STATE};

        let (_dir, mut app) = app().await;
        app.handle_action(AppAction::RemoveRecord).await.unwrap();
        assert!(app.table.find("Sample Project 1").is_none());

        app.handle_action(AppAction::AddRecord).await.unwrap();
        for (label, value) in [
            (NAME, "Sample Project 1"),
            (STATE, "CA"),
            (COUNTY, "Kern County"),
            (LATITUDE, "35.3"),
            (LONGITUDE, "-119.0"),
        ] {
            focus(&mut app, label);
            type_text(&mut app, value).await;
        }
        app.handle_action(AppAction::FormSubmit).await.unwrap();

        assert_eq!(app.mode, InputMode::Form);
        assert!(app.form.is_some());
        assert!(matches!(app.notices.last(), Some(Notice::Error(m)) if m.contains("restore")));
        assert!(app.store.user_projects().await.rows.is_empty());
    }

    #[tokio::test]
    async fn survey_for_vanished_project_closes_the_form() {
        let (_dir, mut app) = app().await;
        app.handle_action(AppAction::EditRecord).await.unwrap();
        assert_eq!(app.mode, InputMode::Form);

        app.store.remove_project("Sample Project 1").await;
        app.reload().await;
        app.handle_action(AppAction::FormSubmit).await.unwrap();

        assert_eq!(app.mode, InputMode::Normal);
        assert!(app.form.is_none());
        assert!(matches!(app.notices.last(), Some(Notice::Error(_))));
    }

    #[tokio::test]
    async fn remove_and_restore_round_trip() {
        let (_dir, mut app) = app().await;
        let before = app.table.find("Sample Project 1").cloned().unwrap();

        app.handle_action(AppAction::RemoveRecord).await.unwrap();
        assert!(app.table.find("Sample Project 1").is_none());
        assert_eq!(app.removed_projects.len(), 1);

        app.handle_action(AppAction::ShowRemoved).await.unwrap();
        app.handle_action(AppAction::PickerDelete).await.unwrap();
        // Baseline rows can only be restored.
        assert_eq!(app.mode, InputMode::Picker);

        app.handle_action(AppAction::PickerConfirm).await.unwrap();
        assert_eq!(app.table.find("Sample Project 1"), Some(&before));
        assert!(app.removed_projects.is_empty());
    }

    #[tokio::test]
    async fn filters_narrow_the_listing() {
        let (_dir, mut app) = app().await;
        app.handle_action(AppAction::CycleState).await.unwrap();
        assert_eq!(app.filter.state.as_deref(), Some("CA"));
        assert_eq!(app.filtered().count, 1);

        app.handle_action(AppAction::ClearFilters).await.unwrap();
        assert_eq!(app.filtered().count, 2);
    }

    #[tokio::test]
    async fn marker_cycling_preselects_project() {
        let (_dir, mut app) = app().await;
        app.handle_action(AppAction::NextMarker).await.unwrap();
        app.handle_action(AppAction::NextMarker).await.unwrap();

        assert_eq!(app.selected_project.as_deref(), Some("Sample Project 2"));
        assert_eq!(app.current_project().map(|p| p.name.as_str()), Some("Sample Project 2"));
        assert_ne!(app.tracker_map.viewport, Viewport::default());
    }

    #[tokio::test]
    async fn qa_soft_delete_and_confirmed_permanent_delete() {
        let (_dir, mut app) = app().await;
        let outcome = app
            .store
            .add_qa(&NewQa {
                topic: "Health Concerns".to_string(),
                question: "Do panels emit EMF?".to_string(),
                response: "Levels are negligible. • Comparable to appliances".to_string(),
                sources: None,
            })
            .await;
        assert!(app.finish_write(outcome).await);

        app.page = Page::Hearings;
        assert_eq!(app.hearing_entries().len(), 1);
        app.handle_action(AppAction::RemoveRecord).await.unwrap();
        assert!(app.qa_active.is_empty());
        assert_eq!(app.qa_removed.len(), 1);

        app.handle_action(AppAction::ShowRemoved).await.unwrap();
        app.handle_action(AppAction::DeleteRecord).await.unwrap();
        assert!(matches!(app.mode, InputMode::Confirm(Pending::DeleteQa(_))));
        app.handle_action(AppAction::ConfirmNo).await.unwrap();
        assert_eq!(app.qa_removed.len(), 1);

        app.handle_action(AppAction::DeleteRecord).await.unwrap();
        app.handle_action(AppAction::ConfirmYes).await.unwrap();
        assert!(app.qa_removed.is_empty());
        assert_eq!(app.mode, InputMode::Normal);
    }

    #[test]
    fn pages_cycle_in_both_directions() {
        assert_eq!(Page::Guide.next(), Page::Tracker);
        assert_eq!(Page::Tracker.prev(), Page::Guide);
    }
}
