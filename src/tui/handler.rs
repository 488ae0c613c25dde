use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{InputMode, Page};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    ShowHelp,
    HideHelp,
    SwitchPage(Page),
    NextPage,
    PrevPage,
    Reload,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Select,
    ScrollDetail(i16),
    // Filters and searches
    StartSearch,
    StartCountySearch,
    CycleState,
    CycleSentiment,
    CycleType,
    CycleSurvey,
    ClearFilters,
    // Map
    ZoomIn,
    ZoomOut,
    Pan { east: i32, north: i32 },
    NextMarker,
    PrevMarker,
    CycleBasemap,
    ToggleClusters,
    ResetMap,
    MapClick { column: u16, row: u16 },
    // Records
    AddRecord,
    EditRecord,
    RemoveRecord,
    ShowRemoved,
    RestoreRecord,
    DeleteRecord,
    OpenSource,
    // Prompt input
    PromptChar(char),
    PromptBackspace,
    PromptConfirm,
    PromptCancel,
    // Form input
    FormChar(char),
    FormBackspace,
    FormEnter,
    FormNextField,
    FormPrevField,
    FormCycle(bool),
    FormSubmit,
    FormCancel,
    // Removed-projects picker
    PickerUp,
    PickerDown,
    PickerConfirm,
    PickerRestoreAll,
    PickerDelete,
    PickerCancel,
    // Confirmation
    ConfirmYes,
    ConfirmNo,
}

pub fn handle_key_event(key: KeyEvent, mode: &InputMode, page: Page) -> Option<AppAction> {
    match mode {
        // If help is showing, any key closes it
        InputMode::Help => Some(AppAction::HideHelp),

        InputMode::Prompt(_) => match key.code {
            KeyCode::Enter => Some(AppAction::PromptConfirm),
            KeyCode::Esc => Some(AppAction::PromptCancel),
            KeyCode::Backspace => Some(AppAction::PromptBackspace),
            KeyCode::Char(c) => Some(AppAction::PromptChar(c)),
            _ => None,
        },

        InputMode::Form => match (key.code, key.modifiers) {
            (KeyCode::Char('s'), KeyModifiers::CONTROL) => Some(AppAction::FormSubmit),
            (KeyCode::Esc, _) => Some(AppAction::FormCancel),
            (KeyCode::Tab, _) | (KeyCode::Down, _) => Some(AppAction::FormNextField),
            (KeyCode::BackTab, _) | (KeyCode::Up, _) => Some(AppAction::FormPrevField),
            (KeyCode::Left, _) => Some(AppAction::FormCycle(false)),
            (KeyCode::Right, _) => Some(AppAction::FormCycle(true)),
            (KeyCode::Enter, _) => Some(AppAction::FormEnter),
            (KeyCode::Backspace, _) => Some(AppAction::FormBackspace),
            (KeyCode::Char(c), _) => Some(AppAction::FormChar(c)),
            _ => None,
        },

        InputMode::Picker => match key.code {
            KeyCode::Char('j') | KeyCode::Down => Some(AppAction::PickerDown),
            KeyCode::Char('k') | KeyCode::Up => Some(AppAction::PickerUp),
            KeyCode::Enter | KeyCode::Char('r') => Some(AppAction::PickerConfirm),
            KeyCode::Char('A') => Some(AppAction::PickerRestoreAll),
            KeyCode::Char('D') => Some(AppAction::PickerDelete),
            KeyCode::Esc | KeyCode::Char('q') => Some(AppAction::PickerCancel),
            _ => None,
        },

        InputMode::Confirm(_) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(AppAction::ConfirmYes),
            _ => Some(AppAction::ConfirmNo),
        },

        InputMode::Normal => normal_key(key, page),
    }
}

fn normal_key(key: KeyEvent, page: Page) -> Option<AppAction> {
    let global = match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => Some(AppAction::Quit),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),
        (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),
        (KeyCode::Tab, _) => Some(AppAction::NextPage),
        (KeyCode::BackTab, _) => Some(AppAction::PrevPage),
        (KeyCode::Char('1'), _) => Some(AppAction::SwitchPage(Page::Tracker)),
        (KeyCode::Char('2'), _) => Some(AppAction::SwitchPage(Page::Report)),
        (KeyCode::Char('3'), _) => Some(AppAction::SwitchPage(Page::Hearings)),
        (KeyCode::Char('4'), _) => Some(AppAction::SwitchPage(Page::Guide)),
        (KeyCode::Char('R'), _) => Some(AppAction::Reload),
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(AppAction::MoveDown),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(AppAction::MoveUp),
        (KeyCode::Char('/'), _) => Some(AppAction::StartSearch),
        _ => None,
    };
    if global.is_some() {
        return global;
    }

    match page {
        Page::Tracker => tracker_key(key).or_else(|| map_key(key)),
        Page::Report => match key.code {
            KeyCode::Char('h') | KeyCode::Left => Some(AppAction::MoveLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(AppAction::MoveRight),
            KeyCode::Char('c') => Some(AppAction::StartCountySearch),
            _ => map_key(key),
        },
        Page::Hearings => match key.code {
            KeyCode::Char('h') | KeyCode::Left => Some(AppAction::MoveLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(AppAction::MoveRight),
            KeyCode::Char('a') => Some(AppAction::AddRecord),
            KeyCode::Char('e') => Some(AppAction::EditRecord),
            KeyCode::Char('d') => Some(AppAction::RemoveRecord),
            KeyCode::Char('r') => Some(AppAction::ShowRemoved),
            KeyCode::Char('u') => Some(AppAction::RestoreRecord),
            KeyCode::Char('D') => Some(AppAction::DeleteRecord),
            KeyCode::Char('o') => Some(AppAction::OpenSource),
            _ => None,
        },
        Page::Guide => match key.code {
            KeyCode::PageDown => Some(AppAction::MoveDown),
            KeyCode::PageUp => Some(AppAction::MoveUp),
            _ => None,
        },
    }
}

fn tracker_key(key: KeyEvent) -> Option<AppAction> {
    match key.code {
        KeyCode::Enter => Some(AppAction::Select),
        KeyCode::Char('c') => Some(AppAction::StartCountySearch),
        KeyCode::Char('s') => Some(AppAction::CycleState),
        KeyCode::Char('t') => Some(AppAction::CycleSentiment),
        KeyCode::Char('y') => Some(AppAction::CycleType),
        KeyCode::Char('v') => Some(AppAction::CycleSurvey),
        KeyCode::Char('x') => Some(AppAction::ClearFilters),
        KeyCode::Char('a') => Some(AppAction::AddRecord),
        KeyCode::Char('e') => Some(AppAction::EditRecord),
        KeyCode::Char('d') => Some(AppAction::RemoveRecord),
        KeyCode::Char('u') => Some(AppAction::ShowRemoved),
        KeyCode::PageDown => Some(AppAction::ScrollDetail(5)),
        KeyCode::PageUp => Some(AppAction::ScrollDetail(-5)),
        _ => None,
    }
}

fn map_key(key: KeyEvent) -> Option<AppAction> {
    match key.code {
        KeyCode::Char('+') | KeyCode::Char('=') => Some(AppAction::ZoomIn),
        KeyCode::Char('-') => Some(AppAction::ZoomOut),
        KeyCode::Char('H') => Some(AppAction::Pan { east: -1, north: 0 }),
        KeyCode::Char('L') => Some(AppAction::Pan { east: 1, north: 0 }),
        KeyCode::Char('K') => Some(AppAction::Pan { east: 0, north: 1 }),
        KeyCode::Char('J') => Some(AppAction::Pan { east: 0, north: -1 }),
        KeyCode::Char('n') => Some(AppAction::NextMarker),
        KeyCode::Char('N') => Some(AppAction::PrevMarker),
        KeyCode::Char('b') => Some(AppAction::CycleBasemap),
        KeyCode::Char('C') => Some(AppAction::ToggleClusters),
        KeyCode::Char('0') => Some(AppAction::ResetMap),
        _ => None,
    }
}

/// Clicks select map markers; the wheel zooms the map of the current page.
pub fn handle_mouse_event(mouse: MouseEvent, mode: &InputMode) -> Option<AppAction> {
    if *mode != InputMode::Normal {
        return None;
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(AppAction::MapClick {
            column: mouse.column,
            row: mouse.row,
        }),
        MouseEventKind::ScrollUp => Some(AppAction::ZoomIn),
        MouseEventKind::ScrollDown => Some(AppAction::ZoomOut),
        _ => None,
    }
}
