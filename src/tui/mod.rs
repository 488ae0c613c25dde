mod handler;
mod map_view;
mod pages;
mod ui;

pub use handler::{handle_key_event, handle_mouse_event, AppAction};
pub use ui::draw;
