pub mod detail;
pub mod forms;

pub use forms::{Form, FormKind, ProjectDraft, QaDraft};
