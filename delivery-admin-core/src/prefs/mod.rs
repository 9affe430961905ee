//! Front-end state that outlives a single command: persisted key/value
//! entries, layout and theme, and the responsive sidebar.

mod layout;
mod local_storage;
mod sidebar;

pub use layout::{LayoutState, ThemeFlag, View, THEME_KEY};
pub use local_storage::{LocalStorage, LocalStorageError};
pub use sidebar::{SidebarState, DESKTOP_BREAKPOINT};
