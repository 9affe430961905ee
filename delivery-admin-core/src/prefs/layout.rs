//! Layout and theme state: active view, dark mode and the search box.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::local_storage::{LocalStorage, LocalStorageError};

/// Local storage key holding `dark` or `light`.
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Dashboard,
    Deliveries,
    Partners,
    Settings,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dashboard" => Ok(View::Dashboard),
            "deliveries" => Ok(View::Deliveries),
            "partners" => Ok(View::Partners),
            "settings" => Ok(View::Settings),
            _ => Err(format!(
                "Invalid view: '{}'. Valid values: dashboard, deliveries, partners, settings",
                s
            )),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            View::Dashboard => "dashboard",
            View::Deliveries => "deliveries",
            View::Partners => "partners",
            View::Settings => "settings",
        };
        write!(f, "{}", s)
    }
}

/// Process-wide style flag read by whatever renders output.
#[derive(Debug, Clone, Default)]
pub struct ThemeFlag(Arc<AtomicBool>);

impl ThemeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dark(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, dark: bool) {
        self.0.store(dark, Ordering::Relaxed);
    }
}

/// Layout state shared by the views of the panel.
#[derive(Debug)]
pub struct LayoutState {
    storage: Arc<LocalStorage>,
    theme: ThemeFlag,
    active_view: View,
    dark_mode: bool,
    search: String,
}

impl LayoutState {
    /// Restores dark mode from local storage, falling back to the
    /// environment's preference when nothing usable is stored. The result is
    /// written back and applied to `theme` straight away.
    pub fn restore(
        storage: Arc<LocalStorage>,
        theme: ThemeFlag,
        prefers_dark: bool,
    ) -> Result<Self, LocalStorageError> {
        let dark_mode = match storage.get(THEME_KEY).as_deref() {
            Some("dark") => true,
            Some("light") => false,
            _ => prefers_dark,
        };

        let mut state = Self {
            storage,
            theme,
            active_view: View::default(),
            dark_mode,
            search: String::new(),
        };
        state.set_dark_mode(dark_mode)?;
        Ok(state)
    }

    pub fn active_view(&self) -> View {
        self.active_view
    }

    pub fn set_active_view(&mut self, view: View) {
        self.active_view = view;
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Changes dark mode, persisting it and updating the style flag.
    pub fn set_dark_mode(&mut self, dark: bool) -> Result<(), LocalStorageError> {
        self.dark_mode = dark;
        self.theme.set(dark);
        self.storage
            .set(THEME_KEY, if dark { "dark" } else { "light" })?;
        tracing::debug!(dark, "Theme applied");
        Ok(())
    }

    /// Flips dark mode and returns the new value.
    pub fn toggle_dark_mode(&mut self) -> Result<bool, LocalStorageError> {
        self.set_dark_mode(!self.dark_mode)?;
        Ok(self.dark_mode)
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    /// Whether any of `values` contains the search text, ignoring case.
    /// An empty search matches everything.
    pub fn matches_search(&self, values: &[&str]) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty() || values.iter().any(|v| v.to_lowercase().contains(&needle))
    }
}
