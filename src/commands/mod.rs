mod admin;
mod config_cmd;
mod delivery;
mod partner;
mod prefs;
mod session;

use clap::ValueEnum;
use delivery_admin_core::store::LocalStore;
use delivery_admin_core::{
    AdminDirectory, AuthSession, DeliveryService, LayoutState, LocalStorage, NotificationKind,
    NotificationQueue, PartnerService, ThemeFlag, User,
};
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

pub use admin::AdminCommand;
pub use config_cmd::ConfigCommand;
pub use delivery::DeliveryCommand;
pub use partner::PartnerCommand;
pub use prefs::PrefsCommand;
pub use session::{logout, whoami, LoginCommand};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a command needs, wired from the configuration.
pub struct App {
    pub store: Arc<LocalStore>,
    pub notifications: Arc<NotificationQueue>,
    pub session: AuthSession,
    pub layout: LayoutState,
    pub theme: ThemeFlag,
}

impl App {
    pub fn open(config: &Config) -> Result<Self, Box<dyn Error>> {
        tracing::debug!(data_dir = %config.data_dir.value.display(), "Opening store");
        let store = Arc::new(LocalStore::open(&config.data_dir.value));
        let storage = Arc::new(LocalStorage::open(config.local_storage_path())?);
        let notifications = Arc::new(NotificationQueue::new());

        let mut session = AuthSession::new(
            Arc::new(AdminDirectory::new(store.clone())),
            storage.clone(),
            notifications.clone(),
        );
        session.restore();

        let theme = ThemeFlag::new();
        let layout = LayoutState::restore(storage, theme.clone(), config.prefers_dark.value)?;

        Ok(Self {
            store,
            notifications,
            session,
            layout,
            theme,
        })
    }

    pub fn deliveries(&self) -> DeliveryService {
        DeliveryService::new(self.store.clone())
    }

    pub fn partners(&self) -> PartnerService {
        PartnerService::new(self.store.clone())
    }

    pub fn directory(&self) -> AdminDirectory {
        AdminDirectory::new(self.store.clone())
    }

    /// The signed-in admin, or an error telling the operator to log in.
    pub fn require_user(&self) -> Result<&User, Box<dyn Error>> {
        self.session
            .user()
            .ok_or_else(|| "Not logged in. Run 'dadmin login' first.".into())
    }

    /// Prints pending notifications to stderr.
    pub fn flush_notifications(&self) {
        for note in self.notifications.drain() {
            let marker = match note.kind {
                NotificationKind::Success => "ok",
                NotificationKind::Info => "info",
                NotificationKind::Error => "error",
            };
            eprintln!("[{}] {}", marker, note.message);
        }
    }
}

/// How often `watch` checks the data directory for other sessions' writes.
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Feeds live subscriptions with changes saved by other sessions until Ctrl-C.
pub async fn watch_until_interrupted(app: &App) -> Result<(), Box<dyn Error>> {
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    let mut ticker = tokio::time::interval(WATCH_POLL_INTERVAL);

    loop {
        tokio::select! {
            result = &mut interrupted => return Ok(result?),
            _ = ticker.tick() => {
                app.store.refresh()?;
            }
        }
    }
}

/// Reads one line from stdin after printing `prompt`.
pub fn prompt(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Reads a password without echoing it.
pub fn prompt_password(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}

/// Truncates `s` to `max` characters for table columns.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-identifier", 10), "a-very-...");
    }
}
