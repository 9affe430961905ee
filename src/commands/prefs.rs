use clap::{Args, Subcommand, ValueEnum};
use std::error::Error;

use super::App;

#[derive(Clone, ValueEnum)]
pub enum ThemeChoice {
    Dark,
    Light,
    Toggle,
}

#[derive(Args)]
pub struct PrefsCommand {
    #[command(subcommand)]
    pub command: PrefsSubcommand,
}

#[derive(Subcommand)]
pub enum PrefsSubcommand {
    /// Show stored preferences
    Show,

    /// Change the color theme
    Theme {
        #[arg(value_enum)]
        choice: ThemeChoice,
    },
}

impl PrefsCommand {
    pub fn run(&self, app: &mut App) -> Result<(), Box<dyn Error>> {
        match &self.command {
            PrefsSubcommand::Show => {
                println!("theme: {}", theme_name(app.theme.is_dark()));
                println!("view: {}", app.layout.active_view());
            }
            PrefsSubcommand::Theme { choice } => {
                match choice {
                    ThemeChoice::Dark => app.layout.set_dark_mode(true)?,
                    ThemeChoice::Light => app.layout.set_dark_mode(false)?,
                    ThemeChoice::Toggle => {
                        app.layout.toggle_dark_mode()?;
                    }
                }
                println!("Theme set to {}", theme_name(app.layout.dark_mode()));
            }
        }
        Ok(())
    }
}

fn theme_name(dark: bool) -> &'static str {
    if dark {
        "dark"
    } else {
        "light"
    }
}
