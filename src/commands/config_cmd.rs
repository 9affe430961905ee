use clap::{Args, Subcommand};
use std::error::Error;

use super::OutputFormat;
use crate::config::{Config, ConfigSource};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show effective settings and where each one came from
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
                OutputFormat::Text => print!("{}", render_settings(config)),
            },
        }
        Ok(())
    }
}

struct Setting {
    key: &'static str,
    value: String,
    source: Option<ConfigSource>,
}

fn settings(config: &Config) -> Vec<Setting> {
    vec![
        Setting {
            key: "data_dir",
            value: config.data_dir.value.display().to_string(),
            source: Some(config.data_dir.source.clone()),
        },
        Setting {
            key: "prefers_dark",
            value: config.prefers_dark.value.to_string(),
            source: Some(config.prefers_dark.source.clone()),
        },
        Setting {
            key: "local storage",
            value: config.local_storage_path().display().to_string(),
            source: None,
        },
    ]
}

fn config_file_line(config: &Config) -> String {
    match &config.config_file {
        Some(path) => format!("Config file: {}", path.display()),
        None => format!(
            "Config file: {} (not found, using defaults)",
            Config::default_config_path().display()
        ),
    }
}

/// Settings as an aligned `key  value  (source)` table.
fn render_settings(config: &Config) -> String {
    let rows = settings(config);
    let key_width = rows.iter().map(|s| s.key.len()).max().unwrap_or(0);
    let value_width = rows.iter().map(|s| s.value.len()).max().unwrap_or(0);

    let mut out = config_file_line(config);
    out.push_str("\n\n");
    for row in rows {
        let source = match &row.source {
            Some(source) => format!("({})", source),
            None => "(derived)".to_string(),
        };
        out.push_str(&format!(
            "{:<kw$}  {:<vw$}  {}\n",
            row.key,
            row.value,
            source,
            kw = key_width,
            vw = value_width
        ));
    }
    out
}
