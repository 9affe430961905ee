use clap::{Args, Subcommand};
use delivery_admin_core::models::ADMINS;
use delivery_admin_core::store::{DocumentStore, Query};
use std::error::Error;

use super::{prompt_password, App};

#[derive(Args)]
pub struct AdminCommand {
    #[command(subcommand)]
    pub command: AdminSubcommand,
}

#[derive(Subcommand)]
pub enum AdminSubcommand {
    /// Add an admin account (the first account can be added without logging in)
    Add {
        /// Email address
        #[arg(long, short)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Display name
        #[arg(long, short)]
        name: Option<String>,
    },
}

impl AdminCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn Error>> {
        match &self.command {
            AdminSubcommand::Add {
                email,
                password,
                name,
            } => {
                let existing = app.store.query(&Query::collection(ADMINS)).await?;
                if !existing.is_empty() {
                    app.require_user()?;
                }

                let password = match password {
                    Some(p) => p.clone(),
                    None => prompt_password("Password: ")?,
                };

                let user = app
                    .directory()
                    .add_admin(email, &password, name.as_deref())
                    .await?;
                println!("Added admin {}", user);
                Ok(())
            }
        }
    }
}
