use clap::Args;
use std::error::Error;

use super::{prompt, prompt_password, App};

#[derive(Args)]
pub struct LoginCommand {
    /// Admin email address
    #[arg(long, short)]
    email: Option<String>,

    /// Password (prompted when omitted)
    #[arg(long)]
    password: Option<String>,
}

impl LoginCommand {
    pub async fn run(&self, app: &mut App) -> Result<(), Box<dyn Error>> {
        let email = match &self.email {
            Some(e) => e.clone(),
            None => prompt("Email: ")?,
        };
        if email.is_empty() {
            return Err("Email cannot be empty".into());
        }
        let password = match &self.password {
            Some(p) => p.clone(),
            None => prompt_password("Password: ")?,
        };

        let result = app.session.login(&email, &password).await;
        app.flush_notifications();

        let user = result?;
        println!("Logged in as {}", user);
        Ok(())
    }
}

pub fn logout(app: &mut App) -> Result<(), Box<dyn Error>> {
    if !app.session.is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }
    app.session.logout();
    app.flush_notifications();
    Ok(())
}

pub fn whoami(app: &App) -> Result<(), Box<dyn Error>> {
    match app.session.user() {
        Some(user) => {
            println!("{}", user);
            println!("uid: {}", user.uid);
        }
        None => println!("Not logged in."),
    }
    Ok(())
}
