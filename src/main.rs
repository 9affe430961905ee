use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use commands::{
    AdminCommand, App, ConfigCommand, DeliveryCommand, LoginCommand, PartnerCommand, PrefsCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "dadmin")]
#[command(version)]
#[command(about = "Delivery and delivery partner administration", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in as an admin
    Login(LoginCommand),

    /// Log out and forget the stored session
    Logout,

    /// Show the logged-in admin
    Whoami,

    /// Manage admin accounts
    Admin(AdminCommand),

    /// Manage deliveries
    Delivery(DeliveryCommand),

    /// Manage delivery partners
    Partner(PartnerCommand),

    /// Show or change display preferences
    Prefs(PrefsCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config)?;

    let command = match cli.command {
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    if let Commands::Config(cmd) = &command {
        return cmd.run(&config);
    }

    let mut app = App::open(&config)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(execute_command(&command, &mut app))
}

async fn execute_command(
    command: &Commands,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Login(cmd) => cmd.run(app).await?,
        Commands::Logout => commands::logout(app)?,
        Commands::Whoami => commands::whoami(app)?,
        Commands::Admin(cmd) => cmd.run(app).await?,
        Commands::Delivery(cmd) => cmd.run(app).await?,
        Commands::Partner(cmd) => cmd.run(app).await?,
        Commands::Prefs(cmd) => cmd.run(app)?,
        Commands::Config(_) => {}
    }

    Ok(())
}
