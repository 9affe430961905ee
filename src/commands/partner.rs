use clap::{Args, Subcommand};
use delivery_admin_core::store::FieldValue;
use delivery_admin_core::{format_date, DeliveryPartner, NewPartner, PartnerStatus, PartnerUpdate};
use std::error::Error;

use super::{truncate, watch_until_interrupted, App, OutputFormat};

#[derive(Args)]
pub struct PartnerCommand {
    #[command(subcommand)]
    pub command: PartnerSubcommand,
}

#[derive(Subcommand)]
pub enum PartnerSubcommand {
    /// List partners
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show partners matching this text (id, name, email, phone)
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Show a partner
    Show {
        /// Partner ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Register a new partner (unapproved and inactive)
    Register {
        /// Name
        #[arg(long, short)]
        name: String,

        /// Email address
        #[arg(long, short)]
        email: String,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Earnings per delivery
        #[arg(long)]
        rate: Option<f64>,

        /// Extra profile field as KEY=VALUE (can be repeated)
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Update partner fields
    Update {
        /// Partner ID
        id: String,

        /// New name
        #[arg(long, short)]
        name: Option<String>,

        /// New email address
        #[arg(long, short)]
        email: Option<String>,

        /// New phone number
        #[arg(long)]
        phone: Option<String>,

        /// New earnings per delivery
        #[arg(long)]
        rate: Option<f64>,

        /// New rating
        #[arg(long)]
        rating: Option<f64>,

        /// Profile field as KEY=VALUE (can be repeated)
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Approve a partner
    Approve {
        /// Partner ID
        id: String,
    },

    /// Revoke a partner's approval
    Revoke {
        /// Partner ID
        id: String,
    },

    /// Set a partner's status (active, inactive)
    Status {
        /// Partner ID
        id: String,

        /// New status
        status: String,
    },

    /// Set the same status on several partners at once
    BulkStatus {
        /// New status (active, inactive)
        status: String,

        /// Partner IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show partner statistics
    Stats {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the partner list on every change until interrupted
    Watch,
}

impl PartnerCommand {
    pub async fn run(&self, app: &mut App) -> Result<(), Box<dyn Error>> {
        app.require_user()?;
        let service = app.partners();

        match &self.command {
            PartnerSubcommand::List { format, search } => {
                if let Some(text) = search {
                    app.layout.set_search(text.as_str());
                }
                let partners: Vec<DeliveryPartner> = service
                    .get_all()
                    .await?
                    .into_iter()
                    .filter(|p| app.layout.matches_search(&search_fields(p)))
                    .collect();

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&partners)?),
                    OutputFormat::Text => print_table(&partners),
                }
            }

            PartnerSubcommand::Show { id, format } => {
                let partner = service
                    .get(id)
                    .await?
                    .ok_or_else(|| format!("Partner not found: {}", id))?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&partner)?),
                    OutputFormat::Text => {
                        println!("{}", partner);
                        println!("  Joined:     {}", format_date(partner.created_at));
                        println!("  Updated:    {}", format_date(partner.updated_at));
                    }
                }
            }

            PartnerSubcommand::Register {
                name,
                email,
                phone,
                rate,
                fields,
            } => {
                let mut new = NewPartner::new(name, email);
                if let Some(phone) = phone {
                    new = new.with_phone(phone);
                }
                if let Some(rate) = rate {
                    new = new.with_rate(*rate);
                }
                for raw in fields {
                    let (key, value) = parse_field(raw)?;
                    new = new.with_profile_field(key, value);
                }

                let id = service.create(new).await?;
                println!("Registered partner {} ({})", name, id);
            }

            PartnerSubcommand::Update {
                id,
                name,
                email,
                phone,
                rate,
                rating,
                fields,
            } => {
                let mut update = PartnerUpdate::new();
                if let Some(name) = name {
                    update = update.name(name);
                }
                if let Some(email) = email {
                    update = update.email(email);
                }
                if let Some(phone) = phone {
                    update = update.phone(phone);
                }
                if let Some(rate) = rate {
                    update = update.rate_per_delivery(*rate);
                }
                if let Some(rating) = rating {
                    update = update.rating(*rating);
                }
                for raw in fields {
                    let (key, value) = parse_field(raw)?;
                    update = update.field(key, value);
                }

                if update.is_empty() {
                    return Err("Nothing to update. Pass at least one field option.".into());
                }
                service.update(id, update).await?;
                println!("Updated partner {}", id);
            }

            PartnerSubcommand::Approve { id } => {
                service.set_approval(id, true).await?;
                println!("Approved partner {}", id);
            }

            PartnerSubcommand::Revoke { id } => {
                service.set_approval(id, false).await?;
                println!("Revoked approval for partner {}", id);
            }

            PartnerSubcommand::Status { id, status } => {
                let status: PartnerStatus = status.parse()?;
                service.set_status(id, status.clone()).await?;
                println!("Partner {} is now {}", id, status);
            }

            PartnerSubcommand::BulkStatus { status, ids } => {
                let status: PartnerStatus = status.parse()?;
                service.bulk_set_status(ids, status.clone()).await?;
                println!("Updated {} partners to {}", ids.len(), status);
            }

            PartnerSubcommand::Stats { format } => {
                let stats = service.statistics().await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                    OutputFormat::Text => println!("{}", stats),
                }
            }

            PartnerSubcommand::Watch => {
                let _subscription = service.subscribe(|partners| {
                    println!("--- {} partners ---", partners.len());
                    print_table(&partners);
                })?;
                watch_until_interrupted(app).await?;
            }
        }

        Ok(())
    }
}

/// Parses `KEY=VALUE`. Values that parse as JSON keep their type; anything
/// else is stored as text.
fn parse_field(raw: &str) -> Result<(String, FieldValue), String> {
    let (key, value) = raw
        .split_once('=')
        .filter(|(k, _)| !k.trim().is_empty())
        .ok_or_else(|| format!("Invalid field '{}'. Use KEY=VALUE.", raw))?;

    let value = serde_json::from_str(value)
        .map(FieldValue::from_json)
        .unwrap_or_else(|_| FieldValue::from(value));
    Ok((key.trim().to_string(), value))
}

fn search_fields(partner: &DeliveryPartner) -> Vec<&str> {
    let mut fields = vec![
        partner.id.as_str(),
        partner.name.as_str(),
        partner.email.as_str(),
    ];
    fields.extend(partner.phone.as_deref());
    fields
}

fn print_table(partners: &[DeliveryPartner]) {
    if partners.is_empty() {
        println!("No partners found.");
        return;
    }

    println!(
        "{:<32}  {:<20}  {:<24}  {:<8}  {:<8}  {:>6}  {:>5}",
        "ID", "Name", "Email", "Approved", "Status", "Rating", "Done"
    );
    println!("{}", "-".repeat(115));
    for p in partners {
        println!(
            "{:<32}  {:<20}  {:<24}  {:<8}  {:<8}  {:>6.1}  {:>5}",
            p.id,
            truncate(&p.name, 20),
            truncate(&p.email, 24),
            if p.is_approved { "yes" } else { "no" },
            truncate(p.status.as_str(), 8),
            p.rating,
            p.total_deliveries
        );
    }
    println!("\nTotal: {} partners", partners.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("vehicle=bike").unwrap(),
            ("vehicle".to_string(), FieldValue::from("bike"))
        );
        assert_eq!(
            parse_field("shifts=3").unwrap(),
            ("shifts".to_string(), FieldValue::Int(3))
        );
        assert_eq!(
            parse_field("verified=true").unwrap(),
            ("verified".to_string(), FieldValue::Bool(true))
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }
}
