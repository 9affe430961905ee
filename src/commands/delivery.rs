use clap::{Args, Subcommand};
use delivery_admin_core::{format_date, Delivery, DeliveryStatus, NewDelivery, Order};
use std::error::Error;

use super::{truncate, watch_until_interrupted, App, OutputFormat};

#[derive(Args)]
pub struct DeliveryCommand {
    #[command(subcommand)]
    pub command: DeliverySubcommand,
}

#[derive(Subcommand)]
pub enum DeliverySubcommand {
    /// List deliveries, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show deliveries matching this text (id, order, partner, customer)
        #[arg(long, short)]
        search: Option<String>,

        /// Only show deliveries assigned to this partner ID
        #[arg(long, short)]
        partner: Option<String>,
    },

    /// Show a delivery
    Show {
        /// Delivery ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a delivery directly
    Create {
        /// Order ID
        #[arg(long)]
        order: String,

        /// Partner ID
        #[arg(long)]
        partner: String,

        /// Earnings for the partner
        #[arg(long, default_value_t = 0.0)]
        earnings: f64,

        /// Distance
        #[arg(long, default_value_t = 0.0)]
        distance: f64,

        /// Initial status
        #[arg(long, default_value = "active")]
        status: String,
    },

    /// Set a delivery's status
    Status {
        /// Delivery ID
        id: String,

        /// New status (e.g. active, delivered)
        status: String,
    },

    /// Assign an order to a partner, creating an active delivery
    Assign {
        /// Order ID
        #[arg(long)]
        order: String,

        /// Partner ID
        #[arg(long)]
        partner: String,

        /// Customer name
        #[arg(long)]
        customer: Option<String>,

        /// Pickup address
        #[arg(long, requires = "dropoff")]
        pickup: Option<String>,

        /// Drop-off address
        #[arg(long, requires = "pickup")]
        dropoff: Option<String>,

        /// Distance
        #[arg(long, default_value_t = 0.0)]
        distance: f64,
    },

    /// Set the same status on several deliveries at once
    BulkStatus {
        /// New status
        status: String,

        /// Delivery IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show delivery statistics for today
    Stats {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the delivery list on every change until interrupted
    Watch,
}

impl DeliveryCommand {
    pub async fn run(&self, app: &mut App) -> Result<(), Box<dyn Error>> {
        app.require_user()?;
        let service = app.deliveries();

        match &self.command {
            DeliverySubcommand::List {
                format,
                search,
                partner,
            } => {
                if let Some(text) = search {
                    app.layout.set_search(text.as_str());
                }
                let deliveries = match partner {
                    Some(partner_id) => service.for_partner(partner_id).await?,
                    None => service.list().await?,
                };
                let deliveries: Vec<Delivery> = deliveries
                    .into_iter()
                    .filter(|d| app.layout.matches_search(&search_fields(d)))
                    .collect();

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&deliveries)?)
                    }
                    OutputFormat::Text => print_table(&deliveries),
                }
            }

            DeliverySubcommand::Show { id, format } => {
                let delivery = service.get(id).await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&delivery)?),
                    OutputFormat::Text => {
                        println!("{}", delivery);
                        println!("  Created:  {}", format_date(delivery.created_at));
                        println!("  Started:  {}", format_date(delivery.start_time));
                        if delivery.updated_at.is_some() {
                            println!("  Updated:  {}", format_date(delivery.updated_at));
                        }
                    }
                }
            }

            DeliverySubcommand::Create {
                order,
                partner,
                earnings,
                distance,
                status,
            } => {
                let new = NewDelivery::new(order, partner)
                    .with_earnings(*earnings)
                    .with_distance(*distance)
                    .with_status(DeliveryStatus::from(status.as_str()));
                let id = service.create(new).await?;
                println!("Created delivery {}", id);
            }

            DeliverySubcommand::Status { id, status } => {
                let status = DeliveryStatus::from(status.as_str());
                service.update_status(id, status.clone()).await?;
                println!("Delivery {} is now {}", id, status);
            }

            DeliverySubcommand::Assign {
                order,
                partner,
                customer,
                pickup,
                dropoff,
                distance,
            } => {
                let partner = app
                    .partners()
                    .get(partner)
                    .await?
                    .ok_or_else(|| format!("Partner not found: {}", partner))?;

                let mut order = Order::new(order).with_distance(*distance);
                if let Some(name) = customer {
                    order = order.with_customer(name);
                }
                if let (Some(from), Some(to)) = (pickup, dropoff) {
                    order = order.with_route(from, to);
                }

                let id = service.assign_partner(&order, &partner).await?;
                println!("Assigned order {} to {} (delivery {})", order.id, partner.name, id);
            }

            DeliverySubcommand::BulkStatus { status, ids } => {
                let status = DeliveryStatus::from(status.as_str());
                service.bulk_update_status(ids, status.clone()).await?;
                println!("Updated {} deliveries to {}", ids.len(), status);
            }

            DeliverySubcommand::Stats { format } => {
                let stats = service.statistics().await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                    OutputFormat::Text => println!("{}", stats),
                }
            }

            DeliverySubcommand::Watch => {
                let _subscription = service.subscribe(|deliveries| {
                    println!("--- {} deliveries ---", deliveries.len());
                    print_table(&deliveries);
                })?;
                watch_until_interrupted(app).await?;
            }
        }

        Ok(())
    }
}

fn search_fields(delivery: &Delivery) -> Vec<&str> {
    let mut fields = vec![
        delivery.id.as_str(),
        delivery.order_id.as_str(),
        delivery.partner_id.as_str(),
        delivery.status.as_str(),
    ];
    fields.extend(delivery.partner_name.as_deref());
    fields.extend(delivery.customer_name.as_deref());
    fields
}

fn print_table(deliveries: &[Delivery]) {
    if deliveries.is_empty() {
        println!("No deliveries found.");
        return;
    }

    println!(
        "{:<32}  {:<12}  {:<16}  {:<10}  {:>9}  Created",
        "ID", "Order", "Partner", "Status", "Earnings"
    );
    println!("{}", "-".repeat(100));
    for d in deliveries {
        let partner = d.partner_name.as_deref().unwrap_or(&d.partner_id);
        println!(
            "{:<32}  {:<12}  {:<16}  {:<10}  {:>9.2}  {}",
            d.id,
            truncate(&d.order_id, 12),
            truncate(partner, 16),
            truncate(d.status.as_str(), 10),
            d.earnings,
            format_date(d.created_at)
        );
    }
    println!("\nTotal: {} deliveries", deliveries.len());
}
