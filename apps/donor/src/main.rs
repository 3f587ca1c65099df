use std::{path::PathBuf, str::FromStr, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    ArrivalState, DirectoryClient, DonationSession, FixedPosition, GeolocationProvider,
    ItemForm, MissingGeolocation, MissingMap, ResolutionOutcome,
};
use shared::domain::{City, Coordinate};
use tracing::info;

mod config;
mod console;

use config::{load_settings, DEFAULT_CONFIG_PATH};
use console::ConsoleUi;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Overrides the directory service address from the settings file.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the cities the directory serves.
    Cities,
    /// Resolve a location, pick an organization, fill the cart and print the next-page URL.
    Locate {
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        city: Option<String>,
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Without it the handoff carries the city only.
        #[arg(long)]
        ngo_id: Option<String>,
        /// `category:name:quantity:condition`, repeatable.
        #[arg(long = "item")]
        items: Vec<ItemSpec>,
    },
    /// Parse the query string of a next-page URL the way the receiving page would.
    Arrive { query: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemSpec {
    category: String,
    name: String,
    quantity: i64,
    condition: String,
}

impl FromStr for ItemSpec {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let shape = || format!("expected category:name:quantity:condition, got {raw:?}");
        let (category, rest) = raw.split_once(':').ok_or_else(shape)?;
        let (rest, condition) = rest.rsplit_once(':').ok_or_else(shape)?;
        let (name, quantity) = rest.rsplit_once(':').ok_or_else(shape)?;
        let quantity = quantity
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("quantity must be a whole number, got {quantity:?}"))?;
        Ok(Self {
            category: category.to_string(),
            name: name.to_string(),
            quantity,
            condition: condition.to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config);
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }

    match cli.command {
        Command::Cities => {
            let directory = DirectoryClient::http(&settings.server_url, settings.request_timeout)?;
            for city in directory.list_cities().await? {
                println!("{city}");
            }
        }
        Command::Locate {
            city,
            lat,
            lng,
            ngo_id,
            items,
        } => {
            let position = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(
                    Coordinate::new(lat, lng)
                        .ok_or_else(|| anyhow!("coordinate must be finite"))?,
                ),
                _ => None,
            };
            let geolocation: Arc<dyn GeolocationProvider> = match position {
                Some(position) => Arc::new(FixedPosition(position)),
                None => Arc::new(MissingGeolocation),
            };
            let directory = Arc::new(DirectoryClient::http(
                &settings.server_url,
                settings.request_timeout,
            )?);
            let session = DonationSession::new(
                settings,
                directory,
                geolocation,
                Arc::new(ConsoleUi),
                Arc::new(MissingMap),
            );

            let mut outcome = session.boot().await;
            if let Some(city) = city {
                outcome = session.handle_use_city(City::new(city)).await;
            }
            let resolution = match outcome {
                ResolutionOutcome::Resolved(resolution) => resolution,
                other if position.is_none() => {
                    bail!("could not locate the donor ({other:?}); pass --city or --lat/--lng")
                }
                other => bail!("location did not resolve: {other:?}"),
            };
            if !resolution.can_continue() {
                bail!("no organizations found in {}", resolution.city);
            }

            if let Some(ngo_id) = ngo_id {
                session
                    .handle_select_organization(&ngo_id)
                    .await
                    .with_context(|| format!("{ngo_id} is not listed for {}", resolution.city))?;
            }

            for item in items {
                session.handle_quantity_input(item.quantity).await;
                session
                    .handle_add_item(ItemForm {
                        category: item.category,
                        name: item.name,
                        condition: item.condition,
                    })
                    .await?;
            }

            let url = session.handle_continue().await?;
            info!(%url, "handoff ready");
            println!("{url}");
        }
        Command::Arrive { query } => {
            let query = query.split_once('?').map_or(query.as_str(), |(_, q)| q);
            let arrival = ArrivalState::from_query(query);
            println!("{}", arrival.ngo_name_label());
            println!("{}", arrival.ngo_id_label());
            println!("{}", arrival.city_label());
            println!("coordinate: {}", arrival.coordinate_label());
            for item in &arrival.items {
                println!(
                    "  {} x{} ({}, {})",
                    item.name, item.quantity, item.category, item.condition
                );
            }
            for warning in &arrival.warnings {
                eprintln!("warning: {warning}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
