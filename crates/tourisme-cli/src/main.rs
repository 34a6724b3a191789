//! Tourisme CLI - inspect and exercise the reference-data cache.
//!
//! One-shot commands run against a fresh cache. `shell` keeps one cache
//! alive across commands so TTL, de-duplication and invalidation can be
//! observed interactively.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tourisme_core::models::{CityInput, ZoneId, ZoneInput};
use tourisme_core::utils::truncate_string;
use tourisme_core::{ApiClient, CircuitWizard, Config, ReferenceAdmin, ReferenceDataCache};

// ============================================================================
// Constants
// ============================================================================

/// Directory for daily log files. Unset means stderr only.
const ENV_LOG_DIR: &str = "TOURISME_LOG_DIR";

const LOG_FILE_PREFIX: &str = "tourisme.log";

/// Maximum description width in activity listings
const DESCRIPTION_WIDTH: usize = 48;

const USAGE: &str = "\
Usage: tourisme <command> [args]

Commands:
  zones                          List zones
  cities <zone>                  List the cities of a zone
  activities <zone> [city]       List activities, optionally for one city
  preload <zone>                 Load cities and activities of a zone together
  fresh <zone>                   Whether a zone's data is cached and fresh
  invalidate <zone>              Drop a zone's cities and activities
  clear                          Drop everything
  stats                          Cache counters
  plan <zone> <city> <ids...>    Run the circuit wizard, print the draft
  add-zone <name...>             Create a zone
  add-city <zone> <name...>      Create a city in a zone
  config [save]                  Show (or write) the effective configuration
  shell                          Interactive loop over the commands above";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(ENV_LOG_DIR) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(Path::new(&dir), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Everything a command needs: the configuration and one shared cache.
struct App {
    config: Config,
    client: ApiClient,
    cache: Arc<ReferenceDataCache>,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let mut client = ApiClient::new(&config.api_url, config.request_timeout())
            .with_context(|| format!("Invalid API URL {}", config.api_url))?;
        if let Some(token) = config.api_token.clone() {
            client.set_token(token);
        }
        let cache = Arc::new(ReferenceDataCache::new(
            Arc::new(client.clone()),
            config.cache_ttl(),
        ));
        Ok(Self { config, client, cache })
    }

    fn admin(&self) -> ReferenceAdmin {
        ReferenceAdmin::new(Arc::new(self.client.clone()), Arc::clone(&self.cache))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    info!(api_url = %config.api_url, ttl_secs = config.cache_ttl_secs, "Tourisme CLI starting");
    let app = App::new(config)?;

    if args[0] == "shell" {
        return run_shell(&app).await;
    }

    let words: Vec<&str> = args.iter().map(String::as_str).collect();
    run_command(&app, &words).await
}

/// Read commands from stdin until EOF or `quit`.
async fn run_shell(app: &App) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"tourisme> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.first() {
            None => continue,
            Some(&"quit") | Some(&"exit") => break,
            Some(&"help") => println!("{}", USAGE),
            Some(&"shell") => eprintln!("Already in the shell"),
            Some(_) => {
                if let Err(e) = run_command(app, &words).await {
                    eprintln!("Error: {:#}", e);
                }
            }
        }
    }

    Ok(())
}

async fn run_command(app: &App, words: &[&str]) -> Result<()> {
    let (command, rest) = words
        .split_first()
        .ok_or_else(|| anyhow!("Missing command"))?;
    let cache = &app.cache;

    match *command {
        "zones" => {
            for zone in cache.zones().await?.iter() {
                println!("{:>6}  {}", zone.id, zone.name);
            }
        }
        "cities" => {
            let zone_id = zone_arg(rest)?;
            for city in cache.cities_for_zone(zone_id).await?.iter() {
                println!("{:>6}  {}", city.id, city.name);
            }
            print_age(cache, zone_id);
        }
        "activities" => {
            let zone_id = zone_arg(rest)?;
            let city_id = rest.get(1).map(|raw| parse_id(raw, "city")).transpose()?;
            let activities = cache.activities_for_zone(zone_id).await?;
            for activity in activities
                .iter()
                .filter(|a| city_id.map_or(true, |city| a.is_offered_in(city)))
            {
                let city = activity
                    .city_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:>6}  {:<28} {:>6}  {}",
                    activity.id,
                    truncate_string(&activity.name, 28),
                    city,
                    truncate_string(&activity.description, DESCRIPTION_WIDTH)
                );
            }
            print_age(cache, zone_id);
        }
        "preload" => {
            let zone_id = zone_arg(rest)?;
            let data = cache.preload_zone_data(zone_id).await?;
            println!(
                "Zone {}: {} cities, {} activities",
                zone_id,
                data.cities.len(),
                data.activities.len()
            );
        }
        "fresh" => {
            let zone_id = zone_arg(rest)?;
            println!("{}", cache.has_fresh_data_for_zone(zone_id));
        }
        "invalidate" => {
            let zone_id = zone_arg(rest)?;
            cache.invalidate_zone(zone_id);
            println!("Zone {} invalidated", zone_id);
        }
        "clear" => {
            cache.clear_all();
            println!("Cache cleared");
        }
        "stats" => {
            let stats = cache.stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
            println!("hit ratio: {:.0}%", stats.hit_ratio() * 100.0);
        }
        "plan" => {
            if rest.len() < 3 {
                bail!("Usage: plan <zone> <city> <activity ids...>");
            }
            let mut wizard = CircuitWizard::new(Arc::clone(cache));
            let zone_id = parse_id(rest[0], "zone")?;
            if wizard.needs_loading_indicator(zone_id) {
                eprintln!("Loading zone {}...", zone_id);
            }
            wizard.select_zone(zone_id).await?;
            wizard.select_city(parse_id(rest[1], "city")?)?;
            for raw in &rest[2..] {
                wizard.toggle_activity(parse_id(raw, "activity")?)?;
            }
            let draft = wizard.review()?;
            eprintln!("{}:", wizard.step().title());
            println!("{}", serde_json::to_string_pretty(&draft)?);
        }
        "add-zone" => {
            let name = join_name(rest)?;
            let zone = app.admin().create_zone(&ZoneInput { name }).await?;
            println!("Created zone {} ({})", zone.id, zone.name);
        }
        "add-city" => {
            let zone_id = zone_arg(rest)?;
            let name = join_name(&rest[1..])?;
            let city = app.admin().create_city(&CityInput { name, zone_id }).await?;
            println!("Created city {} ({}) in zone {}", city.id, city.name, city.zone_id);
        }
        "config" => match rest.first() {
            Some(&"save") => {
                app.config.save()?;
                println!("Saved to {}", Config::config_path()?.display());
            }
            Some(other) => bail!("Unknown config action: {}", other),
            None => {
                let mut shown = app.config.clone();
                if shown.api_token.is_some() {
                    shown.api_token = Some("********".to_string());
                }
                println!("{}", serde_json::to_string_pretty(&shown)?);
            }
        },
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }

    Ok(())
}

fn zone_arg(rest: &[&str]) -> Result<ZoneId> {
    let raw = rest.first().ok_or_else(|| anyhow!("Missing zone id"))?;
    parse_id(raw, "zone")
}

fn parse_id(raw: &str, what: &str) -> Result<i64> {
    raw.parse()
        .with_context(|| format!("Invalid {} id: {}", what, raw))
}

fn join_name(words: &[&str]) -> Result<String> {
    if words.is_empty() {
        bail!("Missing name");
    }
    Ok(words.join(" "))
}

fn print_age(cache: &ReferenceDataCache, zone_id: ZoneId) {
    if let Some(age) = cache.zone_entry_age(zone_id) {
        eprintln!("(cached {})", age);
    }
}
