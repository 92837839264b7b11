use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use laundry_core::{AppError, Config, ConfigError, PredictionError};
use laundry_ui::error_mapping::api_error;
use laundry_ui::{
    present, render_text, AppServices, CitySelection, GeoOutcome, GeoResolver,
    OrchestratorState, RunOutcome, DETECTING_STATUS,
};
use laundry_weather::{Coordinates, FixedLocation, LaundryApi, ModelScore, NominatimGeocoder};

#[derive(Debug, Parser)]
#[command(author, version, about = "Should the laundry go outside tomorrow?")]
struct Cli {
    /// Config file to use instead of the one in the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Prediction backend origin; overrides the config file and LAUNDRY_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Detect the location once, then predict for the selected city (default).
    Run,
    /// Predict for one city.
    Predict {
        #[arg(long)]
        city: String,
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
    /// List city index matches in server order.
    Search { query: String },
    /// Name the place at a position.
    Locate {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Show the backend's offline model scores.
    Evaluate,
    /// Line-driven session: `?text` searches, `#n` picks a match,
    /// anything else submits a city, `quit` exits.
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    laundry_core::init()?;

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config).await,
        Commands::Predict { city, lat, lon } => {
            let coordinates = lat.zip(lon).map(|(lat, lon)| Coordinates::new(lat, lon));
            predict(&config, &city, coordinates).await
        }
        Commands::Search { query } => search(&config, &query).await,
        Commands::Locate { lat, lon } => locate(&config, Coordinates::new(lat, lon)).await,
        Commands::Evaluate => evaluate(&config).await,
        Commands::Interactive => interactive(&config).await,
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let (mut config, _) = Config::load_validated(cli.config.as_deref()).map_err(config_error)?;

    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(describe(
                ConfigError::Invalid(validation.error_summary()).into(),
            ));
        }
    }

    tracing::debug!("Loaded config: {:?}", config);
    Ok(config)
}

/// Attach the short user-facing hint to a technical error.
fn describe(e: AppError) -> anyhow::Error {
    anyhow::anyhow!("{} ({})", e.user_message(), e)
}

fn config_error(e: anyhow::Error) -> anyhow::Error {
    match e.downcast::<ConfigError>() {
        Ok(e) => describe(e.into()),
        Err(e) => e,
    }
}

fn api(config: &Config) -> Result<LaundryApi> {
    LaundryApi::new(&config.api.base_url, config.api.request_timeout()).map_err(|e| describe(api_error(e)))
}

fn print_state(state: &OrchestratorState) {
    println!("{}", render_text(&present(state)));
}

async fn start_session(config: &Config) -> Result<AppServices> {
    let services = AppServices::from_config(config).map_err(describe)?;

    if config.location.position().is_some() {
        eprintln!("{DETECTING_STATUS}");
    }
    if let GeoOutcome::Resolved(place) = services.detect_location().await {
        println!("Detected location: {place}");
    }

    services.start();
    Ok(services)
}

async fn run(config: &Config) -> Result<()> {
    let services = start_session(config).await?;
    let state = services.wait_for_run_after(0).await;
    print_state(&state);
    services.shutdown();
    Ok(())
}

async fn predict(config: &Config, city: &str, coordinates: Option<Coordinates>) -> Result<()> {
    let services = AppServices::from_config(config).map_err(describe)?;
    let orchestrator = services.orchestrator();

    let outcome = orchestrator.run_with(city, coordinates).await;
    print_state(&orchestrator.state());

    match outcome {
        RunOutcome::Published(_) | RunOutcome::Superseded => Ok(()),
        RunOutcome::Failed(failure) => anyhow::bail!("{}", failure.hint),
        RunOutcome::Rejected => Err(describe(PredictionError::EmptyCity.into())),
    }
}

async fn search(config: &Config, query: &str) -> Result<()> {
    let cities = api(config)?
        .search_city(query)
        .await
        .map_err(|e| describe(api_error(e)))?;

    if cities.is_empty() {
        println!("No cities match {query:?}");
    }
    for (i, city) in cities.iter().enumerate() {
        println!("#{i} {}", city.label());
    }
    Ok(())
}

async fn locate(config: &Config, position: Coordinates) -> Result<()> {
    let geocoder = NominatimGeocoder::new(
        &config.geocoder.base_url,
        &config.geocoder.user_agent,
        config.api.request_timeout(),
    )
    .map_err(|e| describe(api_error(e)))?;

    let resolver = GeoResolver::new(Arc::new(FixedLocation(position)), Arc::new(geocoder));
    let selection = CitySelection::new(config.default_city.as_str());

    eprintln!("{DETECTING_STATUS}");
    match resolver.detect(&selection).await {
        GeoOutcome::Resolved(place) => {
            println!("{place}");
            Ok(())
        }
        GeoOutcome::Failed { reason, hint } => anyhow::bail!("{hint} ({reason})"),
        GeoOutcome::Unavailable | GeoOutcome::AlreadyAttempted => {
            anyhow::bail!("Location lookup did not run")
        }
    }
}

async fn evaluate(config: &Config) -> Result<()> {
    let evaluation = api(config)?
        .evaluate()
        .await
        .map_err(|e| describe(api_error(e)))?;

    for (model, score) in &evaluation.results {
        match score {
            ModelScore::Metrics { mae, rmse } => {
                println!("{model:<10} MAE {mae:>8.3}  RMSE {rmse:>8.3}")
            }
            ModelScore::Failed { error } => println!("{model:<10} error: {error}"),
        }
    }
    match (&evaluation.best, evaluation.best_mae) {
        (Some(best), Some(mae)) => println!("Best: {best} (MAE {mae:.3})"),
        (Some(best), None) => println!("Best: {best}"),
        _ => println!("No model could be scored"),
    }
    Ok(())
}

async fn interactive(config: &Config) -> Result<()> {
    let services = start_session(config).await?;
    print_state(&services.wait_for_run_after(0).await);

    let search_wait =
        config.search.debounce() + config.api.request_timeout() + Duration::from_secs(1);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        let revision = services.selection().current().revision;
        let latest_run = services.orchestrator().state().latest_run;

        if line.is_empty() {
            continue;
        } else if line == "quit" || line == "exit" {
            break;
        } else if let Some(text) = line.strip_prefix('?') {
            let mut updates = services.search().subscribe();
            services.search().on_input(text);
            updates.borrow_and_update();

            if text.chars().count() < config.search.min_query_len {
                println!(
                    "Type at least {} characters to search",
                    config.search.min_query_len
                );
                continue;
            }
            if tokio::time::timeout(search_wait, updates.changed()).await.is_err() {
                println!("Search timed out");
                continue;
            }
            let candidates = services.search().candidates();
            if candidates.is_empty() {
                println!("No matches");
            }
            for (i, city) in candidates.iter().enumerate() {
                println!("#{i} {}", city.label());
            }
            continue;
        } else if let Some(index) = line.strip_prefix('#') {
            let Ok(index) = index.trim().parse::<usize>() else {
                println!("Pick a match by number, e.g. #0");
                continue;
            };
            if services.pick_candidate(index).is_none() {
                println!("No match #{index}");
                continue;
            }
        } else {
            services.submit_city(line);
        }

        if services.selection().current().revision == revision {
            println!("Already showing {}", services.selection().city());
            continue;
        }
        print_state(&services.wait_for_run_after(latest_run).await);
    }

    services.shutdown();
    Ok(())
}
