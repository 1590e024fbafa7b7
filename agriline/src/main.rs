#![allow(clippy::multiple_crate_versions)]

use agriconfig::AgriConfig;
use agritech::types::{
    AirQualityData, AqiCategory, ClimateData, Coordinates, Forecast, LoginCredentials, Polygon,
    RegisterData, SoilAnalysis, WeatherData,
};
use agritech::{
    Access, AirQualityFetcher, AirQualityResource, Auth, Chatbot, ClimateResource, FetchState,
    SoilClient, SoilResource, WeatherResource,
};
use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::{Color, Colorize};
use serde::Serialize;
use std::io::{self, Write};
use std::process;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "warn,agritech=info,agriline=info";
const DASHBOARD_ROUTE: &str = "/dashboard";

#[derive(Parser)]
#[command(name = "agriline", about = "A CLI for the AgriTech dashboard services")]
struct Cli {
    /// Print raw JSON instead of formatted output
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct Location {
    /// Latitude in decimal degrees
    #[arg(long, default_value_t = 48.8566, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude in decimal degrees
    #[arg(long, default_value_t = 2.3522, allow_negative_numbers = true)]
    lon: f64,
}

impl From<Location> for Coordinates {
    fn from(location: Location) -> Self {
        Self::new(location.lat, location.lon)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Current weather, simulated when the provider is unreachable
    Weather {
        #[command(flatten)]
        location: Location,
        /// Also print the three-hourly forecast
        #[arg(long)]
        forecast: bool,
    },
    /// Soil analysis from the dashboard backend
    Soil {
        #[command(flatten)]
        location: Location,
    },
    /// Soil moisture, NDVI and precipitation for a field
    Climate {
        /// Field boundary as "lon,lat;lon,lat;lon,lat" (default: a field near Paris)
        #[arg(long, allow_hyphen_values = true)]
        polygon: Option<String>,
    },
    /// Air quality index and main pollutant
    Air {
        #[command(flatten)]
        location: Location,
    },
    /// Ask the farming advisor a question
    Ask {
        /// The question, e.g. "Quand arroser mes tomates ?"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Show starter questions for the advisor
    Suggest {
        /// Print a single random suggestion
        #[arg(long)]
        random: bool,
    },
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Generate shell completions
    #[command(hide = true)]
    Completions {
        /// The shell to generate completions for
        shell: Shell,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config() -> Result<AgriConfig> {
    let config = AgriConfig::load().with_context(|| "Failed to load agritech config")?;
    tracing::debug!(backend = %config.backend.base_url, demo_mode = config.auth.demo_mode, "loaded config");
    Ok(config)
}

fn auth_for(config: &AgriConfig) -> Result<Auth<agritech::FileTokenStore>> {
    let store = config
        .token_store()
        .with_context(|| "Failed to locate the token file")?;
    Ok(Auth::new(config.http_client(), store))
}

/// Parses `"lon,lat;lon,lat;..."` into a polygon of at least three points.
fn parse_polygon(input: &str) -> Result<Polygon> {
    let mut points = Vec::new();
    for pair in input.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
        let Some((lon, lat)) = pair.split_once(',') else {
            bail!("Invalid point '{pair}': expected lon,lat");
        };
        let lon: f64 = lon
            .trim()
            .parse()
            .with_context(|| format!("Invalid longitude in '{pair}'"))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .with_context(|| format!("Invalid latitude in '{pair}'"))?;
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            bail!("Point '{pair}' is out of range");
        }
        points.push([lon, lat]);
    }
    if points.len() < 3 {
        bail!("A polygon needs at least three points, got {}", points.len());
    }
    Ok(Polygon::new(points))
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("A password is required");
    }
    Ok(password)
}

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

fn format_clock(timestamp: i64) -> String {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|at| at.to_offset(local_offset()).format(format_description!("[hour]:[minute]")).ok())
        .unwrap_or_else(|| "--:--".to_string())
}

fn format_slot(timestamp: i64) -> String {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|at| {
            at.to_offset(local_offset())
                .format(format_description!("[day]/[month] [hour]h"))
                .ok()
        })
        .unwrap_or_else(|| timestamp.to_string())
}

fn temperature_color(celsius: f64) -> Color {
    if celsius < 5.0 {
        Color::Blue
    } else if celsius < 15.0 {
        Color::Cyan
    } else if celsius < 25.0 {
        Color::Green
    } else if celsius < 32.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn format_weather(weather: &WeatherData) -> String {
    let mut lines = vec![format!(
        "{} {}",
        weather.city_name.bold(),
        if weather.simulated {
            "(simulated)".dimmed().to_string()
        } else {
            weather.country.dimmed().to_string()
        }
    )];
    lines.push(format!(
        "{}  {} (feels like {:.1}°C)",
        format!("{:.1}°C", weather.temperature).color(temperature_color(weather.temperature)),
        weather.description,
        weather.feels_like
    ));
    lines.push(format!(
        "humidity {}%  pressure {} hPa  clouds {}%  visibility {:.1} km",
        weather.humidity,
        weather.pressure,
        weather.clouds,
        f64::from(weather.visibility) / 1000.0
    ));
    lines.push(format!(
        "wind {:.1} m/s from {} ({}°)",
        weather.wind_speed,
        weather.wind_compass(),
        weather.wind_direction
    ));
    if let Some(rain) = weather.rain1h {
        lines.push(format!("rain {rain:.1} mm/h"));
    }
    if let Some(snow) = weather.snow1h {
        lines.push(format!("snow {snow:.1} mm/h"));
    }
    lines.push(format!(
        "sunrise {}  sunset {}  ({})",
        format_clock(weather.sunrise),
        format_clock(weather.sunset),
        if weather.is_daytime() { "day" } else { "night" }
    ));
    lines.join("\n")
}

fn format_forecast(forecast: &Forecast) -> String {
    forecast
        .list
        .iter()
        .map(|entry| {
            let description = entry
                .weather
                .first()
                .map_or("", |condition| condition.description.as_str());
            let pop = entry
                .pop
                .map(|pop| format!("  {:>3.0}% rain", pop * 100.0))
                .unwrap_or_default();
            format!(
                "{:14} {}  {}{}",
                format_slot(entry.dt),
                format!("{:>5.1}°C", entry.main.temp).color(temperature_color(entry.main.temp)),
                description,
                pop
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_soil(soil: &SoilAnalysis) -> String {
    let mut lines = vec![format!("pH {:.1}", soil.ph_level)];
    let nutrients = [
        ("nitrogen", soil.nitrogen),
        ("phosphorus", soil.phosphorus),
        ("potassium", soil.potassium),
        ("organic matter", soil.organic_matter),
        ("clay", soil.clay),
        ("sand", soil.sand),
    ];
    for (name, value) in nutrients {
        if let Some(value) = value {
            lines.push(format!("{name:15} {value:.1}"));
        }
    }
    for recommendation in &soil.recommendations {
        lines.push(format!("- {recommendation}"));
    }
    lines.join("\n")
}

fn format_climate(climate: &ClimateData) -> String {
    let mut output = format!(
        "soil moisture {:.1}% ({})\nNDVI {:.2} ({})\nprecipitation {:.1} mm ({})",
        climate.soil_moisture,
        climate.soil_moisture_category(),
        climate.ndvi,
        climate.ndvi_category(),
        climate.precipitation,
        climate.precipitation_category()
    );
    if climate.simulated {
        output.push_str(&format!("\n{}", "(simulated)".dimmed()));
    }
    output
}

const fn aqi_color(category: AqiCategory) -> Color {
    match category {
        AqiCategory::Good => Color::Green,
        AqiCategory::Moderate => Color::Yellow,
        AqiCategory::UnhealthyForSensitiveGroups => Color::BrightRed,
        AqiCategory::Unhealthy => Color::Red,
        AqiCategory::VeryUnhealthy => Color::Magenta,
        AqiCategory::Hazardous => Color::BrightMagenta,
    }
}

fn format_air(air: &AirQualityData) -> String {
    [
        format!(
            "AQI {} ({})  main pollutant {}",
            air.aqi,
            air.category.label().color(aqi_color(air.category)),
            air.main_pollutant
        ),
        format!(
            "PM2.5 {:.1}  PM10 {:.1}  O3 {:.1}  NO2 {:.1}  SO2 {:.1}  CO {:.2}",
            air.pollutants.pm25,
            air.pollutants.pm10,
            air.pollutants.o3,
            air.pollutants.no2,
            air.pollutants.so2,
            air.pollutants.co
        ),
        air.health_implications.clone(),
        air.recommendations.clone(),
    ]
    .join("\n")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Hook result as JSON: whatever data is held plus the error message.
fn print_state_json<T: Serialize>(state: &FetchState<T>) -> Result<()> {
    print_json(&serde_json::json!({
        "data": state.data,
        "error": state.error_message(),
    }))
}

fn handle_error(err: &anyhow::Error, json: bool) -> ! {
    let api_error = err.downcast_ref::<agritech::Error>();
    if json {
        let body = serde_json::json!({
            "kind": api_error.map(agritech::Error::kind),
            "message": err.to_string(),
            "status": api_error.and_then(agritech::Error::status).map(|status| status.as_u16()),
        });
        println!("{body}");
    } else {
        eprintln!("{}", format!("{err:#}").red());
    }
    process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let json = cli.json;
    if let Err(err) = run(cli).await {
        handle_error(&err, json);
    }

    Ok(())
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "agriline", &mut io::stdout());
        }
        Command::Weather { location, forecast } => {
            let config = load_config()?;
            let resource = WeatherResource::weather(config.weather_client()?);
            let state = resource.bind(location.into()).await;
            if json {
                return print_state_json(&state);
            }
            if let Some(message) = state.error_message() {
                eprintln!(
                    "{}",
                    format!("Live weather unavailable ({message}); showing simulated data").yellow()
                );
            }
            let Some(report) = state.data else {
                bail!("No weather data available");
            };
            println!("{}", format_weather(&report.current));
            if forecast {
                println!("\n{}", format_forecast(&report.forecast));
            }
        }
        Command::Soil { location } => {
            let config = load_config()?;
            let resource = SoilResource::soil(SoilClient::new(config.http_client()));
            let state = resource.bind(location.into()).await;
            if json {
                return print_state_json(&state);
            }
            if let Some(err) = state.error {
                return Err(err.into());
            }
            if let Some(soil) = state.data {
                println!("{}", format_soil(&soil));
            }
        }
        Command::Climate { polygon } => {
            let polygon = match polygon {
                Some(polygon) => parse_polygon(&polygon)?,
                None => Polygon::default_field(),
            };
            let config = load_config()?;
            let resource = ClimateResource::climate(config.climate_client()?);
            let state = resource.bind(polygon).await;
            if json {
                return print_state_json(&state);
            }
            if let Some(err) = state.error {
                return Err(err.into());
            }
            if let Some(climate) = state.data {
                println!("{}", format_climate(&climate));
            }
        }
        Command::Air { location } => {
            let config = load_config()?;
            let fetcher = AirQualityFetcher::new(config.air_quality_client()?)
                .with_backend(config.http_client());
            let state = AirQualityResource::air_quality(fetcher)
                .bind(location.into())
                .await;
            if json {
                return print_state_json(&state);
            }
            if let Some(err) = state.error {
                return Err(err.into());
            }
            if let Some(air) = state.data {
                println!("{}", format_air(&air));
            }
        }
        Command::Ask { question } => {
            let config = load_config()?;
            let chatbot = Chatbot::new(config.advice_client()?);
            let answer = chatbot.ask(&question.join(" ")).await?;
            if json {
                return print_json(&serde_json::json!({ "answer": answer }));
            }
            println!("{answer}");
        }
        Command::Suggest { random } => {
            let config = load_config()?;
            let chatbot = Chatbot::new(config.advice_client()?);
            let suggestions = if random {
                vec![chatbot.random_suggestion()]
            } else {
                chatbot.suggestions().to_vec()
            };
            if json {
                return print_json(&suggestions);
            }
            for suggestion in suggestions {
                println!("- {suggestion}");
            }
        }
        Command::Login { email, password } => {
            let config = load_config()?;
            let password = password.map_or_else(read_password, Ok)?;
            let auth = auth_for(&config)?;
            let user = auth.login(&LoginCredentials::new(email, password)).await?;
            if json {
                return print_json(&user);
            }
            println!("Signed in as {} <{}>", user.name.bold(), user.email);
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let config = load_config()?;
            let password = password.map_or_else(read_password, Ok)?;
            let auth = auth_for(&config)?;
            let user = auth
                .register(&RegisterData::new(name, email, password))
                .await?;
            if json {
                return print_json(&user);
            }
            println!("Welcome, {} <{}>", user.name.bold(), user.email);
        }
        Command::Logout => {
            let config = load_config()?;
            auth_for(&config)?.logout();
            if !json {
                println!("Signed out");
            }
        }
        Command::Whoami => {
            let config = load_config()?;
            let auth = auth_for(&config)?;
            let state = auth.initialize().await;
            let access = config.route_guard().check(&auth, DASHBOARD_ROUTE);
            let access = match access {
                Access::Granted if !state.is_authenticated() => "open (demo mode)".to_string(),
                Access::Granted => "granted".to_string(),
                Access::Pending => "pending".to_string(),
                Access::RedirectToLogin { from } => {
                    format!("sign in required ({} -> {})", from, Access::login_route())
                }
            };
            if json {
                return print_json(&serde_json::json!({
                    "authenticated": state.is_authenticated(),
                    "user": state.user,
                    "dashboard": access,
                }));
            }
            match &state.user {
                Some(user) => println!("{} <{}> [{}]", user.name.bold(), user.email, user.role),
                None => println!("{}", "Not signed in".dimmed()),
            }
            println!("dashboard: {access}");
        }
    }

    Ok(())
}
