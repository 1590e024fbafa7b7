use agritech::types::{Coordinates, Forecast, SoilAnalysis};
use reqwest::Client;
use std::env;

/// Attempts to parse JSON and shows error info on failure
fn try_parse<T: serde::de::DeserializeOwned>(json: &str, type_name: &str) {
    println!("\n>>> Attempting to parse as {type_name} <<<");
    match serde_json::from_str::<T>(json) {
        Ok(_) => println!("SUCCESS: Parsed {type_name} correctly"),
        Err(e) => println!("FAILED: {e}"),
    }
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

async fn fetch_text(client: &Client, url: &str) -> Option<String> {
    match client.get(url).send().await {
        Ok(resp) => {
            println!("Status: {}", resp.status());
            match resp.text().await {
                Ok(text) => {
                    println!("Response length: {} bytes", text.len());
                    Some(text)
                }
                Err(e) => {
                    println!("Failed to read body: {e}");
                    None
                }
            }
        }
        Err(e) => {
            println!("Request failed: {e}");
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let api_key =
        env::var("OPENWEATHER_API_KEY").expect("OPENWEATHER_API_KEY environment variable not set");
    let backend =
        env::var("AGRITECH_BACKEND_URL").unwrap_or_else(|_| "http://localhost:8000/api".to_string());
    let paris = Coordinates::new(48.8566, 2.3522);

    let client = Client::new();
    let base_url = agritech::weather::DEFAULT_BASE_URL;

    banner("TEST 1: GET /forecast");
    let url = format!(
        "{base_url}/forecast?lat={}&lon={}&units=metric&appid={api_key}",
        paris.lat, paris.lon
    );
    if let Some(text) = fetch_text(&client, &url).await {
        try_parse::<Forecast>(&text, "Forecast");
    }

    banner("TEST 2: WeatherClient::current");
    let weather = agritech::WeatherClient::new(Some(api_key));
    match weather.current(paris).await {
        Ok(data) => println!("{data:#?}"),
        Err(e) => println!("FAILED ({:?}): {e}", e.kind()),
    }

    banner("TEST 3: GET soil-analysis");
    let url = format!("{backend}/soil-analysis?lat={}&lon={}", paris.lat, paris.lon);
    if let Some(text) = fetch_text(&client, &url).await {
        try_parse::<SoilAnalysis>(&text, "SoilAnalysis");
    }
}
