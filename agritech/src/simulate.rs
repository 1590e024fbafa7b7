//! Placeholder records used when a provider is unconfigured or unreachable.
//!
//! Values are drawn from realistic ranges so widgets never render empty.
//! Generators take an explicit RNG; the `*_now` helpers use the thread RNG.

use crate::types::{
    ClimateData, Clouds, Coordinates, Forecast, ForecastCity, ForecastEntry, ForecastMain,
    WeatherCondition, WeatherData, Wind,
};
use rand::Rng;
use time::format_description::FormatItem;
use time::macros::{format_description, time};
use time::{Duration, OffsetDateTime, Time};

/// Number of forecast slots produced by [`forecast`].
pub const FORECAST_POINTS: usize = 8;
/// Spacing between forecast slots, in hours.
pub const FORECAST_STEP_HOURS: i64 = 3;

const DT_TXT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const SUNRISE: Time = time!(6:00);
const SUNSET: Time = time!(20:00);

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn today_at(at: Time) -> i64 {
    local_now().replace_time(at).unix_timestamp()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Label for simulated records; unset coordinates fall back to Paris.
#[must_use]
pub fn city_label(coords: Coordinates) -> String {
    if coords.lat == 0.0 || coords.lon == 0.0 {
        "Paris".to_string()
    } else {
        format!("{:.2}, {:.2}", coords.lat, coords.lon)
    }
}

/// Current conditions for `coords`.
pub fn weather<R: Rng + ?Sized>(coords: Coordinates, rng: &mut R) -> WeatherData {
    WeatherData {
        temperature: rng.gen_range(15.0..25.0),
        humidity: rng.gen_range(40..80),
        wind_speed: rng.gen_range(1.0..10.0),
        description: "ciel partiellement nuageux".to_string(),
        icon: "50d".to_string(),
        feels_like: rng.gen_range(14.0..24.0),
        pressure: rng.gen_range(1010..1030),
        visibility: rng.gen_range(8000..10_000),
        clouds: rng.gen_range(0..100),
        sunrise: today_at(SUNRISE),
        sunset: today_at(SUNSET),
        wind_direction: rng.gen_range(0..360),
        rain1h: rng.gen_bool(0.3).then(|| rng.gen_range(0.0..5.0)),
        snow1h: None,
        country: "FR".to_string(),
        city_name: city_label(coords),
        simulated: true,
    }
}

/// Eight three-hour slots starting now, following a smooth temperature curve.
pub fn forecast<R: Rng + ?Sized>(_coords: Coordinates, rng: &mut R) -> Forecast {
    let now = OffsetDateTime::now_utc();
    let list = (0..FORECAST_POINTS)
        .map(|index| {
            #[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
            let (step, curve) = (index as i64, (index as f64 / 4.0).sin() * 5.0);
            let at = now + Duration::hours(step * FORECAST_STEP_HOURS);
            ForecastEntry {
                dt: at.unix_timestamp(),
                main: ForecastMain {
                    temp: 15.0 + curve + rng.gen_range(0.0..3.0),
                    feels_like: 14.0 + curve + rng.gen_range(0.0..3.0),
                    humidity: rng.gen_range(40..80),
                    temp_min: None,
                    temp_max: None,
                    pressure: None,
                },
                weather: vec![WeatherCondition {
                    id: rng.gen_range(800..830),
                    main: "Clouds".to_string(),
                    description: "nuages épars".to_string(),
                    icon: "03d".to_string(),
                }],
                clouds: Clouds {
                    all: rng.gen_range(0..100),
                },
                wind: Wind {
                    speed: rng.gen_range(2.0..10.0),
                    deg: rng.gen_range(0..360),
                },
                rain: None,
                pop: Some(rng.gen_range(0.0..1.0)),
                dt_txt: at.format(DT_TXT).unwrap_or_default(),
            }
        })
        .collect();

    Forecast {
        list,
        city: ForecastCity {
            name: "Paris".to_string(),
            country: "FR".to_string(),
            sunrise: today_at(SUNRISE),
            sunset: today_at(SUNSET),
        },
    }
}

/// Soil moisture, NDVI and precipitation for a healthy field.
pub fn climate<R: Rng + ?Sized>(rng: &mut R) -> ClimateData {
    ClimateData {
        soil_moisture: round_to(rng.gen_range(20.0..60.0), 1),
        ndvi: round_to(rng.gen_range(0.3..0.8), 2),
        precipitation: round_to(rng.gen_range(0.0..30.0), 1),
        simulated: true,
    }
}

#[must_use]
pub fn weather_now(coords: Coordinates) -> WeatherData {
    weather(coords, &mut rand::thread_rng())
}

#[must_use]
pub fn forecast_now(coords: Coordinates) -> Forecast {
    forecast(coords, &mut rand::thread_rng())
}

#[must_use]
pub fn climate_now() -> ClimateData {
    climate(&mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const PARIS: Coordinates = Coordinates::new(48.8566, 2.3522);

    #[test]
    fn weather_stays_within_physical_ranges() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let data = weather(PARIS, &mut rng);
            assert!((40..=80).contains(&data.humidity), "humidity {}", data.humidity);
            assert!((1010..=1030).contains(&data.pressure), "pressure {}", data.pressure);
            assert!((15.0..=25.0).contains(&data.temperature));
            assert!((1.0..=10.0).contains(&data.wind_speed));
            assert!((8000..10_000).contains(&data.visibility));
            assert!(data.clouds < 100);
            assert!(data.wind_direction < 360);
            assert!(data.rain1h.map_or(true, |rain| (0.0..5.0).contains(&rain)));
            assert!(!data.city_name.is_empty());
            assert!(data.simulated);
        }
    }

    #[test]
    fn weather_labels_city_from_coordinates() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(weather(PARIS, &mut rng).city_name, "48.86, 2.35");
        assert_eq!(
            weather(Coordinates::new(0.0, 0.0), &mut rng).city_name,
            "Paris"
        );
    }

    #[test]
    fn sunrise_precedes_sunset() {
        let data = weather_now(PARIS);
        assert!(data.sunrise < data.sunset);
        assert_eq!(data.sunset - data.sunrise, 14 * 3600);
    }

    #[test]
    fn forecast_has_eight_three_hour_slots() {
        let mut rng = StdRng::seed_from_u64(42);
        let forecast = forecast(PARIS, &mut rng);
        assert_eq!(forecast.list.len(), FORECAST_POINTS);
        for pair in forecast.list.windows(2) {
            assert_eq!(pair[1].dt - pair[0].dt, FORECAST_STEP_HOURS * 3600);
        }
        for entry in &forecast.list {
            assert!((10.0..=23.0).contains(&entry.main.temp));
            assert!((40..80).contains(&entry.main.humidity));
            assert_eq!(entry.weather[0].icon, "03d");
            assert!((800..830).contains(&entry.weather[0].id));
            assert_eq!(entry.dt_txt.len(), "2024-01-01 00:00:00".len());
        }
    }

    #[test]
    fn climate_values_are_rounded_and_bounded() {
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let data = climate(&mut rng);
            assert!((20.0..=60.0).contains(&data.soil_moisture));
            assert!((0.3..=0.8).contains(&data.ndvi));
            assert!((0.0..=30.0).contains(&data.precipitation));
            assert!((data.ndvi * 100.0 - (data.ndvi * 100.0).round()).abs() < 1e-9);
        }
    }

    #[test]
    fn same_seed_gives_same_record() {
        let first = weather(PARIS, &mut StdRng::seed_from_u64(3));
        let second = weather(PARIS, &mut StdRng::seed_from_u64(3));
        assert_eq!(first.temperature, second.temperature);
        assert_eq!(first.humidity, second.humidity);
    }
}
