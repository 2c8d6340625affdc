//! Provider JSON → domain records.
//!
//! Pure functions: fields are read by fixed path, every required path must be
//! present with the expected type, and `wind.deg` is the only field with a
//! default. Epoch seconds are converted to local wall-clock time.

use chrono::{DateTime, Local, NaiveDateTime};
use serde_json::Value;

use crate::domain::{NewForecast, NewWeatherRecord};
use crate::errors::AppError;

/// A dotted field path such as `main.temp` or `weather[0].main`.
fn lookup<'a>(raw: &'a Value, path: &str) -> Result<&'a Value, AppError> {
    let mut current = raw;
    for segment in path.split('.') {
        let (key, index) = match segment.split_once('[') {
            Some((key, rest)) => {
                let index = rest
                    .trim_end_matches(']')
                    .parse::<usize>()
                    .map_err(|_| AppError::InternalError(format!("bad field path {}", path)))?;
                (key, Some(index))
            }
            None => (segment, None),
        };

        current = current
            .get(key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| AppError::missing_field(path))?;
        if let Some(i) = index {
            current = current
                .get(i)
                .filter(|v| !v.is_null())
                .ok_or_else(|| AppError::missing_field(path))?;
        }
    }
    Ok(current)
}

fn float_at(raw: &Value, path: &str) -> Result<f64, AppError> {
    lookup(raw, path)?
        .as_f64()
        .ok_or_else(|| AppError::unexpected_type(path))
}

/// Integers also accept floats without a fractional part (`80.0`).
fn as_whole_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}

fn int_at(raw: &Value, path: &str) -> Result<i32, AppError> {
    as_whole_i64(lookup(raw, path)?)
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| AppError::unexpected_type(path))
}

fn string_at(raw: &Value, path: &str) -> Result<String, AppError> {
    lookup(raw, path)?
        .as_str()
        .map(String::from)
        .ok_or_else(|| AppError::unexpected_type(path))
}

fn timestamp_at(raw: &Value, path: &str) -> Result<NaiveDateTime, AppError> {
    let secs = as_whole_i64(lookup(raw, path)?).ok_or_else(|| AppError::unexpected_type(path))?;
    epoch_to_local(secs).ok_or_else(|| AppError::unexpected_type(path))
}

/// Interpret epoch seconds in the server's local timezone.
pub fn epoch_to_local(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|utc| utc.with_timezone(&Local).naive_local())
}

/// Normalize a current-weather payload.
pub fn normalize_current(raw: &Value) -> Result<NewWeatherRecord, AppError> {
    let wind_deg = match raw.get("wind").and_then(|w| w.get("deg")) {
        None | Some(Value::Null) => 0,
        Some(_) => int_at(raw, "wind.deg")?,
    };

    Ok(NewWeatherRecord {
        city: string_at(raw, "name")?,
        country: string_at(raw, "sys.country")?,
        temperature: float_at(raw, "main.temp")?,
        feels_like: float_at(raw, "main.feels_like")?,
        temp_min: float_at(raw, "main.temp_min")?,
        temp_max: float_at(raw, "main.temp_max")?,
        pressure: int_at(raw, "main.pressure")?,
        humidity: int_at(raw, "main.humidity")?,
        wind_speed: float_at(raw, "wind.speed")?,
        wind_deg,
        clouds: int_at(raw, "clouds.all")?,
        weather_main: string_at(raw, "weather[0].main")?,
        weather_description: string_at(raw, "weather[0].description")?,
        sunrise: timestamp_at(raw, "sys.sunrise")?,
        sunset: timestamp_at(raw, "sys.sunset")?,
        timezone: int_at(raw, "timezone")?,
        forecast_date: timestamp_at(raw, "dt")?,
    })
}

/// Normalize one entry of a forecast `list` for `city_name`.
///
/// The temperature is truncated toward zero and the description title-cased.
pub fn normalize_forecast_entry(city_name: &str, entry: &Value) -> Result<NewForecast, AppError> {
    let temp = float_at(entry, "main.temp")?.trunc();
    if !(i32::MIN as f64..=i32::MAX as f64).contains(&temp) {
        return Err(AppError::unexpected_type("main.temp"));
    }

    Ok(NewForecast {
        city_name: city_name.to_string(),
        temp: temp as i32,
        description: title_case(&string_at(entry, "weather[0].description")?),
        date: timestamp_at(entry, "dt")?,
    })
}

/// Upper-case the first letter of every word and lower-case the rest.
/// A word starts after any non-alphabetic character.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
