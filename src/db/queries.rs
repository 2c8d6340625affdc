use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{ForecastRow, WeatherRow};
use super::{no_filter_error, WeatherStore};
use crate::domain::{
    ForecastQuery, ForecastRecord, NewForecast, NewWeatherRecord, WeatherDeleteFilter,
    WeatherQuery, WeatherRecord,
};
use crate::errors::AppError;

const WEATHER_COLUMNS: &str = "id, city, country, temperature, feels_like, temp_min, temp_max,
        pressure, humidity, wind_speed, wind_deg, clouds, weather_main, weather_description,
        sunrise, sunset, timezone, forecast_date, recorded_at";

const FORECAST_COLUMNS: &str = "id, city_name, temp, description, date, recorded_at";

/// Build an `ILIKE` pattern matching `needle` anywhere, with LIKE
/// metacharacters in the input taken literally.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// SELECT for current-weather history. Conditions are ANDed.
pub(crate) fn weather_select(query: &WeatherQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM weather_data", WEATHER_COLUMNS));

    if query.city_contains.is_some() || query.date.is_some() {
        qb.push(" WHERE ");
        let mut conditions = qb.separated(" AND ");
        if let Some(city) = &query.city_contains {
            conditions.push("city ILIKE ");
            conditions.push_bind_unseparated(like_pattern(city));
        }
        if let Some(date) = query.date {
            conditions.push("forecast_date::date = ");
            conditions.push_bind_unseparated(date);
        }
    }

    qb.push(" ORDER BY recorded_at DESC, id DESC OFFSET ");
    qb.push_bind(query.skip);
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
    }
    qb
}

/// DELETE for the bulk current-weather filter. Date bounds are inclusive.
pub(crate) fn weather_delete(
    filter: &WeatherDeleteFilter,
) -> Result<QueryBuilder<'static, Postgres>, AppError> {
    if filter.is_empty() {
        return Err(no_filter_error());
    }

    let mut qb = QueryBuilder::new("DELETE FROM weather_data WHERE ");
    {
        let mut conditions = qb.separated(" AND ");
        if let Some(city) = &filter.city_contains {
            conditions.push("city ILIKE ");
            conditions.push_bind_unseparated(like_pattern(city));
        }
        if let Some(start) = filter.start_date {
            conditions.push("forecast_date::date >= ");
            conditions.push_bind_unseparated(start);
        }
        if let Some(end) = filter.end_date {
            conditions.push("forecast_date::date <= ");
            conditions.push_bind_unseparated(end);
        }
    }
    Ok(qb)
}

/// SELECT for forecasts, ordered by city then date.
pub(crate) fn forecast_select(query: &ForecastQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM forecasts", FORECAST_COLUMNS));

    if query.city_contains.is_some() || query.date.is_some() {
        qb.push(" WHERE ");
        let mut conditions = qb.separated(" AND ");
        if let Some(city) = &query.city_contains {
            conditions.push("city_name ILIKE ");
            conditions.push_bind_unseparated(like_pattern(city));
        }
        if let Some(date) = query.date {
            conditions.push("date::date = ");
            conditions.push_bind_unseparated(date);
        }
    }

    qb.push(" ORDER BY city_name, date, id OFFSET ");
    qb.push_bind(query.skip);
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
    }
    qb
}

/// Postgres-backed record store.
#[derive(Debug, Clone)]
pub struct PgWeatherStore {
    pool: PgPool,
}

impl PgWeatherStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WeatherStore for PgWeatherStore {
    async fn insert_weather(&self, record: NewWeatherRecord) -> Result<WeatherRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, WeatherRow>(&format!(
            "INSERT INTO weather_data (
                city, country, temperature, feels_like, temp_min, temp_max,
                pressure, humidity, wind_speed, wind_deg, clouds,
                weather_main, weather_description, sunrise, sunset, timezone,
                forecast_date, recorded_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, NOW()
            )
            RETURNING {}",
            WEATHER_COLUMNS
        ))
        .bind(&record.city)
        .bind(&record.country)
        .bind(record.temperature)
        .bind(record.feels_like)
        .bind(record.temp_min)
        .bind(record.temp_max)
        .bind(record.pressure)
        .bind(record.humidity)
        .bind(record.wind_speed)
        .bind(record.wind_deg)
        .bind(record.clouds)
        .bind(&record.weather_main)
        .bind(&record.weather_description)
        .bind(record.sunrise)
        .bind(record.sunset)
        .bind(record.timezone)
        .bind(record.forecast_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn query_weather(&self, query: &WeatherQuery) -> Result<Vec<WeatherRecord>, AppError> {
        let rows = weather_select(query)
            .build_query_as::<WeatherRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(WeatherRecord::from).collect())
    }

    async fn delete_weather_by_id(&self, id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM weather_data WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_weather_by_filter(
        &self,
        filter: &WeatherDeleteFilter,
    ) -> Result<u64, AppError> {
        let result = weather_delete(filter)?.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn forecast_dates(&self, city_name: &str) -> Result<Vec<NaiveDateTime>, AppError> {
        let dates = sqlx::query_scalar::<_, NaiveDateTime>(
            "SELECT date FROM forecasts WHERE city_name = $1",
        )
        .bind(city_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }

    async fn insert_forecasts(
        &self,
        forecasts: Vec<NewForecast>,
    ) -> Result<Vec<ForecastRecord>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(forecasts.len());

        for forecast in forecasts {
            let row = sqlx::query_as::<_, ForecastRow>(&format!(
                "INSERT INTO forecasts (id, city_name, temp, description, date, recorded_at)
                 VALUES ($1, $2, $3, $4, $5, NOW())
                 RETURNING {}",
                FORECAST_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(&forecast.city_name)
            .bind(forecast.temp)
            .bind(&forecast.description)
            .bind(forecast.date)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(ForecastRecord::from(row));
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn query_forecasts(
        &self,
        query: &ForecastQuery,
    ) -> Result<Vec<ForecastRecord>, AppError> {
        let rows = forecast_select(query)
            .build_query_as::<ForecastRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ForecastRecord::from).collect())
    }

    async fn delete_forecast_by_id(&self, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM forecasts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Collapse whitespace so multi-line column lists compare cleanly.
    fn normalized(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("London"), "%London%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_weather_select_without_filters() {
        let qb = weather_select(&WeatherQuery {
            skip: 0,
            limit: Some(100),
            ..Default::default()
        });
        let sql = normalized(qb.sql());
        assert!(sql.starts_with("SELECT id, city, country,"));
        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("FROM weather_data ORDER BY recorded_at DESC, id DESC OFFSET $1 LIMIT $2"));
    }

    #[test]
    fn test_weather_select_with_city_and_date() {
        let qb = weather_select(&WeatherQuery {
            city_contains: Some("lon".into()),
            date: NaiveDate::from_ymd_opt(2024, 1, 15),
            skip: 5,
            limit: Some(10),
        });
        let sql = normalized(qb.sql());
        assert!(sql.ends_with(
            "FROM weather_data WHERE city ILIKE $1 AND forecast_date::date = $2 \
             ORDER BY recorded_at DESC, id DESC OFFSET $3 LIMIT $4"
        ));
    }

    #[test]
    fn test_weather_select_date_only() {
        let qb = weather_select(&WeatherQuery {
            date: NaiveDate::from_ymd_opt(2024, 1, 15),
            ..Default::default()
        });
        let sql = normalized(qb.sql());
        assert!(sql.contains("WHERE forecast_date::date = $1 ORDER BY"));
        assert!(sql.ends_with("OFFSET $2"));
    }

    #[test]
    fn test_weather_delete_requires_filter() {
        assert!(matches!(
            weather_delete(&WeatherDeleteFilter::default()),
            Err(AppError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_weather_delete_with_range() {
        let qb = weather_delete(&WeatherDeleteFilter {
            city_contains: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31),
        })
        .unwrap();
        assert_eq!(
            qb.sql(),
            "DELETE FROM weather_data WHERE forecast_date::date >= $1 AND forecast_date::date <= $2"
        );
    }

    #[test]
    fn test_weather_delete_all_criteria() {
        let qb = weather_delete(&WeatherDeleteFilter {
            city_contains: Some("par".into()),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31),
        })
        .unwrap();
        assert_eq!(
            qb.sql(),
            "DELETE FROM weather_data WHERE city ILIKE $1 \
             AND forecast_date::date >= $2 AND forecast_date::date <= $3"
        );
    }

    #[test]
    fn test_forecast_select_ordering_and_filters() {
        let qb = forecast_select(&ForecastQuery {
            city_contains: Some("Paris".into()),
            date: NaiveDate::from_ymd_opt(2024, 3, 2),
            skip: 0,
            limit: None,
        });
        assert_eq!(
            qb.sql(),
            "SELECT id, city_name, temp, description, date, recorded_at FROM forecasts \
             WHERE city_name ILIKE $1 AND date::date = $2 ORDER BY city_name, date, id OFFSET $3"
        );
    }

    #[test]
    fn test_forecast_select_with_limit() {
        let qb = forecast_select(&ForecastQuery {
            city_contains: None,
            date: None,
            skip: 10,
            limit: Some(5),
        });
        assert_eq!(
            qb.sql(),
            "SELECT id, city_name, temp, description, date, recorded_at FROM forecasts \
             ORDER BY city_name, date, id OFFSET $1 LIMIT $2"
        );
    }
}
