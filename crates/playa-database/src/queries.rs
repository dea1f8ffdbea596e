//! The fixed catalog of query shapes served by the data layer.
//!
//! Every function here returns a [`Query`]: SQL text, bound parameters, the
//! tables the statement reads, and a row mapper. A query does nothing until
//! it is executed, which lets the live query engine run the same value again
//! whenever one of its tables changes and lets an interceptor rewrite the
//! text before each run.

use crate::record::PlayaRecord;
use crate::{Art, DatabaseResult, Event, Region, Table};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::fmt;
use tracing::debug;


/// Maps one result row into a value.
pub type RowMapper<T> = fn(&Row<'_>) -> rusqlite::Result<T>;

/// A parameterized, re-runnable query.
pub struct Query<T> {
    sql: String,
    params: Vec<Value>,
    tables: Vec<Table>,
    mapper: RowMapper<T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            sql: self.sql.clone(),
            params: self.params.clone(),
            tables: self.tables.clone(),
            mapper: self.mapper,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("tables", &self.tables)
            .finish()
    }
}

impl<T> Query<T> {
    pub fn new(sql: impl Into<String>, tables: Vec<Table>, mapper: RowMapper<T>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            tables,
            mapper,
        }
    }

    /// Bind the next positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Tables whose changes invalidate this query's results.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Replace the SQL text, keeping parameters, tables and mapper.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    /// Run the query and map every row, in the order the statement yields.
    pub fn execute(&self, conn: &Connection) -> DatabaseResult<Vec<T>> {
        let mut stmt = conn.prepare_cached(&self.sql)?;
        let mapper = self.mapper;
        let rows = stmt
            .query_map(params_from_iter(self.params.iter()), |row| mapper(row))?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(tables = ?self.tables, rows = rows.len(), "Query executed");
        Ok(rows)
    }
}

/// Wrap a search term for a `LIKE ... ESCAPE '\'` substring match.
///
/// `%` and `_` inside the term match literally.
pub fn add_wildcards(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn order_for(table: Table) -> &'static str {
    match table {
        Table::Event => "start_time, id",
        _ => "name, id",
    }
}

fn select<T: PlayaRecord>(filter: &str) -> String {
    let table = T::TABLE;
    if filter.is_empty() {
        format!("SELECT {} FROM {table} ORDER BY {}", T::COLUMNS, order_for(table))
    } else {
        format!(
            "SELECT {} FROM {table} WHERE {filter} ORDER BY {}",
            T::COLUMNS,
            order_for(table)
        )
    }
}

fn millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

// ==========================================
// Any category
// ==========================================

/// Every row of a table. Events come back by start time, everything else by name.
pub fn all<T: PlayaRecord>() -> Query<T> {
    Query::new(select::<T>(""), vec![T::TABLE], T::from_row)
}

/// Rows flagged as favorite.
pub fn favorites<T: PlayaRecord>() -> Query<T> {
    Query::new(select::<T>("favorite = 1"), vec![T::TABLE], T::from_row)
}

/// Rows whose name contains `term`, ignoring ASCII case.
///
/// Events have their own grouped variant, see [`events_by_name`].
pub fn by_name<T: PlayaRecord>(term: &str) -> Query<T> {
    Query::new(
        select::<T>("name LIKE ?1 ESCAPE '\\'"),
        vec![T::TABLE],
        T::from_row,
    )
    .bind(add_wildcards(term))
}

/// The first row carrying the given external id.
pub fn by_playa_id<T: PlayaRecord>(playa_id: &str) -> Query<T> {
    let sql = format!("{} LIMIT 1", select::<T>("playa_id = ?1"));
    Query::new(sql, vec![T::TABLE], T::from_row).bind(playa_id.to_string())
}

// ==========================================
// Art
// ==========================================

pub fn art_with_audio_tour() -> Query<Art> {
    Query::new(
        select::<Art>("audio_tour_url IS NOT NULL"),
        vec![Table::Art],
        Art::from_row,
    )
}

// ==========================================
// Events
// ==========================================

/// Events whose name contains `term`, one row per distinct name.
///
/// Occurrences of the same event share a name, so each group is represented
/// by its earliest occurrence and groups are ordered by that start time.
pub fn events_by_name(term: &str) -> Query<Event> {
    let sql = format!(
        "SELECT {}, MIN(start_time) AS first_start FROM events
         WHERE name LIKE ?1 ESCAPE '\\'
         GROUP BY name ORDER BY first_start, id",
        Event::COLUMNS
    );
    Query::new(sql, vec![Table::Event], Event::from_row).bind(add_wildcards(term))
}

/// Events starting on `day` as observed at the festival, whose clock runs
/// `offset` from UTC. An empty `types` slice matches every type.
pub fn events_on_day_of_types(
    day: NaiveDate,
    offset: FixedOffset,
    types: &[String],
) -> Query<Event> {
    // Local midnight, expressed in UTC.
    let start = day.and_time(NaiveTime::MIN).and_utc()
        - Duration::seconds(i64::from(offset.local_minus_utc()));
    let end = start + Duration::days(1);

    let mut filter = String::from("start_time >= ?1 AND start_time < ?2");
    if !types.is_empty() {
        let placeholders = (0..types.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        filter.push_str(&format!(" AND event_type IN ({placeholders})"));
    }

    let mut query = Query::new(select::<Event>(&filter), vec![Table::Event], Event::from_row)
        .bind(millis(start))
        .bind(millis(end));
    for event_type in types {
        query = query.bind(event_type.clone());
    }
    query
}

/// Events hosted by the camp with the given external id. A camp without
/// one hosts nothing.
pub fn events_by_camp_playa_id(camp_playa_id: Option<&str>) -> Query<Event> {
    Query::new(
        select::<Event>("camp_playa_id = ?1"),
        vec![Table::Event],
        Event::from_row,
    )
    .bind(camp_playa_id.map(str::to_string))
}

/// Every other occurrence of an event: same external id, different row.
pub fn other_occurrences(playa_id: Option<&str>, id: i64) -> Query<Event> {
    Query::new(
        select::<Event>("playa_id = ?1 AND id != ?2"),
        vec![Table::Event],
        Event::from_row,
    )
    .bind(playa_id.map(str::to_string))
    .bind(id)
}

/// Events starting within `[start, end]`.
pub fn events_in_date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Query<Event> {
    Query::new(
        select::<Event>("start_time >= ?1 AND start_time <= ?2"),
        vec![Table::Event],
        Event::from_row,
    )
    .bind(millis(start))
    .bind(millis(end))
}

/// Events located inside `region`, plus every favorite event wherever it is.
pub fn events_in_region_or_favorite(region: &Region) -> Query<Event> {
    Query::new(
        select::<Event>(
            "(latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4) OR favorite = 1",
        ),
        vec![Table::Event],
        Event::from_row,
    )
    .bind(region.min_latitude)
    .bind(region.max_latitude)
    .bind(region.min_longitude)
    .bind(region.max_longitude)
}
