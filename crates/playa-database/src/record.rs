//! Row mapping and write statements for each category table.
//!
//! Every table shares the same leading columns, so the projection for each
//! record starts with [`ITEM_COLUMNS`]. Rows are read by column name, which
//! lets a query interceptor replace a column with an expression of the same
//! alias without touching the mappers.

use crate::{Art, Camp, DatabaseResult, Event, ItemInfo, Location, PlayaItem, Table, UserPoi};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

macro_rules! item_columns {
    () => {
        "id, playa_id, name, description, url, contact, playa_address, latitude, longitude, favorite"
    };
}

/// Columns shared by every category table.
const ITEM_COLUMNS: &str = item_columns!();

/// The location fragment of every projection.
pub const LOCATION_COLUMNS: &str = "latitude, longitude";

const ART_COLUMNS: &str = concat!(
    item_columns!(),
    ", artist, artist_location, image_url, audio_tour_url"
);

const EVENT_COLUMNS: &str = concat!(
    item_columns!(),
    ", event_type, all_day, check_location, camp_playa_id, start_time, start_time_pretty, end_time, end_time_pretty"
);

/// A row type stored in one of the category tables.
pub trait PlayaRecord: Sized + Send + 'static {
    /// Table the record lives in.
    const TABLE: Table;
    /// Projection read by [`PlayaRecord::from_row`].
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn info(&self) -> &ItemInfo;

    fn info_mut(&mut self) -> &mut ItemInfo;

    /// Insert the record, returning the id assigned by the store.
    fn insert(&self, conn: &Connection) -> DatabaseResult<i64>;

    /// Replace every column of the row with `self.info().id`.
    fn update(&self, conn: &Connection) -> DatabaseResult<usize>;

    fn into_item(self) -> PlayaItem;
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ItemInfo> {
    Ok(ItemInfo {
        id: row.get("id")?,
        playa_id: row.get("playa_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        url: row.get("url")?,
        contact: row.get("contact")?,
        playa_address: row.get("playa_address")?,
        location: Location::from_columns(row.get("latitude")?, row.get("longitude")?),
        favorite: row.get("favorite")?,
    })
}

fn latitude(info: &ItemInfo) -> Option<f64> {
    info.location.map(|l| l.latitude)
}

fn longitude(info: &ItemInfo) -> Option<f64> {
    info.location.map(|l| l.longitude)
}

fn datetime_from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

/// Insert into one of the tables whose columns are exactly [`ITEM_COLUMNS`].
/// Any id already set on `info` is ignored.
fn insert_plain_item(conn: &Connection, table: Table, info: &ItemInfo) -> DatabaseResult<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {table} (playa_id, name, description, url, contact, playa_address, latitude, longitude, favorite)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        params![
            info.playa_id,
            info.name,
            info.description,
            info.url,
            info.contact,
            info.playa_address,
            latitude(info),
            longitude(info),
            info.favorite,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the row `info.id` names. An id that matches nothing, including
/// the unsaved id 0, changes no rows.
fn update_plain_item(conn: &Connection, table: Table, info: &ItemInfo) -> DatabaseResult<usize> {
    let count = conn.execute(
        &format!(
            "UPDATE {table} SET playa_id = ?1, name = ?2, description = ?3, url = ?4, contact = ?5,
             playa_address = ?6, latitude = ?7, longitude = ?8, favorite = ?9 WHERE id = ?10"
        ),
        params![
            info.playa_id,
            info.name,
            info.description,
            info.url,
            info.contact,
            info.playa_address,
            latitude(info),
            longitude(info),
            info.favorite,
            info.id,
        ],
    )?;
    Ok(count)
}

impl PlayaRecord for Art {
    const TABLE: Table = Table::Art;
    const COLUMNS: &'static str = ART_COLUMNS;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            info: item_from_row(row)?,
            artist: row.get("artist")?,
            artist_location: row.get("artist_location")?,
            image_url: row.get("image_url")?,
            audio_tour_url: row.get("audio_tour_url")?,
        })
    }

    fn info(&self) -> &ItemInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ItemInfo {
        &mut self.info
    }

    fn insert(&self, conn: &Connection) -> DatabaseResult<i64> {
        let info = &self.info;
        conn.execute(
            "INSERT INTO arts (playa_id, name, description, url, contact, playa_address, latitude, longitude, favorite,
                               artist, artist_location, image_url, audio_tour_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                info.playa_id,
                info.name,
                info.description,
                info.url,
                info.contact,
                info.playa_address,
                latitude(info),
                longitude(info),
                info.favorite,
                self.artist,
                self.artist_location,
                self.image_url,
                self.audio_tour_url,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection) -> DatabaseResult<usize> {
        let info = &self.info;
        let count = conn.execute(
            "UPDATE arts SET playa_id = ?1, name = ?2, description = ?3, url = ?4, contact = ?5,
                 playa_address = ?6, latitude = ?7, longitude = ?8, favorite = ?9,
                 artist = ?10, artist_location = ?11, image_url = ?12, audio_tour_url = ?13
             WHERE id = ?14",
            params![
                info.playa_id,
                info.name,
                info.description,
                info.url,
                info.contact,
                info.playa_address,
                latitude(info),
                longitude(info),
                info.favorite,
                self.artist,
                self.artist_location,
                self.image_url,
                self.audio_tour_url,
                info.id,
            ],
        )?;
        Ok(count)
    }

    fn into_item(self) -> PlayaItem {
        PlayaItem::Art(self)
    }
}

impl PlayaRecord for Camp {
    const TABLE: Table = Table::Camp;
    const COLUMNS: &'static str = ITEM_COLUMNS;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            info: item_from_row(row)?,
        })
    }

    fn info(&self) -> &ItemInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ItemInfo {
        &mut self.info
    }

    fn insert(&self, conn: &Connection) -> DatabaseResult<i64> {
        insert_plain_item(conn, Self::TABLE, &self.info)
    }

    fn update(&self, conn: &Connection) -> DatabaseResult<usize> {
        update_plain_item(conn, Self::TABLE, &self.info)
    }

    fn into_item(self) -> PlayaItem {
        PlayaItem::Camp(self)
    }
}

impl PlayaRecord for UserPoi {
    const TABLE: Table = Table::UserPoi;
    const COLUMNS: &'static str = ITEM_COLUMNS;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            info: item_from_row(row)?,
        })
    }

    fn info(&self) -> &ItemInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ItemInfo {
        &mut self.info
    }

    fn insert(&self, conn: &Connection) -> DatabaseResult<i64> {
        insert_plain_item(conn, Self::TABLE, &self.info)
    }

    fn update(&self, conn: &Connection) -> DatabaseResult<usize> {
        update_plain_item(conn, Self::TABLE, &self.info)
    }

    fn into_item(self) -> PlayaItem {
        PlayaItem::UserPoi(self)
    }
}

impl PlayaRecord for Event {
    const TABLE: Table = Table::Event;
    const COLUMNS: &'static str = EVENT_COLUMNS;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            info: item_from_row(row)?,
            event_type: row.get("event_type")?,
            all_day: row.get("all_day")?,
            check_location: row.get("check_location")?,
            camp_playa_id: row.get("camp_playa_id")?,
            start_time: datetime_from_millis(row.get("start_time")?),
            start_time_pretty: row.get("start_time_pretty")?,
            end_time: datetime_from_millis(row.get("end_time")?),
            end_time_pretty: row.get("end_time_pretty")?,
        })
    }

    fn info(&self) -> &ItemInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ItemInfo {
        &mut self.info
    }

    fn insert(&self, conn: &Connection) -> DatabaseResult<i64> {
        let info = &self.info;
        conn.execute(
            "INSERT INTO events (playa_id, name, description, url, contact, playa_address, latitude, longitude, favorite,
                                 event_type, all_day, check_location, camp_playa_id,
                                 start_time, start_time_pretty, end_time, end_time_pretty)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                info.playa_id,
                info.name,
                info.description,
                info.url,
                info.contact,
                info.playa_address,
                latitude(info),
                longitude(info),
                info.favorite,
                self.event_type,
                self.all_day,
                self.check_location,
                self.camp_playa_id,
                self.start_time.timestamp_millis(),
                self.start_time_pretty,
                self.end_time.timestamp_millis(),
                self.end_time_pretty,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection) -> DatabaseResult<usize> {
        let info = &self.info;
        let count = conn.execute(
            "UPDATE events SET playa_id = ?1, name = ?2, description = ?3, url = ?4, contact = ?5,
                 playa_address = ?6, latitude = ?7, longitude = ?8, favorite = ?9,
                 event_type = ?10, all_day = ?11, check_location = ?12, camp_playa_id = ?13,
                 start_time = ?14, start_time_pretty = ?15, end_time = ?16, end_time_pretty = ?17
             WHERE id = ?18",
            params![
                info.playa_id,
                info.name,
                info.description,
                info.url,
                info.contact,
                info.playa_address,
                latitude(info),
                longitude(info),
                info.favorite,
                self.event_type,
                self.all_day,
                self.check_location,
                self.camp_playa_id,
                self.start_time.timestamp_millis(),
                self.start_time_pretty,
                self.end_time.timestamp_millis(),
                self.end_time_pretty,
                info.id,
            ],
        )?;
        Ok(count)
    }

    fn into_item(self) -> PlayaItem {
        PlayaItem::Event(self)
    }
}

/// Update any item through its variant's routine.
pub(crate) fn update_item(conn: &Connection, item: &PlayaItem) -> DatabaseResult<usize> {
    match item {
        PlayaItem::Art(art) => art.update(conn),
        PlayaItem::Camp(camp) => camp.update(conn),
        PlayaItem::Event(event) => event.update(conn),
        PlayaItem::UserPoi(poi) => poi.update(conn),
    }
}
