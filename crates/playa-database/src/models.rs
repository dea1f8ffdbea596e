//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A category table. The declaration order is the order in which combined
/// results list their categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Art,
    Camp,
    Event,
    UserPoi,
}

impl Table {
    /// Every category table, in merge order.
    pub const ALL: [Table; 4] = [Table::Art, Table::Camp, Table::Event, Table::UserPoi];

    /// The SQL table name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Art => "arts",
            Self::Camp => "camps",
            Self::Event => "events",
            Self::UserPoi => "user_pois",
        }
    }

    /// Resolve a SQL table name. Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.name() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a location from nullable columns.
    ///
    /// Missing coordinates and the 0/0 placeholder both mean "unlocated".
    pub fn from_columns(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) if lat != 0.0 || lon != 0.0 => Some(Self::new(lat, lon)),
            _ => None,
        }
    }
}

/// A latitude/longitude bounding box, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl Region {
    /// Create a region from two opposite corners, in any order.
    pub fn new(corner_a: Location, corner_b: Location) -> Self {
        Self {
            min_latitude: corner_a.latitude.min(corner_b.latitude),
            max_latitude: corner_a.latitude.max(corner_b.latitude),
            min_longitude: corner_a.longitude.min(corner_b.longitude),
            max_longitude: corner_a.longitude.max(corner_b.longitude),
        }
    }

    pub fn contains(&self, location: &Location) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&location.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&location.longitude)
    }
}

/// Fields shared by every playa item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Row id assigned by the store on insert. Zero before insert.
    pub id: i64,
    /// Identifier assigned by the data source, stable across re-imports.
    pub playa_id: Option<String>,
    pub name: String,
    pub description: String,
    pub url: Option<String>,
    pub contact: Option<String>,
    pub playa_address: Option<String>,
    pub location: Option<Location>,
    pub favorite: bool,
}

impl ItemInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_playa_id(mut self, playa_id: impl Into<String>) -> Self {
        self.playa_id = Some(playa_id.into());
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some(Location::new(latitude, longitude));
        self
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }
}

/// Art installation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Art {
    pub info: ItemInfo,
    pub artist: String,
    pub artist_location: String,
    pub image_url: Option<String>,
    pub audio_tour_url: Option<String>,
}

/// Theme camp.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Camp {
    pub info: ItemInfo,
}

/// A single occurrence of a scheduled event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Event {
    pub info: ItemInfo,
    pub event_type: String,
    pub all_day: bool,
    pub check_location: bool,
    /// External id of the hosting camp. May refer to a camp that was never
    /// imported.
    pub camp_playa_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub start_time_pretty: String,
    pub end_time: DateTime<Utc>,
    pub end_time_pretty: String,
}

/// A marker placed by the user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserPoi {
    pub info: ItemInfo,
}

/// Any item the data layer serves, tagged by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayaItem {
    Art(Art),
    Camp(Camp),
    Event(Event),
    UserPoi(UserPoi),
}

impl PlayaItem {
    pub fn info(&self) -> &ItemInfo {
        match self {
            Self::Art(art) => &art.info,
            Self::Camp(camp) => &camp.info,
            Self::Event(event) => &event.info,
            Self::UserPoi(poi) => &poi.info,
        }
    }

    pub fn info_mut(&mut self) -> &mut ItemInfo {
        match self {
            Self::Art(art) => &mut art.info,
            Self::Camp(camp) => &mut camp.info,
            Self::Event(event) => &mut event.info,
            Self::UserPoi(poi) => &mut poi.info,
        }
    }

    /// The table this item is stored in, which is also its category.
    pub fn table(&self) -> Table {
        match self {
            Self::Art(_) => Table::Art,
            Self::Camp(_) => Table::Camp,
            Self::Event(_) => Table::Event,
            Self::UserPoi(_) => Table::UserPoi,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn is_favorite(&self) -> bool {
        self.info().favorite
    }
}

impl From<Art> for PlayaItem {
    fn from(art: Art) -> Self {
        Self::Art(art)
    }
}

impl From<Camp> for PlayaItem {
    fn from(camp: Camp) -> Self {
        Self::Camp(camp)
    }
}

impl From<Event> for PlayaItem {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<UserPoi> for PlayaItem {
    fn from(poi: UserPoi) -> Self {
        Self::UserPoi(poi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_roundtrip() {
        for table in Table::ALL {
            assert_eq!(Table::from_name(table.name()), Some(table));
        }
        assert_eq!(Table::from_name("events"), Some(Table::Event));
        assert_eq!(Table::from_name("sessions"), None);
    }

    #[test]
    fn test_table_order_is_merge_order() {
        let mut shuffled = vec![Table::UserPoi, Table::Event, Table::Art, Table::Camp];
        shuffled.sort();
        assert_eq!(shuffled, Table::ALL.to_vec());
    }

    #[test]
    fn test_location_placeholder_is_unlocated() {
        assert_eq!(Location::from_columns(Some(0.0), Some(0.0)), None);
        assert_eq!(Location::from_columns(None, Some(-119.2)), None);
        assert_eq!(
            Location::from_columns(Some(40.78), Some(-119.2)),
            Some(Location::new(40.78, -119.2))
        );
    }

    #[test]
    fn test_region_contains_edges() {
        let region = Region::new(Location::new(40.80, -119.19), Location::new(40.77, -119.22));
        assert!(region.contains(&Location::new(40.77, -119.22)));
        assert!(region.contains(&Location::new(40.785, -119.20)));
        assert!(!region.contains(&Location::new(40.81, -119.20)));
    }

    #[test]
    fn test_playa_item_dispatch() {
        let mut item = PlayaItem::from(Camp {
            info: ItemInfo::new("Center Camp").with_playa_id("C1"),
        });
        assert_eq!(item.table(), Table::Camp);
        assert_eq!(item.name(), "Center Camp");
        assert!(!item.is_favorite());

        item.info_mut().favorite = true;
        assert!(item.is_favorite());
    }
}
