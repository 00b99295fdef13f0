//! Domain data structures for bins, sensor readings, and collection routes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier for a bin known to binwatch.
pub struct BinId(pub String);

impl fmt::Display for BinId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<&str> for BinId {
    fn from(raw: &str) -> Self {
        BinId(raw.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier for a single sensor reading.
pub struct ReadingId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// WGS84 coordinate in decimal degrees.
pub struct Coordinate {
    /// Latitude, positive north.
    pub latitude: f64,
    /// Longitude, positive east.
    pub longitude: f64,
}

impl Coordinate {
    /// Construct a new coordinate.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both components are finite and inside their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{},{}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A physical waste receptacle with a fixed location and capacity.
pub struct Bin {
    /// Unique identifier.
    pub id: BinId,
    /// Display name shown on the dashboard.
    pub name: String,
    /// Where the bin stands.
    pub location: Coordinate,
    /// Street address.
    pub address: String,
    /// Distance from the sensor to the bottom of the empty bin.
    pub capacity: f64,
    /// Cached flag derived from the most recent reading.
    #[serde(default)]
    pub is_full: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One ultrasonic distance measurement.
pub struct Reading {
    /// Unique identifier.
    pub id: ReadingId,
    /// Bin the sensor belongs to.
    pub bin_id: BinId,
    /// Measured distance from the sensor to the waste surface.
    pub distance: f64,
    /// Capture time.
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Occupancy derived from a reading and a bin's capacity.
pub struct FillState {
    /// Height of the waste column (`capacity - distance`).
    pub fill_level: f64,
    /// Fill level as a share of capacity, in percent.
    pub fill_percentage: f64,
    /// Distance the fill was computed from.
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Per-request view of a bin used when planning routes.
pub struct BinMetadata {
    /// Bin identifier.
    pub id: BinId,
    /// Display name.
    pub name: String,
    /// Bin location.
    pub location: Coordinate,
    /// Street address.
    pub address: String,
    /// Current fill percentage.
    pub fill_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Rectangle enclosing a route.
pub struct Bounds {
    /// North-east corner.
    pub northeast: Coordinate,
    /// South-west corner.
    pub southwest: Coordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// A single leg between two consecutive stops.
pub struct RouteLeg {
    /// Leg distance in meters.
    pub distance_meters: u64,
    /// Leg duration in seconds.
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Route returned by a directions provider.
pub struct OptimizedRoute {
    /// Visiting order as indices into the submitted intermediate stops.
    pub waypoint_order: Vec<usize>,
    /// Encoded overview polyline.
    pub polyline: String,
    /// Bounding box of the whole route.
    pub bounds: Bounds,
    /// Legs in travel order.
    pub legs: Vec<RouteLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Request to plan a collection route.
///
/// The last resolvable identifier is the destination, all others are stops
/// whose order the provider may change.
pub struct RouteRequest {
    /// Bins to visit, destination last.
    pub bin_ids: Vec<BinId>,
    /// Where the collection vehicle starts.
    pub origin: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Planned collection route.
pub struct RouteResult {
    /// Encoded overview polyline.
    pub polyline: String,
    /// Bounding box of the whole route.
    pub bounds: Bounds,
    /// Bins in collection order, destination last.
    pub optimized_bins: Vec<BinMetadata>,
    /// Total distance in kilometers, two decimals.
    pub total_distance_km: f64,
    /// Total duration in minutes, one decimal.
    pub total_duration_min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Dashboard view of a bin with its current fill state.
pub struct BinStatus {
    /// Stored bin.
    #[serde(flatten)]
    pub bin: Bin,
    /// Fill derived from the latest reading.
    #[serde(flatten)]
    pub fill: FillState,
    /// Capture time of the latest reading, if any.
    pub last_reading_at: Option<DateTime<Utc>>,
}
