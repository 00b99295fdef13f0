//! Traits describing storage, directions, and realtime backends.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Error as ReqwestError;

use crate::model::{Bin, BinId, Coordinate, OptimizedRoute, Reading};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to backends.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The directions provider answered with a non-success status.
    #[error("Provider status: {0}")]
    Provider(String),
    /// The provider answered with a body we cannot interpret.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
    /// No bin with this identifier is stored.
    #[error("Bin not found: {0}")]
    BinNotFound(BinId),
    /// A reading was rejected before storing it.
    #[error("Invalid reading: {0}")]
    InvalidReading(String),
    /// Storage backend failed.
    #[error("Store error: {0}")]
    Store(String),
    /// Internal backend error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// Storage for bins and their sensor readings.
pub trait BinRepository: Send + Sync {
    /// All stored bins.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store cannot be read.
    async fn list_bins(&self) -> Result<Vec<Bin>, PortError>;

    /// Bins whose identifier is in `ids`. Unknown identifiers are skipped and
    /// the returned order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store cannot be read.
    async fn find_bins_by_ids(&self, ids: &[BinId]) -> Result<Vec<Bin>, PortError>;

    /// Reading with the latest timestamp for a bin, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store cannot be read.
    async fn latest_reading(&self, bin_id: &BinId) -> Result<Option<Reading>, PortError>;

    /// Store a reading and refresh the bin's full-state flag.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::BinNotFound`] for unknown bins,
    /// [`PortError::InvalidReading`] for negative or non-finite distances, or
    /// another [`PortError`] when the store cannot be written.
    async fn record_reading(
        &self,
        bin_id: &BinId,
        distance: f64,
        recorded_at: DateTime<Utc>,
    ) -> Result<(Bin, Reading), PortError>;
}

#[async_trait]
/// External route optimization service.
pub trait DirectionsPort: Send + Sync {
    /// Compute a route from `origin` through `stops` to `destination`,
    /// letting the provider reorder `stops`.
    ///
    /// With no stops the provider is not asked to optimize and the returned
    /// waypoint order is empty.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Provider`] with the provider status when the
    /// request is rejected, or another [`PortError`] when the call fails.
    async fn optimize_route(
        &self,
        origin: Coordinate,
        stops: &[Coordinate],
        destination: Coordinate,
    ) -> Result<OptimizedRoute, PortError>;
}

/// Default lifetime of a realtime grant, in minutes.
pub const DEFAULT_GRANT_TTL_MINUTES: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Scope of a realtime messaging grant.
pub enum AccessLevel {
    /// Subscribe only.
    Read,
    /// Subscribe and publish.
    ReadWrite,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Invalid access type: {0}")]
/// Raised when parsing an unknown access level.
pub struct UnknownAccessLevel(pub String);

impl FromStr for AccessLevel {
    type Err = UnknownAccessLevel;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "grant_read" => Ok(Self::Read),
            "grant_read_write" => Ok(Self::ReadWrite),
            other => Err(UnknownAccessLevel(other.to_owned())),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Read => "grant_read",
            Self::ReadWrite => "grant_read_write",
        };
        write!(formatter, "{tag}")
    }
}

#[async_trait]
/// Issues scoped tokens for the realtime messaging channel.
pub trait RealtimeGrantPort: Send + Sync {
    /// Grant `user_id` access to the sensor channel for `ttl_minutes`.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the grant backend refuses or fails.
    async fn grant(
        &self,
        user_id: &str,
        access: AccessLevel,
        ttl_minutes: u32,
    ) -> Result<String, PortError>;
}
