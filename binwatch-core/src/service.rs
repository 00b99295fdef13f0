//! High-level service facade used by the HTTP layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::fill::compute_fill;
use crate::model::{Bin, BinId, BinStatus, Reading, RouteRequest, RouteResult};
use crate::planner::{PlanningError, RoutePlanner};
use crate::ports::{AccessLevel, BinRepository, DirectionsPort, PortError, RealtimeGrantPort};

/// Longest realtime grant accepted, in minutes (30 days).
pub const MAX_GRANT_TTL_MINUTES: u32 = 43_200;

#[derive(thiserror::Error, Debug)]
/// Errors raised while issuing realtime grants.
pub enum GrantError {
    /// The user id was blank.
    #[error("User id cannot be empty")]
    EmptyUserId,
    /// TTL outside `1..=MAX_GRANT_TTL_MINUTES`.
    #[error("Invalid ttl: {0} minutes")]
    InvalidTtl(u32),
    /// No grant backend was wired in.
    #[error("Realtime grants are not configured")]
    NotConfigured,
    /// The grant backend failed.
    #[error(transparent)]
    Backend(#[from] PortError),
}

/// Public entry point for the dashboard, ingestion, routing, and realtime grants.
pub struct BinwatchService {
    repository: Arc<dyn BinRepository>,
    planner: RoutePlanner,
    realtime: Option<Arc<dyn RealtimeGrantPort>>,
}

impl BinwatchService {
    /// Create a new service over the given repository and directions provider.
    #[must_use]
    pub fn new(repository: Arc<dyn BinRepository>, directions: Arc<dyn DirectionsPort>) -> Self {
        let planner = RoutePlanner::new(Arc::clone(&repository), directions);
        Self {
            repository,
            planner,
            realtime: None,
        }
    }

    /// Attach a realtime grant backend.
    #[must_use]
    pub fn with_realtime(mut self, realtime: Arc<dyn RealtimeGrantPort>) -> Self {
        self.realtime = Some(realtime);
        self
    }

    /// Every bin with its current fill state.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if the repository cannot be read.
    pub async fn bin_statuses(&self) -> Result<Vec<BinStatus>, PortError> {
        let bins = self.repository.list_bins().await?;
        let mut statuses = Vec::with_capacity(bins.len());
        for bin in bins {
            let latest = self.repository.latest_reading(&bin.id).await?;
            statuses.push(status_of(bin, latest.as_ref()));
        }
        Ok(statuses)
    }

    /// Store a sensor reading, stamped now unless `recorded_at` is given.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::BinNotFound`] for unknown bins,
    /// [`PortError::InvalidReading`] for rejected distances, or another
    /// [`PortError`] when the repository fails.
    pub async fn record_reading(
        &self,
        bin_id: &BinId,
        distance: f64,
        recorded_at: Option<DateTime<Utc>>,
    ) -> Result<BinStatus, PortError> {
        let recorded_at = recorded_at.unwrap_or_else(Utc::now);
        let (bin, _reading) = self
            .repository
            .record_reading(bin_id, distance, recorded_at)
            .await?;
        let latest = self.repository.latest_reading(bin_id).await?;

        tracing::info!(bin = %bin_id, distance, is_full = bin.is_full, "Reading ingested");

        Ok(status_of(bin, latest.as_ref()))
    }

    /// Plan a collection route.
    ///
    /// # Errors
    ///
    /// See [`RoutePlanner::plan_route`].
    pub async fn plan_route(&self, request: &RouteRequest) -> Result<RouteResult, PlanningError> {
        self.planner.plan_route(request).await
    }

    /// Issue a realtime token for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`GrantError`] for blank user ids, out-of-range TTLs, a
    /// missing backend, or a backend failure.
    pub async fn grant_realtime_access(
        &self,
        user_id: &str,
        access: AccessLevel,
        ttl_minutes: u32,
    ) -> Result<String, GrantError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(GrantError::EmptyUserId);
        }
        if !(1..=MAX_GRANT_TTL_MINUTES).contains(&ttl_minutes) {
            return Err(GrantError::InvalidTtl(ttl_minutes));
        }
        let realtime = self.realtime.as_ref().ok_or(GrantError::NotConfigured)?;

        tracing::info!(%user_id, %access, ttl_minutes, "Granting realtime access");
        Ok(realtime.grant(user_id, access, ttl_minutes).await?)
    }
}

fn status_of(bin: Bin, latest: Option<&Reading>) -> BinStatus {
    BinStatus {
        fill: compute_fill(latest, bin.capacity),
        last_reading_at: latest.map(|reading| reading.recorded_at),
        bin,
    }
}
