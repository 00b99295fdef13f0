//! In-process bin repository.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::fill::update_full_state;
use crate::model::{Bin, BinId, Reading, ReadingId};
use crate::ports::{BinRepository, PortError};

#[derive(Default)]
struct State {
    bins: Vec<Bin>,
    readings: HashMap<BinId, Vec<Reading>>,
    next_reading_id: u64,
}

/// Repository keeping bins and readings in memory.
///
/// Bins are returned in insertion order.
#[derive(Default)]
pub struct InMemoryBinRepository {
    state: RwLock<State>,
}

impl InMemoryBinRepository {
    /// Create a repository holding `bins` and no readings.
    #[must_use]
    pub fn new(bins: Vec<Bin>) -> Self {
        Self {
            state: RwLock::new(State {
                bins,
                ..State::default()
            }),
        }
    }

    /// Create a repository from a JSON array of bins.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Store`] when the document is not a valid bin list
    /// or contains duplicate identifiers.
    pub fn from_json(raw: &str) -> Result<Self, PortError> {
        let bins: Vec<Bin> = serde_json::from_str(raw)
            .map_err(|err| PortError::Store(format!("Invalid bin seed: {err}")))?;

        let mut seen = HashSet::with_capacity(bins.len());
        for bin in &bins {
            if !seen.insert(&bin.id) {
                return Err(PortError::Store(format!("Duplicate bin id: {}", bin.id)));
            }
        }

        Ok(Self::new(bins))
    }
}

fn poisoned() -> PortError {
    PortError::Store("Repository lock poisoned".to_owned())
}

#[async_trait]
impl BinRepository for InMemoryBinRepository {
    async fn list_bins(&self) -> Result<Vec<Bin>, PortError> {
        let state = self.state.read().map_err(|_err| poisoned())?;
        Ok(state.bins.clone())
    }

    async fn find_bins_by_ids(&self, ids: &[BinId]) -> Result<Vec<Bin>, PortError> {
        let state = self.state.read().map_err(|_err| poisoned())?;
        Ok(state
            .bins
            .iter()
            .filter(|bin| ids.contains(&bin.id))
            .cloned()
            .collect())
    }

    async fn latest_reading(&self, bin_id: &BinId) -> Result<Option<Reading>, PortError> {
        let state = self.state.read().map_err(|_err| poisoned())?;
        Ok(state
            .readings
            .get(bin_id)
            .and_then(|readings| readings.iter().max_by_key(|reading| reading.recorded_at))
            .cloned())
    }

    async fn record_reading(
        &self,
        bin_id: &BinId,
        distance: f64,
        recorded_at: DateTime<Utc>,
    ) -> Result<(Bin, Reading), PortError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(PortError::InvalidReading(format!(
                "distance must be a non-negative number, got {distance}"
            )));
        }

        let mut state = self.state.write().map_err(|_err| poisoned())?;

        let position = state
            .bins
            .iter()
            .position(|bin| &bin.id == bin_id)
            .ok_or_else(|| PortError::BinNotFound(bin_id.clone()))?;

        state.next_reading_id += 1;
        let reading = Reading {
            id: ReadingId(state.next_reading_id),
            bin_id: bin_id.clone(),
            distance,
            recorded_at,
        };

        let readings = state.readings.entry(bin_id.clone()).or_default();
        readings.push(reading.clone());
        let is_latest = readings
            .iter()
            .all(|existing| existing.recorded_at <= recorded_at);

        let slot = state
            .bins
            .get_mut(position)
            .ok_or_else(|| PortError::Internal("Bin index out of range".to_owned()))?;

        // Back-dated readings must not override the flag set by a newer one.
        if is_latest {
            *slot = update_full_state(slot.clone(), &reading);
        }

        tracing::debug!(bin = %bin_id, distance, is_full = slot.is_full, "Recorded reading");

        Ok((slot.clone(), reading))
    }
}
