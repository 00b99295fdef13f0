//! Collection route planning over stored bins and an external directions provider.

use std::collections::HashSet;
use std::sync::Arc;

use crate::fill::bin_metadata;
use crate::model::{Bin, BinId, BinMetadata, Coordinate, RouteLeg, RouteRequest, RouteResult};
use crate::ports::{BinRepository, DirectionsPort, PortError};

#[derive(thiserror::Error, Debug)]
/// Failures surfaced to route planning callers.
pub enum PlanningError {
    /// None of the requested identifiers matched a stored bin.
    #[error("No valid bins found")]
    NoValidBins,
    /// The directions provider rejected the request.
    #[error("Could not compute route: {status}")]
    RouteComputationFailed {
        /// Status string reported by the provider.
        status: String,
    },
    /// Any other failure. The detail is for logs only.
    #[error("Internal planning error: {0}")]
    Internal(String),
}

/// Plans collection routes across a set of bins.
pub struct RoutePlanner {
    repository: Arc<dyn BinRepository>,
    directions: Arc<dyn DirectionsPort>,
}

impl RoutePlanner {
    /// Create a planner reading from `repository` and routing with `directions`.
    #[must_use]
    pub fn new(repository: Arc<dyn BinRepository>, directions: Arc<dyn DirectionsPort>) -> Self {
        Self {
            repository,
            directions,
        }
    }

    /// Compute the optimized route for the requested bins.
    ///
    /// The last resolvable identifier in `request.bin_ids` is the destination;
    /// the provider may reorder every other bin. Unknown identifiers are
    /// dropped without being reported.
    ///
    /// # Errors
    ///
    /// Returns [`PlanningError::NoValidBins`] when no identifier resolves,
    /// [`PlanningError::RouteComputationFailed`] when the provider rejects the
    /// route, and [`PlanningError::Internal`] for every other failure.
    pub async fn plan_route(&self, request: &RouteRequest) -> Result<RouteResult, PlanningError> {
        let result = self.plan(request).await;
        if let Err(PlanningError::Internal(detail)) = &result {
            tracing::error!(%detail, bins = request.bin_ids.len(), "Route planning failed");
        }
        result
    }

    async fn plan(&self, request: &RouteRequest) -> Result<RouteResult, PlanningError> {
        let bins = self.resolve_bins(&request.bin_ids).await?;
        let Some((destination, stops)) = bins.split_last() else {
            return Err(PlanningError::NoValidBins);
        };

        let mut metadata = Vec::with_capacity(bins.len());
        for bin in &bins {
            let latest = self
                .repository
                .latest_reading(&bin.id)
                .await
                .map_err(internal)?;
            metadata.push(bin_metadata(bin, latest.as_ref()));
        }

        let stop_locations: Vec<Coordinate> = stops.iter().map(|bin| bin.location).collect();

        tracing::debug!(
            origin = %request.origin,
            stops = stop_locations.len(),
            destination = %destination.id,
            "Requesting optimized route"
        );

        let route = self
            .directions
            .optimize_route(request.origin, &stop_locations, destination.location)
            .await
            .map_err(|err| match err {
                PortError::Provider(status) => {
                    tracing::warn!(%status, "Directions provider rejected route");
                    PlanningError::RouteComputationFailed { status }
                }
                other => internal(other),
            })?;

        let optimized_bins = apply_waypoint_order(metadata, &route.waypoint_order)?;
        let (total_distance_km, total_duration_min) = route_totals(&route.legs);

        tracing::info!(
            bins = optimized_bins.len(),
            total_distance_km,
            total_duration_min,
            "Planned collection route"
        );

        Ok(RouteResult {
            polyline: route.polyline,
            bounds: route.bounds,
            optimized_bins,
            total_distance_km,
            total_duration_min,
        })
    }

    /// Load the requested bins in request order, first occurrence wins.
    async fn resolve_bins(&self, ids: &[BinId]) -> Result<Vec<Bin>, PlanningError> {
        let mut unique = Vec::with_capacity(ids.len());
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if seen.insert(id) {
                unique.push(id.clone());
            }
        }

        let mut found = self
            .repository
            .find_bins_by_ids(&unique)
            .await
            .map_err(internal)?;

        let mut ordered = Vec::with_capacity(found.len());
        for id in &unique {
            if let Some(position) = found.iter().position(|bin| &bin.id == id) {
                ordered.push(found.swap_remove(position));
            }
        }

        if ordered.len() < unique.len() {
            tracing::debug!(
                requested = unique.len(),
                resolved = ordered.len(),
                "Dropped unknown bin ids"
            );
        }

        Ok(ordered)
    }
}

fn internal(err: PortError) -> PlanningError {
    PlanningError::Internal(err.to_string())
}

/// Reorder the intermediate stops by the provider's permutation and append
/// the destination, which is the last entry of `metadata`.
fn apply_waypoint_order(
    mut metadata: Vec<BinMetadata>,
    order: &[usize],
) -> Result<Vec<BinMetadata>, PlanningError> {
    let Some(destination) = metadata.pop() else {
        return Err(PlanningError::NoValidBins);
    };

    if order.len() != metadata.len() {
        return Err(PlanningError::Internal(format!(
            "Provider returned {} waypoint indices for {} stops",
            order.len(),
            metadata.len()
        )));
    }

    let mut slots: Vec<Option<BinMetadata>> = metadata.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(slots.len() + 1);
    for &index in order {
        let stop = slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| {
                PlanningError::Internal(format!(
                    "Provider waypoint order {order:?} is not a permutation"
                ))
            })?;
        ordered.push(stop);
    }
    ordered.push(destination);

    Ok(ordered)
}

/// Total distance in kilometers (two decimals) and duration in minutes (one
/// decimal), rounded half away from zero on the exact integer sums.
#[expect(
    clippy::cast_precision_loss,
    reason = "rounded totals are far below 2^52"
)]
fn route_totals(legs: &[RouteLeg]) -> (f64, f64) {
    let (meters, seconds) = legs.iter().fold((0_u64, 0_u64), |(meters, seconds), leg| {
        (
            meters.saturating_add(leg.distance_meters),
            seconds.saturating_add(leg.duration_seconds),
        )
    });

    let hundredths_km = meters.saturating_add(5) / 10;
    let tenths_min = seconds.saturating_add(3) / 6;

    (hundredths_km as f64 / 100.0, tenths_min as f64 / 10.0)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::memory::InMemoryBinRepository;
    use crate::model::{Bounds, OptimizedRoute, Reading};

    type Call = (Coordinate, Vec<Coordinate>, Coordinate);

    enum Answer {
        Route(OptimizedRoute),
        Rejected(String),
        Unreachable,
    }

    /// Directions double that records calls and replays a canned answer.
    struct FakeDirections {
        answer: Answer,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeDirections {
        fn new(answer: Answer) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn ok(waypoint_order: Vec<usize>, legs: Vec<RouteLeg>) -> Arc<Self> {
            Self::new(Answer::Route(OptimizedRoute {
                waypoint_order,
                polyline: "_p~iF~ps|U_ulLnnqC".to_owned(),
                bounds: bounds(),
                legs,
            }))
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DirectionsPort for FakeDirections {
        async fn optimize_route(
            &self,
            origin: Coordinate,
            stops: &[Coordinate],
            destination: Coordinate,
        ) -> Result<OptimizedRoute, PortError> {
            self.calls
                .lock()
                .unwrap()
                .push((origin, stops.to_vec(), destination));
            match &self.answer {
                Answer::Route(route) => Ok(route.clone()),
                Answer::Rejected(status) => Err(PortError::Provider(status.clone())),
                Answer::Unreachable => Err(PortError::Internal("connection reset".to_owned())),
            }
        }
    }

    /// Repository double returning bins in reverse store order.
    struct ReversingRepository(InMemoryBinRepository);

    #[async_trait]
    impl BinRepository for ReversingRepository {
        async fn list_bins(&self) -> Result<Vec<Bin>, PortError> {
            self.0.list_bins().await
        }

        async fn find_bins_by_ids(&self, ids: &[BinId]) -> Result<Vec<Bin>, PortError> {
            let mut bins = self.0.find_bins_by_ids(ids).await?;
            bins.reverse();
            Ok(bins)
        }

        async fn latest_reading(&self, bin_id: &BinId) -> Result<Option<Reading>, PortError> {
            self.0.latest_reading(bin_id).await
        }

        async fn record_reading(
            &self,
            bin_id: &BinId,
            distance: f64,
            recorded_at: DateTime<Utc>,
        ) -> Result<(Bin, Reading), PortError> {
            self.0.record_reading(bin_id, distance, recorded_at).await
        }
    }

    fn bounds() -> Bounds {
        Bounds {
            northeast: Coordinate::new(50.95, 6.99),
            southwest: Coordinate::new(50.92, 6.93),
        }
    }

    fn bin(id: &str, latitude: f64) -> Bin {
        Bin {
            id: BinId::from(id),
            name: format!("Bin {id}"),
            location: Coordinate::new(latitude, 6.95),
            address: format!("{id}-Straße 1"),
            capacity: 100.0,
            is_full: false,
        }
    }

    fn leg(distance_meters: u64, duration_seconds: u64) -> RouteLeg {
        RouteLeg {
            distance_meters,
            duration_seconds,
        }
    }

    async fn seeded_repository() -> InMemoryBinRepository {
        let repo = InMemoryBinRepository::new(vec![
            bin("A", 50.93),
            bin("B", 50.94),
            bin("C", 50.95),
        ]);
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 7, 0, 0).unwrap();
        repo.record_reading(&BinId::from("A"), 10.0, at).await.unwrap();
        repo.record_reading(&BinId::from("B"), 40.0, at).await.unwrap();
        repo
    }

    fn request(ids: &[&str]) -> RouteRequest {
        RouteRequest {
            bin_ids: ids.iter().map(|id| BinId::from(*id)).collect(),
            origin: Coordinate::new(50.90, 6.90),
        }
    }

    fn ids(result: &RouteResult) -> Vec<&str> {
        result
            .optimized_bins
            .iter()
            .map(|metadata| metadata.id.0.as_str())
            .collect()
    }

    #[tokio::test]
    async fn reorders_stops_and_keeps_destination_last() {
        let directions = FakeDirections::ok(vec![1, 0], vec![leg(1200, 180), leg(800, 120), leg(500, 60)]);
        let planner = RoutePlanner::new(Arc::new(seeded_repository().await), directions.clone());

        let result = planner.plan_route(&request(&["A", "B", "C"])).await.unwrap();

        assert_eq!(ids(&result), ["B", "A", "C"]);
        assert_relative_eq!(result.optimized_bins[0].fill_percentage, 60.0);
        assert_relative_eq!(result.optimized_bins[1].fill_percentage, 90.0);
        assert_relative_eq!(result.optimized_bins[2].fill_percentage, 0.0);
        assert_eq!(result.total_distance_km, 2.5);
        assert_eq!(result.total_duration_min, 6.0);
        assert_eq!(result.bounds, bounds());

        let calls = directions.calls();
        assert_eq!(calls.len(), 1);
        let (origin, stops, destination) = &calls[0];
        assert_eq!(*origin, Coordinate::new(50.90, 6.90));
        assert_eq!(stops, &[Coordinate::new(50.93, 6.95), Coordinate::new(50.94, 6.95)]);
        assert_eq!(*destination, Coordinate::new(50.95, 6.95));
    }

    #[tokio::test]
    async fn destination_follows_request_order_not_store_order() {
        let repo = ReversingRepository(seeded_repository().await);
        let directions = FakeDirections::ok(vec![0, 1], vec![leg(1, 1)]);
        let planner = RoutePlanner::new(Arc::new(repo), directions.clone());

        let result = planner.plan_route(&request(&["C", "A", "B"])).await.unwrap();

        assert_eq!(ids(&result), ["C", "A", "B"]);
        let (_, stops, destination) = &directions.calls()[0];
        assert_eq!(stops, &[Coordinate::new(50.95, 6.95), Coordinate::new(50.93, 6.95)]);
        assert_eq!(*destination, Coordinate::new(50.94, 6.95));
    }

    #[tokio::test]
    async fn single_bin_skips_optimization() {
        let directions = FakeDirections::ok(Vec::new(), vec![leg(2500, 300)]);
        let planner = RoutePlanner::new(Arc::new(seeded_repository().await), directions.clone());

        let result = planner.plan_route(&request(&["A"])).await.unwrap();

        assert_eq!(result.optimized_bins.len(), 1);
        assert_eq!(
            result.optimized_bins[0],
            BinMetadata {
                id: BinId::from("A"),
                name: "Bin A".to_owned(),
                location: Coordinate::new(50.93, 6.95),
                address: "A-Straße 1".to_owned(),
                fill_percentage: 90.0,
            }
        );
        assert!(directions.calls()[0].1.is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_dropped_silently() {
        let directions = FakeDirections::ok(vec![0], vec![leg(10, 10)]);
        let planner = RoutePlanner::new(Arc::new(seeded_repository().await), directions);

        let result = planner
            .plan_route(&request(&["ghost", "B", "B", "C", "nope"]))
            .await
            .unwrap();

        assert_eq!(ids(&result), ["B", "C"]);
    }

    #[tokio::test]
    async fn no_valid_bins() {
        let directions = FakeDirections::ok(Vec::new(), Vec::new());
        let planner = RoutePlanner::new(Arc::new(seeded_repository().await), directions.clone());

        let cases: [&[&str]; 2] = [&["nonexistent"], &[]];
        for bin_ids in cases {
            let err = planner.plan_route(&request(bin_ids)).await.unwrap_err();
            assert!(matches!(err, PlanningError::NoValidBins));
        }
        assert!(directions.calls().is_empty());
    }

    #[tokio::test]
    async fn provider_status_becomes_route_failure() {
        let planner = RoutePlanner::new(
            Arc::new(seeded_repository().await),
            FakeDirections::new(Answer::Rejected("ZERO_RESULTS".to_owned())),
        );

        let err = planner.plan_route(&request(&["A", "C"])).await.unwrap_err();

        assert!(
            matches!(&err, PlanningError::RouteComputationFailed { status } if status == "ZERO_RESULTS")
        );
        assert!(err.to_string().contains("ZERO_RESULTS"));
    }

    #[tokio::test]
    async fn transport_failure_is_internal() {
        let planner = RoutePlanner::new(
            Arc::new(seeded_repository().await),
            FakeDirections::new(Answer::Unreachable),
        );

        let err = planner.plan_route(&request(&["A", "C"])).await.unwrap_err();
        assert!(matches!(err, PlanningError::Internal(_)));
    }

    #[tokio::test]
    async fn mismatched_waypoint_order_is_internal() {
        for order in [vec![0], vec![0, 1, 2], vec![0, 0], vec![0, 5]] {
            let planner = RoutePlanner::new(
                Arc::new(seeded_repository().await),
                FakeDirections::ok(order.clone(), vec![leg(1, 1)]),
            );
            let err = planner.plan_route(&request(&["A", "B", "C"])).await.unwrap_err();
            assert!(matches!(err, PlanningError::Internal(_)), "order {order:?}");
        }
    }

    #[test]
    fn totals_round_half_up_at_boundaries() {
        assert_eq!(route_totals(&[]), (0.0, 0.0));
        assert_eq!(route_totals(&[leg(1000, 600), leg(5, 27)]), (1.01, 10.5));
        assert_eq!(route_totals(&[leg(1004, 3)]), (1.0, 0.1));
        assert_eq!(route_totals(&[leg(12_344, 2)]), (12.34, 0.0));
        assert_eq!(route_totals(&[leg(12_345, 29)]), (12.35, 0.5));
        assert_eq!(route_totals(&[leg(4321, 1234), leg(0, 0)]), (4.32, 20.6));
    }
}
