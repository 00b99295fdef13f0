//! Directions provider implementation using the Google Directions API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use binwatch_core::{
    model::{Bounds, Coordinate, OptimizedRoute, RouteLeg},
    ports::{DirectionsPort, PortError},
};

const BASE_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
const STATUS_OK: &str = "OK";

/// Top-level body of a directions answer.
#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

/// One candidate route; only the first is used.
#[derive(Debug, Deserialize)]
struct RouteEntry {
    bounds: BoundsEntry,
    legs: Vec<LegEntry>,
    overview_polyline: PolylineEntry,
    #[serde(default)]
    waypoint_order: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct BoundsEntry {
    northeast: LatLng,
    southwest: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct PolylineEntry {
    points: String,
}

#[derive(Debug, Deserialize)]
struct LegEntry {
    distance: ValueEntry,
    duration: ValueEntry,
}

/// `{"text": "1.2 km", "value": 1234}`; only the value matters.
#[derive(Debug, Deserialize)]
struct ValueEntry {
    value: u64,
}

impl From<LatLng> for Coordinate {
    fn from(point: LatLng) -> Self {
        Coordinate::new(point.lat, point.lng)
    }
}

/// Route optimization backed by Google Directions.
pub struct GoogleDirectionsPort {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleDirectionsPort {
    /// Create a new port bound to the given HTTP client and API key.
    ///
    /// Request timeouts are taken from `client`.
    #[must_use]
    pub fn new<K: Into<String>>(client: Client, api_key: K) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_owned(),
        }
    }

    /// Point the port at a different endpoint, such as a proxy.
    #[must_use]
    pub fn with_base_url<U: Into<String>>(mut self, base_url: U) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(
        &self,
        origin: Coordinate,
        stops: &[Coordinate],
        destination: Coordinate,
    ) -> RequestBuilder {
        let mut req = self.client.get(&self.base_url).query(&[
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
            ("key", self.api_key.clone()),
        ]);

        if let Some(waypoints) = waypoints_param(stops) {
            req = req.query(&[("waypoints", waypoints)]);
        }

        req
    }
}

#[async_trait]
impl DirectionsPort for GoogleDirectionsPort {
    async fn optimize_route(
        &self,
        origin: Coordinate,
        stops: &[Coordinate],
        destination: Coordinate,
    ) -> Result<OptimizedRoute, PortError> {
        let req = self.request(origin, stops, destination);
        let response = fetch_json::<DirectionsResponse>(req).await?;
        into_route(response, stops.len())
    }
}

/// `optimize:true|lat,lng|lat,lng`, or nothing when there are no stops.
fn waypoints_param(stops: &[Coordinate]) -> Option<String> {
    if stops.is_empty() {
        return None;
    }

    let mut param = String::from("optimize:true");
    for stop in stops {
        param.push('|');
        param.push_str(&stop.to_string());
    }
    Some(param)
}

fn into_route(response: DirectionsResponse, stop_count: usize) -> Result<OptimizedRoute, PortError> {
    if response.status != STATUS_OK {
        tracing::warn!(
            status = %response.status,
            message = response.error_message.as_deref().unwrap_or(""),
            "Directions request rejected"
        );
        return Err(PortError::Provider(response.status));
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| PortError::MalformedResponse("status OK without routes".into()))?;

    // Without waypoints there is nothing to reorder.
    let waypoint_order = if stop_count == 0 {
        Vec::new()
    } else {
        route.waypoint_order
    };

    Ok(OptimizedRoute {
        waypoint_order,
        polyline: route.overview_polyline.points,
        bounds: Bounds {
            northeast: route.bounds.northeast.into(),
            southwest: route.bounds.southwest.into(),
        },
        legs: route
            .legs
            .into_iter()
            .map(|leg| RouteLeg {
                distance_meters: leg.distance.value,
                duration_seconds: leg.duration.value,
            })
            .collect(),
    })
}

// Small helper to fetch and decode JSON with status handling. URLs are
// stripped from errors because the query string carries the API key.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    req.send()
        .await
        .map_err(|err| PortError::from(err.without_url()))?
        .error_for_status()
        .map_err(|err| PortError::from(err.without_url()))?
        .json()
        .await
        .map_err(|err| PortError::from(err.without_url()))
}
