//! Client for the Yandex Delivery B2B platform location and pickup-point endpoints.
//!
//! Two calls, both `POST` with a bearer token:
//! - `/api/b2b/platform/location/detect` maps free text to geo ids
//! - `/api/b2b/platform/pickup-points/list` lists pickup points of a geo id
//!
//! No retries and no caching; every failure becomes `AppError::ResolverUnavailable`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CityCandidate, PickupPoint, PickupPointResolver};
use crate::core::config;
use crate::core::error::{AppError, AppResult};

const DETECT_PATH: &str = "/api/b2b/platform/location/detect";
const PICKUP_POINTS_PATH: &str = "/api/b2b/platform/pickup-points/list";

#[derive(Serialize)]
struct DetectRequest<'a> {
    location: &'a str,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    variants: Vec<DetectVariant>,
}

#[derive(Deserialize)]
struct DetectVariant {
    geo_id: i64,
    address: String,
}

#[derive(Serialize)]
struct PickupPointsRequest {
    geo_id: i64,
    #[serde(rename = "type")]
    point_type: &'static str,
}

#[derive(Deserialize)]
struct PickupPointsResponse {
    #[serde(default)]
    points: Vec<RawPickupPoint>,
}

#[derive(Deserialize)]
struct RawPickupPoint {
    id: String,
    #[serde(default)]
    name: String,
    address: Option<RawAddress>,
}

#[derive(Deserialize)]
struct RawAddress {
    #[serde(default)]
    full_address: String,
}

impl RawPickupPoint {
    fn full_address(&self) -> &str {
        self.address.as_ref().map(|a| a.full_address.as_str()).unwrap_or("")
    }

    fn label(&self) -> String {
        match (self.name.trim(), self.full_address().trim()) {
            ("", address) => address.to_string(),
            (name, "") => name.to_string(),
            (name, address) => format!("{}, {}", name, address),
        }
    }
}

/// Case-insensitive substring match of the street against the point address
fn matches_street(point: &RawPickupPoint, street: &str) -> bool {
    let street = street.trim().to_lowercase();
    street.is_empty() || point.full_address().to_lowercase().contains(&street)
}

#[derive(Debug, Clone)]
pub struct YandexDeliveryClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl YandexDeliveryClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Client configured from `DELIVERY_API_URL` / `DELIVERY_API_TOKEN`, `None` without a token
    pub fn from_env() -> AppResult<Option<Self>> {
        match config::delivery::DELIVERY_API_TOKEN.as_deref() {
            Some(token) => Ok(Some(Self::new(
                &config::delivery::DELIVERY_API_URL,
                token,
                config::delivery::timeout(),
            )?)),
            None => Ok(None),
        }
    }

    async fn post<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(&self, path: &str, body: &B) -> AppResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept-Language", "ru")
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::ResolverUnavailable(format!("request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Delivery API {} returned status {}", path, status);
            return Err(AppError::ResolverUnavailable(format!("{} returned {}", path, status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::ResolverUnavailable(format!("invalid response from {}: {}", path, e)))
    }
}

#[async_trait]
impl PickupPointResolver for YandexDeliveryClient {
    async fn detect_city(&self, text: &str) -> AppResult<Vec<CityCandidate>> {
        let response: DetectResponse = self.post(DETECT_PATH, &DetectRequest { location: text.trim() }).await?;
        log::info!(
            "📍 Location detect for {:?}: {} variant(s)",
            text,
            response.variants.len()
        );

        Ok(response
            .variants
            .into_iter()
            .map(|v| CityCandidate {
                label: v.address,
                geo_id: v.geo_id,
            })
            .collect())
    }

    async fn list_pickup_points(&self, geo_id: i64, street: &str) -> AppResult<Vec<PickupPoint>> {
        let response: PickupPointsResponse = self
            .post(
                PICKUP_POINTS_PATH,
                &PickupPointsRequest {
                    geo_id,
                    point_type: "pickup_point",
                },
            )
            .await?;

        let total = response.points.len();
        let points: Vec<PickupPoint> = response
            .points
            .into_iter()
            .filter(|p| matches_street(p, street))
            .map(|p| PickupPoint {
                label: p.label(),
                pickup_id: p.id,
            })
            .collect();
        log::info!(
            "📦 Pickup points for geo {} street {:?}: {} of {}",
            geo_id,
            street,
            points.len(),
            total
        );
        Ok(points)
    }
}
