//! Pickup-point resolver: turns a typed city and street into a concrete parcel pickup point.
//!
//! The checkout conversation only depends on [`PickupPointResolver`]; any error it returns
//! is treated as "lookup unavailable" and the conversation falls back to free text.

pub mod yandex;

use async_trait::async_trait;

use crate::core::error::{AppError, AppResult};

pub use yandex::YandexDeliveryClient;

/// Resolver shared between the checkout and the dispatcher
pub type SharedResolver = std::sync::Arc<dyn PickupPointResolver>;

/// City suggested for free-text input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityCandidate {
    pub label: String,
    pub geo_id: i64,
}

/// Parcel pickup point inside a city
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupPoint {
    pub label: String,
    pub pickup_id: String,
}

#[async_trait]
pub trait PickupPointResolver: Send + Sync {
    /// Ordered city candidates for the typed text, best match first
    async fn detect_city(&self, text: &str) -> AppResult<Vec<CityCandidate>>;

    /// Pickup points of the city whose address mentions `street`
    async fn list_pickup_points(&self, geo_id: i64, street: &str) -> AppResult<Vec<PickupPoint>>;
}

/// Resolver used when the lookup feature is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledResolver;

#[async_trait]
impl PickupPointResolver for DisabledResolver {
    async fn detect_city(&self, _text: &str) -> AppResult<Vec<CityCandidate>> {
        Err(AppError::ResolverUnavailable("pickup-point lookup is disabled".to_string()))
    }

    async fn list_pickup_points(&self, _geo_id: i64, _street: &str) -> AppResult<Vec<PickupPoint>> {
        Err(AppError::ResolverUnavailable("pickup-point lookup is disabled".to_string()))
    }
}

#[async_trait]
impl<R: PickupPointResolver + ?Sized> PickupPointResolver for std::sync::Arc<R> {
    async fn detect_city(&self, text: &str) -> AppResult<Vec<CityCandidate>> {
        (**self).detect_city(text).await
    }

    async fn list_pickup_points(&self, geo_id: i64, street: &str) -> AppResult<Vec<PickupPoint>> {
        (**self).list_pickup_points(geo_id, street).await
    }
}
