//! Scripted pickup-point resolver

#![allow(dead_code)]

use async_trait::async_trait;
use merchbot::core::error::{AppError, AppResult};
use merchbot::delivery::{CityCandidate, PickupPoint, PickupPointResolver};

/// Answers from fixed tables; `unavailable` makes every call fail
#[derive(Debug, Clone, Default)]
pub struct FakeResolver {
    /// typed text (lowercase) and its candidates
    pub cities: Vec<(String, Vec<CityCandidate>)>,
    /// geo id and the points of that city
    pub points: Vec<(i64, PickupPoint)>,
    pub unavailable: bool,
}

impl FakeResolver {
    pub fn moscow() -> Self {
        Self {
            cities: vec![(
                "moscow".to_string(),
                vec![
                    CityCandidate {
                        label: "Москва".to_string(),
                        geo_id: 213,
                    },
                    CityCandidate {
                        label: "Московская область".to_string(),
                        geo_id: 1,
                    },
                ],
            )],
            points: vec![
                (
                    213,
                    PickupPoint {
                        label: "ПВЗ, Москва, Тверская 1".to_string(),
                        pickup_id: "pvz-1".to_string(),
                    },
                ),
                (
                    213,
                    PickupPoint {
                        label: "ПВЗ, Москва, Арбат 10".to_string(),
                        pickup_id: "pvz-2".to_string(),
                    },
                ),
            ],
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PickupPointResolver for FakeResolver {
    async fn detect_city(&self, text: &str) -> AppResult<Vec<CityCandidate>> {
        if self.unavailable {
            return Err(AppError::ResolverUnavailable("down".to_string()));
        }
        let key = text.trim().to_lowercase();
        Ok(self
            .cities
            .iter()
            .find(|(typed, _)| *typed == key)
            .map(|(_, candidates)| candidates.clone())
            .unwrap_or_default())
    }

    async fn list_pickup_points(&self, geo_id: i64, street: &str) -> AppResult<Vec<PickupPoint>> {
        if self.unavailable {
            return Err(AppError::ResolverUnavailable("down".to_string()));
        }
        let street = street.trim().to_lowercase();
        Ok(self
            .points
            .iter()
            .filter(|(geo, point)| *geo == geo_id && point.label.to_lowercase().contains(&street))
            .map(|(_, point)| point.clone())
            .collect())
    }
}
