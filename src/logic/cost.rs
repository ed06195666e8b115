//! Maintenance cost estimation.
//!
//! Not used by any resource operation; callers that want an estimate plug
//! in a [`CostPredictor`].

use serde::{Deserialize, Serialize};

/// Inputs of a cost estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceFeatures {
    pub age_years: f64,
    pub days_since_last_service: f64,
    /// 0 = inspection, 1 = regular service, 2 = heavy repair.
    pub service_type_code: f64,
}

pub trait CostPredictor: Send + Sync {
    /// Estimated cost, never negative.
    fn predict(&self, features: &MaintenanceFeatures) -> f64;
}

/// Closed-form estimate: `base + per_year·age + per_day·days + factor(service type)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearCostModel {
    pub base: f64,
    pub per_year: f64,
    pub per_day: f64,
    pub service_factors: [f64; 3],
}

impl Default for LinearCostModel {
    fn default() -> Self {
        Self {
            base: 50.0,
            per_year: 10.0,
            per_day: 0.5,
            service_factors: [0.0, 40.0, 100.0],
        }
    }
}

impl LinearCostModel {
    fn service_factor(&self, code: f64) -> f64 {
        if !code.is_finite() {
            return self.service_factors[0];
        }
        let index = code.round().clamp(0.0, (self.service_factors.len() - 1) as f64) as usize;
        self.service_factors[index]
    }
}

impl CostPredictor for LinearCostModel {
    fn predict(&self, features: &MaintenanceFeatures) -> f64 {
        let estimate = self.base
            + self.per_year * features.age_years
            + self.per_day * features.days_since_last_service
            + self.service_factor(features.service_type_code);
        if estimate.is_nan() {
            return 0.0;
        }
        estimate.max(0.0)
    }
}
