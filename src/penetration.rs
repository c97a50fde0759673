use crate::types::BusinessCenter;
use serde::Serialize;

/// Share of a center's companies that are KT clients, in percent.
pub fn penetration_rate(bc: &BusinessCenter) -> f64 {
    let total = bc.company_count();
    if total == 0 {
        return 0.0;
    }
    bc.kt_client_count() as f64 / total as f64 * 100.0
}

/// Bucket used for marker icons and the map legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PenetrationClass {
    /// No KT clients, or no companies at all.
    #[serde(rename = "none")]
    NoClients,
    /// Some KT clients, but fewer than the threshold.
    Low,
    Regular,
}

impl PenetrationClass {
    pub fn classify(rate: f64, low_threshold: f64) -> Self {
        if rate <= 0.0 {
            PenetrationClass::NoClients
        } else if rate < low_threshold {
            PenetrationClass::Low
        } else {
            PenetrationClass::Regular
        }
    }

    pub fn of(bc: &BusinessCenter, low_threshold: f64) -> Self {
        Self::classify(penetration_rate(bc), low_threshold)
    }

    pub fn marker_icon(&self) -> &'static str {
        match self {
            PenetrationClass::NoClients => "marker-grey",
            PenetrationClass::Low => "marker-red",
            PenetrationClass::Regular => "marker-blue",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PenetrationClass::NoClients => "#9e9e9e",
            PenetrationClass::Low => "#e53935",
            PenetrationClass::Regular => "#1e88e5",
        }
    }
}

/// Heatmap weight in `0.0..=1.0`.
pub fn heat_intensity(bc: &BusinessCenter) -> f64 {
    penetration_rate(bc) / 100.0
}
