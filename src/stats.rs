use crate::types::{BusinessCenter, Provider};
use crate::zone::Zone;
use serde::Serialize;

/// Totals for the centers inside a selected zone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStats {
    pub business_centers: usize,
    pub companies: usize,
    pub kt_clients: usize,
    pub total_revenue: f64,
}

impl ZoneStats {
    pub fn from_centers<'a, I>(centers: I) -> Self
    where
        I: IntoIterator<Item = &'a BusinessCenter>,
    {
        centers.into_iter().fold(Self::default(), |mut acc, bc| {
            acc.business_centers += 1;
            acc.companies += bc.company_count();
            acc.kt_clients += bc.kt_client_count();
            acc.total_revenue += bc.revenue();
            acc
        })
    }
}

pub fn zone_stats(zone: &Zone, centers: &[BusinessCenter]) -> ZoneStats {
    ZoneStats::from_centers(
        centers
            .iter()
            .filter(|bc| zone.contains(bc.latitude, bc.longitude)),
    )
}

/// Nothing is reported until a zone has been drawn.
pub fn selection_stats(zone: Option<&Zone>, centers: &[BusinessCenter]) -> Option<ZoneStats> {
    zone.map(|z| zone_stats(z, centers))
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderZoneStats {
    pub providers: usize,
    pub avg_download_speed: Option<f64>,
    pub avg_upload_speed: Option<f64>,
}

pub fn provider_zone_stats(zone: &Zone, providers: &[Provider]) -> ProviderZoneStats {
    let inside: Vec<&Provider> = providers
        .iter()
        .filter(|p| zone.contains(p.location.lat, p.location.lng))
        .collect();

    ProviderZoneStats {
        providers: inside.len(),
        avg_download_speed: mean(inside.iter().filter_map(|p| p.download_speed)),
        avg_upload_speed: mean(inside.iter().filter_map(|p| p.upload_speed)),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
