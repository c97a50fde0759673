//! Aggregations behind the analytics page.
//!
//! Everything is recomputed on each call; the report is a plain value the
//! HTTP layer serializes as-is. District and building-type selectors narrow
//! the totals, groupings, top lists and low-penetration list. The service
//! breakdowns and per-center service revenue always cover the whole dataset.

use crate::penetration::{penetration_rate, PenetrationClass};
use crate::types::BusinessCenter;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

const TOP_CENTERS: usize = 10;
const TOP_KT_CLIENTS: usize = 10;
const TOP_SERVICES: usize = 5;

/// District and building-type selectors. `None` means "all".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsFilter {
    pub district: Option<String>,
    pub building_type: Option<String>,
}

impl AnalyticsFilter {
    pub fn matches(&self, bc: &BusinessCenter) -> bool {
        let district_ok = match selected(&self.district) {
            Some(d) => bc.district == d,
            None => true,
        };
        let type_ok = match selected(&self.building_type) {
            Some(t) => bc.building_purpose == t,
            None => true,
        };
        district_ok && type_ok
    }
}

// The page sends "all" for an unset selector.
fn selected(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty() && *v != "all")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictStats {
    pub district: String,
    pub business_centers: usize,
    pub companies: usize,
    pub kt_clients: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingTypeStats {
    #[serde(rename = "type")]
    pub building_type: String,
    pub count: usize,
    pub companies: usize,
    pub kt_clients: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterSummary {
    pub name: String,
    pub companies: usize,
    pub kt_clients: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KtClientSummary {
    pub name: String,
    pub revenue: f64,
    pub services: usize,
    pub business_center: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub name: String,
    pub revenue: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterRevenue {
    pub name: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowPenetrationCenter {
    pub id: String,
    pub name: String,
    pub companies: usize,
    pub kt_clients: usize,
    pub penetration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub total_business_centers: usize,
    pub total_companies: usize,
    pub kt_clients: usize,
    pub total_revenue: f64,
    pub district_data: Vec<DistrictStats>,
    pub building_type_data: Vec<BuildingTypeStats>,
    pub top_business_centers: Vec<CenterSummary>,
    pub top_kt_clients: Vec<KtClientSummary>,
    pub service_stats: Vec<ServiceStats>,
    pub top_services: Vec<ServiceStats>,
    pub business_center_revenue: Vec<CenterRevenue>,
    pub low_penetration: Vec<LowPenetrationCenter>,
    pub districts: Vec<String>,
    pub building_types: Vec<String>,
}

pub fn build_report(
    centers: &[BusinessCenter],
    filter: &AnalyticsFilter,
    low_threshold: f64,
) -> AnalyticsReport {
    let filtered: Vec<&BusinessCenter> = centers.iter().filter(|bc| filter.matches(bc)).collect();

    let all: Vec<&BusinessCenter> = centers.iter().collect();
    let service_stats = service_stats(&all);
    let mut top_services = service_stats.clone();
    top_services.sort_by(|a, b| desc(a.revenue, b.revenue));
    top_services.truncate(TOP_SERVICES);

    AnalyticsReport {
        total_business_centers: filtered.len(),
        total_companies: filtered.iter().map(|bc| bc.company_count()).sum(),
        kt_clients: filtered.iter().map(|bc| bc.kt_client_count()).sum(),
        total_revenue: filtered.iter().map(|bc| bc.revenue()).sum(),
        district_data: district_stats(&filtered),
        building_type_data: building_type_stats(&filtered),
        top_business_centers: top_business_centers(&filtered),
        top_kt_clients: top_kt_clients(&filtered),
        service_stats,
        top_services,
        business_center_revenue: centers
            .iter()
            .map(|bc| CenterRevenue {
                name: bc.business_center_name.clone(),
                revenue: bc.service_revenue(),
            })
            .collect(),
        low_penetration: low_penetration(&filtered, low_threshold),
        districts: distinct(centers, |bc| &bc.district),
        building_types: distinct(centers, |bc| &bc.building_purpose),
    }
}

fn asc(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn desc(a: f64, b: f64) -> Ordering {
    asc(b, a)
}

fn district_stats(centers: &[&BusinessCenter]) -> Vec<DistrictStats> {
    let mut groups: BTreeMap<&str, DistrictStats> = BTreeMap::new();
    for bc in centers {
        let entry = groups.entry(bc.district.as_str()).or_insert_with(|| DistrictStats {
            district: bc.district.clone(),
            business_centers: 0,
            companies: 0,
            kt_clients: 0,
            revenue: 0.0,
        });
        entry.business_centers += 1;
        entry.companies += bc.company_count();
        entry.kt_clients += bc.kt_client_count();
        entry.revenue += bc.revenue();
    }
    groups.into_values().collect()
}

fn building_type_stats(centers: &[&BusinessCenter]) -> Vec<BuildingTypeStats> {
    let mut groups: BTreeMap<&str, BuildingTypeStats> = BTreeMap::new();
    for bc in centers {
        let entry = groups
            .entry(bc.building_purpose.as_str())
            .or_insert_with(|| BuildingTypeStats {
                building_type: bc.building_purpose.clone(),
                count: 0,
                companies: 0,
                kt_clients: 0,
            });
        entry.count += 1;
        entry.companies += bc.company_count();
        entry.kt_clients += bc.kt_client_count();
    }
    groups.into_values().collect()
}

fn top_business_centers(centers: &[&BusinessCenter]) -> Vec<CenterSummary> {
    let mut summaries: Vec<CenterSummary> = centers
        .iter()
        .map(|bc| CenterSummary {
            name: bc.business_center_name.clone(),
            companies: bc.company_count(),
            kt_clients: bc.kt_client_count(),
            revenue: bc.revenue(),
        })
        .collect();
    summaries.sort_by(|a, b| b.companies.cmp(&a.companies));
    summaries.truncate(TOP_CENTERS);
    summaries
}

fn top_kt_clients(centers: &[&BusinessCenter]) -> Vec<KtClientSummary> {
    let mut clients: Vec<KtClientSummary> = centers
        .iter()
        .flat_map(|bc| {
            bc.companies
                .iter()
                .filter(|c| c.is_kt_client)
                .map(move |c| KtClientSummary {
                    name: c.organization_name.clone(),
                    revenue: c.accruals_or_zero(),
                    services: c.services.len(),
                    business_center: bc.business_center_name.clone(),
                })
        })
        .collect();
    clients.sort_by(|a, b| desc(a.revenue, b.revenue));
    clients.truncate(TOP_KT_CLIENTS);
    clients
}

fn service_stats(centers: &[&BusinessCenter]) -> Vec<ServiceStats> {
    let mut groups: BTreeMap<&str, ServiceStats> = BTreeMap::new();
    let services = centers
        .iter()
        .flat_map(|bc| bc.companies.iter())
        .flat_map(|c| c.services.iter());
    for service in services {
        let entry = groups.entry(service.name.as_str()).or_insert_with(|| ServiceStats {
            name: service.name.clone(),
            revenue: 0.0,
            count: 0,
        });
        entry.revenue += service.revenue.unwrap_or(0.0);
        entry.count += 1;
    }
    groups.into_values().collect()
}

/// Centers with some KT presence but a rate under the threshold, worst first.
fn low_penetration(centers: &[&BusinessCenter], low_threshold: f64) -> Vec<LowPenetrationCenter> {
    let mut low: Vec<LowPenetrationCenter> = centers
        .iter()
        .filter(|bc| PenetrationClass::of(bc, low_threshold) == PenetrationClass::Low)
        .map(|bc| LowPenetrationCenter {
            id: bc.id.clone(),
            name: bc.business_center_name.clone(),
            companies: bc.company_count(),
            kt_clients: bc.kt_client_count(),
            penetration: penetration_rate(bc),
        })
        .collect();
    low.sort_by(|a, b| asc(a.penetration, b.penetration));
    low
}

fn distinct<F>(centers: &[BusinessCenter], key: F) -> Vec<String>
where
    F: Fn(&BusinessCenter) -> &String,
{
    centers
        .iter()
        .map(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
