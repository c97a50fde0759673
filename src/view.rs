use crate::cluster::{cluster_centers, Cluster};
use crate::penetration::{heat_intensity, penetration_rate, PenetrationClass};
use crate::types::{BusinessCenter, Company};
use serde::{Deserialize, Serialize};

/// The "All / KT / not KT" toggle above the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ClientFilter {
    #[default]
    All,
    /// Centers with at least one KT client.
    Kt,
    /// Centers with no KT clients.
    NonKt,
}

impl ClientFilter {
    pub fn matches(&self, bc: &BusinessCenter) -> bool {
        match self {
            ClientFilter::All => true,
            ClientFilter::Kt => bc.has_kt_clients(),
            ClientFilter::NonKt => !bc.has_kt_clients(),
        }
    }

    pub fn apply<'a>(&self, centers: &'a [BusinessCenter]) -> impl Iterator<Item = &'a BusinessCenter> + 'a {
        let filter = *self;
        centers.iter().filter(move |bc| filter.matches(bc))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub companies: usize,
    pub kt_clients: usize,
    pub penetration: f64,
    pub class: PenetrationClass,
    pub icon: &'static str,
    pub color: &'static str,
}

impl Marker {
    pub fn new(bc: &BusinessCenter, low_threshold: f64) -> Self {
        let rate = penetration_rate(bc);
        let class = PenetrationClass::classify(rate, low_threshold);
        Self {
            id: bc.id.clone(),
            name: bc.business_center_name.clone(),
            lat: bc.latitude,
            lng: bc.longitude,
            companies: bc.company_count(),
            kt_clients: bc.kt_client_count(),
            penetration: rate,
            class,
            icon: class.marker_icon(),
            color: class.color(),
        }
    }
}

/// What the map draws at a given zoom.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layer", content = "items", rename_all = "snake_case")]
pub enum MapLayer {
    Markers(Vec<Marker>),
    Clusters(Vec<Cluster>),
}

#[derive(Debug, Clone, Copy)]
pub struct LayerRequest {
    pub filter: ClientFilter,
    pub zoom: u8,
    pub clustering: bool,
}

pub fn map_layer(
    centers: &[BusinessCenter],
    request: LayerRequest,
    zoom_threshold: u8,
    low_threshold: f64,
) -> MapLayer {
    let visible = request.filter.apply(centers);
    if request.clustering && request.zoom < zoom_threshold {
        MapLayer::Clusters(cluster_centers(visible, request.zoom))
    } else {
        MapLayer::Markers(visible.map(|bc| Marker::new(bc, low_threshold)).collect())
    }
}

/// `[lat, lng, intensity]` triples for the heatmap layer.
pub fn heatmap_points(centers: &[BusinessCenter], filter: ClientFilter) -> Vec<[f64; 3]> {
    filter
        .apply(centers)
        .map(|bc| [bc.latitude, bc.longitude, heat_intensity(bc)])
        .collect()
}

/// Detail card shown when a marker is clicked.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterCard {
    pub id: String,
    pub name: String,
    pub address: String,
    pub district: String,
    pub building_purpose: String,
    pub lat: f64,
    pub lng: f64,
    pub total_companies: usize,
    pub kt_clients: usize,
    pub other_companies: usize,
    pub penetration: f64,
    pub class: PenetrationClass,
    pub revenue: f64,
    pub companies: Vec<Company>,
}

impl CenterCard {
    pub fn new(bc: &BusinessCenter, low_threshold: f64) -> Self {
        let rate = penetration_rate(bc);
        let kt_clients = bc.kt_client_count();

        // KT clients first, otherwise dataset order.
        let mut companies = bc.companies.clone();
        companies.sort_by_key(|c| !c.is_kt_client);

        Self {
            id: bc.id.clone(),
            name: bc.business_center_name.clone(),
            address: bc.address.clone(),
            district: bc.district.clone(),
            building_purpose: bc.building_purpose.clone(),
            lat: bc.latitude,
            lng: bc.longitude,
            total_companies: bc.company_count(),
            kt_clients,
            other_companies: bc.company_count() - kt_clients,
            penetration: rate,
            class: PenetrationClass::classify(rate, low_threshold),
            revenue: bc.revenue(),
            companies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::{center, company};

    fn sample() -> Vec<BusinessCenter> {
        vec![
            center("kt", 51.128, 71.430, vec![company("a", true, Some(10.0)), company("b", false, None)]),
            center("plain", 51.130, 71.432, vec![company("c", false, Some(5.0))]),
            center("empty", 51.2, 71.5, vec![]),
        ]
    }

    fn ids(layer: &MapLayer) -> Vec<String> {
        match layer {
            MapLayer::Markers(markers) => markers.iter().map(|m| m.id.clone()).collect(),
            MapLayer::Clusters(_) => panic!("expected markers"),
        }
    }

    #[test]
    fn client_filter_splits_centers() {
        let centers = sample();
        let kt: Vec<&str> = ClientFilter::Kt.apply(&centers).map(|bc| bc.id.as_str()).collect();
        let non_kt: Vec<&str> = ClientFilter::NonKt.apply(&centers).map(|bc| bc.id.as_str()).collect();

        assert_eq!(kt, vec!["kt"]);
        assert_eq!(non_kt, vec!["plain", "empty"]);
        assert_eq!(ClientFilter::All.apply(&centers).count(), 3);
    }

    #[test]
    fn low_zoom_with_clustering_returns_clusters() {
        let centers = sample();
        let request = LayerRequest { filter: ClientFilter::All, zoom: 8, clustering: true };
        match map_layer(&centers, request, 15, 30.0) {
            MapLayer::Clusters(clusters) => {
                assert_eq!(clusters.iter().map(|c| c.count).sum::<usize>(), 3);
            }
            other => panic!("expected clusters, got {:?}", other),
        }
    }

    #[test]
    fn threshold_zoom_or_disabled_clustering_returns_markers() {
        let centers = sample();
        let at_threshold = LayerRequest { filter: ClientFilter::All, zoom: 15, clustering: true };
        assert_eq!(ids(&map_layer(&centers, at_threshold, 15, 30.0)).len(), 3);

        let separate = LayerRequest { filter: ClientFilter::Kt, zoom: 3, clustering: false };
        assert_eq!(ids(&map_layer(&centers, separate, 15, 30.0)), vec!["kt"]);
    }

    #[test]
    fn markers_carry_penetration_icon() {
        let centers = sample();
        let marker = Marker::new(&centers[0], 30.0);
        assert_eq!(marker.penetration, 50.0);
        assert_eq!(marker.class, PenetrationClass::Regular);
        assert_eq!(marker.icon, "marker-blue");
        assert_eq!(marker.color, "#1e88e5");

        let empty = Marker::new(&centers[2], 30.0);
        assert_eq!(empty.class, PenetrationClass::NoClients);
    }

    #[test]
    fn heatmap_uses_penetration_fraction() {
        let centers = sample();
        let points = heatmap_points(&centers, ClientFilter::All);
        assert_eq!(points[0], [51.128, 71.430, 0.5]);
        assert_eq!(points[2][2], 0.0);
    }

    #[test]
    fn card_lists_kt_clients_first() {
        let bc = center(
            "1",
            51.0,
            71.0,
            vec![company("x", false, Some(1.0)), company("y", true, Some(2.0)), company("z", false, None)],
        );
        let card = CenterCard::new(&bc, 30.0);
        assert_eq!(card.companies[0].organization_name, "y");
        assert_eq!(card.companies[1].organization_name, "x");
        assert_eq!(card.total_companies, 3);
        assert_eq!(card.kt_clients, 1);
        assert_eq!(card.other_companies, 2);
        assert_eq!(card.revenue, 3.0);
    }

    #[test]
    fn layer_serializes_with_tag() {
        let layer = MapLayer::Markers(vec![]);
        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json, serde_json::json!({"layer": "markers", "items": []}));
    }
}
