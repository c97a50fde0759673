use anyhow::{anyhow, Context, Result};
use geo::bounding_rect::BoundingRect;
use geo::{Coord, LineString, Rect};
use geojson::{GeoJson, Value};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    /// Closed interval on both axes: points on an edge are inside.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        self.south <= lat && lat <= self.north && self.west <= lng && lng <= self.east
    }
}

/// A user-drawn selection on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Zone {
    Rectangle { bounds: Bounds },
    /// Vertices as `[lat, lng]`, in drawing order. Closing vertex optional.
    Polygon { points: Vec<[f64; 2]> },
}

impl Zone {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        match self {
            Zone::Rectangle { bounds } => bounds.contains(lat, lng),
            Zone::Polygon { points } => point_in_polygon(lat, lng, points),
        }
    }

    /// Envelope in map coordinates (x = lng, y = lat).
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            Zone::Rectangle { bounds } => Some(Rect::new(
                Coord { x: bounds.west, y: bounds.south },
                Coord { x: bounds.east, y: bounds.north },
            )),
            Zone::Polygon { points } => {
                let ring: LineString<f64> = points
                    .iter()
                    .map(|[lat, lng]| Coord { x: *lng, y: *lat })
                    .collect();
                ring.bounding_rect()
            }
        }
    }

    /// Builds a polygon zone from the exterior ring of a GeoJSON polygon.
    pub fn from_geojson(geojson: GeoJson) -> Result<Self> {
        let geometry = match geojson {
            GeoJson::Geometry(g) => g,
            GeoJson::Feature(f) => f
                .geometry
                .ok_or_else(|| anyhow!("GeoJSON feature has no geometry"))?,
            GeoJson::FeatureCollection(fc) => fc
                .features
                .into_iter()
                .find_map(|f| f.geometry)
                .ok_or_else(|| anyhow!("GeoJSON collection has no geometry"))?,
        };

        match geometry.value {
            Value::Polygon(rings) => {
                let exterior = rings
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("GeoJSON polygon has no rings"))?;
                let points = exterior
                    .into_iter()
                    .map(|pos| match pos.as_slice() {
                        [lng, lat, ..] => Ok([*lat, *lng]),
                        _ => Err(anyhow!("GeoJSON position needs two coordinates")),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Zone::Polygon { points })
            }
            _ => Err(anyhow!("Zone geometry must be a GeoJSON Polygon")),
        }
    }
}

/// Even-odd ray casting. Each edge whose latitude span straddles the point
/// toggles the result when the point lies west of the edge's longitude at
/// that latitude. Self-intersecting rings get no special treatment.
pub fn point_in_polygon(lat: f64, lng: f64, points: &[[f64; 2]]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let [lat_i, lng_i] = points[i];
        let [lat_j, lng_j] = points[j];

        let straddles = (lat_i > lat) != (lat_j > lat);
        if straddles && lng < (lng_j - lng_i) * (lat - lat_i) / (lat_j - lat_i) + lng_i {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Reads a zone from disk: either the map's own `{type, ...}` JSON or GeoJSON.
pub fn load_zone_file(path: &Path) -> Result<Zone> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read zone file: {:?}", path))?;

    if let Ok(zone) = serde_json::from_str::<Zone>(&content) {
        return Ok(zone);
    }

    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("Zone file is neither a zone nor GeoJSON: {:?}", path))?;
    Zone::from_geojson(geojson)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::algorithm::contains::Contains;
    use geo::{Point, Polygon};

    fn reference_polygon(points: &[[f64; 2]]) -> Polygon<f64> {
        let ring: LineString<f64> = points
            .iter()
            .map(|[lat, lng]| Coord { x: *lng, y: *lat })
            .collect();
        Polygon::new(ring, vec![])
    }

    #[test]
    fn rectangle_boundary_is_inside() {
        let bounds = Bounds { north: 52.0, south: 51.0, east: 72.0, west: 71.0 };

        assert!(bounds.contains(51.0, 71.0));
        assert!(bounds.contains(52.0, 72.0));
        assert!(bounds.contains(51.0, 71.5));
        assert!(bounds.contains(51.5, 72.0));
        assert!(bounds.contains(51.5, 71.5));
        assert!(!bounds.contains(52.000001, 71.5));
        assert!(!bounds.contains(51.5, 70.999999));
    }

    #[test]
    fn polygon_needs_three_vertices() {
        assert!(!point_in_polygon(0.5, 0.5, &[]));
        assert!(!point_in_polygon(0.5, 0.5, &[[0.0, 0.0], [1.0, 1.0]]));
    }

    #[test]
    fn ray_casting_matches_geo_contains() {
        let polygons: Vec<Vec<[f64; 2]>> = vec![
            // triangle
            vec![[51.0, 71.0], [52.0, 71.5], [51.0, 72.0]],
            // concave "L"
            vec![
                [0.0, 0.0],
                [0.0, 4.0],
                [1.0, 4.0],
                [1.0, 1.0],
                [4.0, 1.0],
                [4.0, 0.0],
            ],
            // star-ish concave shape around Astana
            vec![
                [51.20, 71.40],
                [51.13, 71.43],
                [51.10, 71.50],
                [51.07, 71.43],
                [51.00, 71.40],
                [51.07, 71.37],
                [51.10, 71.30],
                [51.13, 71.37],
            ],
        ];
        let samples = [
            [0.5, 0.5],
            [0.5, 3.5],
            [3.5, 0.5],
            [2.0, 2.0],
            [3.0, 3.0],
            [-1.0, 0.5],
            [51.3, 71.5],
            [51.5, 71.5],
            [51.9, 71.2],
            [51.1, 71.41],
            [51.15, 71.45],
            [51.02, 71.45],
            [51.1, 71.35],
            [51.18, 71.40],
        ];

        for polygon in &polygons {
            let reference = reference_polygon(polygon);
            for [lat, lng] in samples {
                let expected = reference.contains(&Point::new(lng, lat));
                assert_eq!(
                    point_in_polygon(lat, lng, polygon),
                    expected,
                    "point ({}, {}) in {:?}",
                    lat,
                    lng,
                    polygon
                );
            }
        }
    }

    #[test]
    fn closing_vertex_does_not_change_result() {
        let open = vec![[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0]];
        let mut closed = open.clone();
        closed.push([0.0, 0.0]);

        for [lat, lng] in [[1.0, 1.0], [3.0, 1.0], [1.0, -0.5]] {
            assert_eq!(point_in_polygon(lat, lng, &open), point_in_polygon(lat, lng, &closed));
        }
    }

    #[test]
    fn zone_json_uses_type_tag() {
        let rect: Zone = serde_json::from_str(
            r#"{"type":"rectangle","bounds":{"north":52,"south":51,"east":72,"west":71}}"#,
        )
        .unwrap();
        assert!(rect.contains(51.5, 71.5));

        let poly: Zone = serde_json::from_str(
            r#"{"type":"polygon","points":[[0,0],[0,2],[2,2],[2,0]]}"#,
        )
        .unwrap();
        assert!(poly.contains(1.0, 1.0));
        assert!(!poly.contains(3.0, 1.0));
    }

    #[test]
    fn bounding_rect_uses_lng_as_x() {
        let zone = Zone::Polygon { points: vec![[51.0, 71.0], [52.0, 71.5], [51.5, 72.5]] };
        let rect = zone.bounding_rect().unwrap();
        assert_eq!(rect.min(), Coord { x: 71.0, y: 51.0 });
        assert_eq!(rect.max(), Coord { x: 72.5, y: 52.0 });
    }

    #[test]
    fn geojson_polygon_flips_to_lat_lng() {
        let geojson: GeoJson = r#"{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[71.0, 51.0], [72.0, 51.0], [72.0, 52.0], [71.0, 52.0], [71.0, 51.0]]]
            }
        }"#
        .parse()
        .unwrap();

        let zone = Zone::from_geojson(geojson).unwrap();
        match &zone {
            Zone::Polygon { points } => assert_eq!(points[1], [51.0, 72.0]),
            other => panic!("expected polygon, got {:?}", other),
        }
        assert!(zone.contains(51.5, 71.5));
    }

    #[test]
    fn geojson_point_is_rejected() {
        let geojson: GeoJson = r#"{"type":"Point","coordinates":[71.0,51.0]}"#.parse().unwrap();
        assert!(Zone::from_geojson(geojson).is_err());
    }
}
