use crate::types::BusinessCenter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::f64::consts::PI;

// Web Mercator stops being defined past this latitude.
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Business centers grouped by the map tile they fall in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub tile: [u32; 3], // [z, x, y]
    pub lat: f64,
    pub lng: f64,
    pub count: usize,
    pub companies: usize,
    pub kt_clients: usize,
}

pub fn cluster_centers<'a, I>(centers: I, zoom: u8) -> Vec<Cluster>
where
    I: IntoIterator<Item = &'a BusinessCenter>,
{
    let mut cells: BTreeMap<(u32, u32), Vec<&BusinessCenter>> = BTreeMap::new();
    for bc in centers {
        let key = lat_lon_to_tile(bc.latitude, bc.longitude, zoom);
        cells.entry(key).or_default().push(bc);
    }

    cells
        .into_iter()
        .map(|((x, y), members)| {
            let count = members.len();
            let lat = members.iter().map(|bc| bc.latitude).sum::<f64>() / count as f64;
            let lng = members.iter().map(|bc| bc.longitude).sum::<f64>() / count as f64;
            Cluster {
                tile: [zoom as u32, x, y],
                lat,
                lng,
                count,
                companies: members.iter().map(|bc| bc.company_count()).sum(),
                kt_clients: members.iter().map(|bc| bc.kt_client_count()).sum(),
            }
        })
        .collect()
}

// Coordinate conversions
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> (u32, u32) {
    let n = 2.0_f64.powi(zoom as i32);
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x_t = (lon + 180.0) / 360.0 * n;
    let y_t = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n;

    let max_index = n - 1.0;
    (x_t.clamp(0.0, max_index) as u32, y_t.clamp(0.0, max_index) as u32)
}
