use crate::penetration::{penetration_rate, PenetrationClass};
use crate::types::BusinessCenter;
use anyhow::{Context, Result};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct CenterRow<'a> {
    id: &'a str,
    name: &'a str,
    address: &'a str,
    district: &'a str,
    building_purpose: &'a str,
    latitude: f64,
    longitude: f64,
    companies: usize,
    kt_clients: usize,
    other_companies: usize,
    penetration: f64,
    revenue: f64,
}

impl<'a> CenterRow<'a> {
    fn new(bc: &'a BusinessCenter) -> Self {
        let companies = bc.company_count();
        let kt_clients = bc.kt_client_count();
        Self {
            id: &bc.id,
            name: &bc.business_center_name,
            address: &bc.address,
            district: &bc.district,
            building_purpose: &bc.building_purpose,
            latitude: bc.latitude,
            longitude: bc.longitude,
            companies,
            kt_clients,
            other_companies: companies - kt_clients,
            penetration: rounded_rate(bc),
            revenue: bc.revenue(),
        }
    }
}

/// Penetration as exported, two decimal places.
fn rounded_rate(bc: &BusinessCenter) -> f64 {
    (penetration_rate(bc) * 100.0).round() / 100.0
}

/// One row per business center, header first.
pub fn write_csv<'a, W, I>(centers: I, writer: W) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a BusinessCenter>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for bc in centers {
        wtr.serialize(CenterRow::new(bc))
            .with_context(|| format!("Failed to write CSV row for business center {}", bc.id))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn to_csv_string<'a, I>(centers: I) -> Result<String>
where
    I: IntoIterator<Item = &'a BusinessCenter>,
{
    let mut buf = Vec::new();
    write_csv(centers, &mut buf)?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}

/// Business centers as GeoJSON points with their summary figures.
pub fn to_feature_collection<'a, I>(centers: I, low_threshold: f64) -> FeatureCollection
where
    I: IntoIterator<Item = &'a BusinessCenter>,
{
    let features = centers
        .into_iter()
        .map(|bc| {
            let class = PenetrationClass::of(bc, low_threshold);
            let mut properties = JsonObject::new();
            properties.insert("name".into(), bc.business_center_name.clone().into());
            properties.insert("address".into(), bc.address.clone().into());
            properties.insert("district".into(), bc.district.clone().into());
            properties.insert("building_purpose".into(), bc.building_purpose.clone().into());
            properties.insert("companies".into(), bc.company_count().into());
            properties.insert("kt_clients".into(), bc.kt_client_count().into());
            properties.insert("penetration".into(), rounded_rate(bc).into());
            properties.insert("marker".into(), class.marker_icon().into());
            properties.insert("revenue".into(), bc.revenue().into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&bc.point()))),
                id: Some(Id::String(bc.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
