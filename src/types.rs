use geo::Point;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessCenter {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub business_center_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub building_purpose: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub companies: Vec<Company>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub organization_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub bin: String,
    #[serde(default)]
    pub is_kt_client: bool,
    #[serde(default)]
    pub accruals: Option<f64>,
    #[serde(default)]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub revenue: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub location: LatLng,
    #[serde(default)]
    pub download_speed: Option<f64>,
    #[serde(default)]
    pub upload_speed: Option<f64>,
}

impl BusinessCenter {
    /// Map position; x is longitude, y is latitude.
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    pub fn company_count(&self) -> usize {
        self.companies.len()
    }

    pub fn kt_client_count(&self) -> usize {
        self.companies.iter().filter(|c| c.is_kt_client).count()
    }

    pub fn has_kt_clients(&self) -> bool {
        self.companies.iter().any(|c| c.is_kt_client)
    }

    /// Sum of company accruals.
    pub fn revenue(&self) -> f64 {
        self.companies.iter().map(Company::accruals_or_zero).sum()
    }

    /// Sum of per-service revenue across all companies.
    pub fn service_revenue(&self) -> f64 {
        self.companies.iter().map(Company::service_revenue).sum()
    }
}

impl Company {
    pub fn accruals_or_zero(&self) -> f64 {
        self.accruals.unwrap_or(0.0)
    }

    pub fn service_revenue(&self) -> f64 {
        self.services.iter().map(|s| s.revenue.unwrap_or(0.0)).sum()
    }
}

/// Ids and BINs show up both as JSON strings and numbers depending on the export.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
        Raw::Null(()) => String::new(),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn company(name: &str, kt: bool, accruals: Option<f64>) -> Company {
        Company {
            organization_name: name.to_string(),
            bin: String::new(),
            is_kt_client: kt,
            accruals,
            services: Vec::new(),
        }
    }

    pub fn center(id: &str, lat: f64, lng: f64, companies: Vec<Company>) -> BusinessCenter {
        BusinessCenter {
            id: id.to_string(),
            business_center_name: format!("BC {}", id),
            address: String::new(),
            district: String::new(),
            building_purpose: String::new(),
            latitude: lat,
            longitude: lng,
            companies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn deserializes_numeric_ids_and_missing_fields() {
        let json = r#"{
            "id": 17,
            "business_center_name": "Nurly Tau",
            "latitude": 51.12,
            "longitude": 71.43,
            "companies": [
                {"organization_name": "A", "bin": 990140000123, "is_kt_client": true, "accruals": 1200.5},
                {"organization_name": "B", "accruals": null}
            ]
        }"#;
        let bc: BusinessCenter = serde_json::from_str(json).unwrap();

        assert_eq!(bc.id, "17");
        assert_eq!(bc.district, "");
        assert_eq!(bc.companies[0].bin, "990140000123");
        assert!(!bc.companies[1].is_kt_client);
        assert_eq!(bc.companies[1].accruals, None);
        assert!(bc.companies[1].services.is_empty());
    }

    #[test]
    fn revenue_treats_missing_accruals_as_zero() {
        let bc = center(
            "1",
            0.0,
            0.0,
            vec![
                company("a", false, Some(100.0)),
                company("b", true, None),
                company("c", false, Some(50.0)),
            ],
        );
        assert_eq!(bc.revenue(), 150.0);
        assert_eq!(bc.kt_client_count(), 1);
        assert!(bc.has_kt_clients());
    }

    #[test]
    fn service_revenue_sums_nested_services() {
        let mut a = company("a", true, None);
        a.services = vec![
            Service { name: "Internet".into(), revenue: Some(300.0) },
            Service { name: "IP-TV".into(), revenue: None },
        ];
        let mut b = company("b", true, None);
        b.services = vec![Service { name: "Internet".into(), revenue: Some(20.0) }];

        let bc = center("1", 0.0, 0.0, vec![a, b]);
        assert_eq!(bc.service_revenue(), 320.0);
    }
}
