use crate::config::AppConfig;
use crate::index::CenterIndex;
use crate::types::{BusinessCenter, Provider};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Everything the map and analytics pages read, loaded once at startup.
pub struct Dataset {
    pub centers: Vec<BusinessCenter>,
    pub providers: Vec<Provider>,
    pub index: CenterIndex,
}

impl Dataset {
    pub fn new(centers: Vec<BusinessCenter>, providers: Vec<Provider>) -> Self {
        let index = CenterIndex::build(&centers);
        Self { centers, providers, index }
    }

    pub fn load(config: &AppConfig) -> Result<Self> {
        let centers = load_business_centers(&config.input.business_centers)?;
        let providers = match &config.input.providers {
            Some(path) => load_providers(path)?,
            None => Vec::new(),
        };
        Ok(Self::new(centers, providers))
    }

    pub fn find(&self, id: &str) -> Option<&BusinessCenter> {
        self.centers.iter().find(|bc| bc.id == id)
    }
}

// Exports exist both as a bare array and wrapped under a named key.
// Records stay raw so one malformed entry does not sink the whole file.
#[derive(Deserialize)]
#[serde(untagged)]
enum CentersDocument {
    List(Vec<serde_json::Value>),
    Wrapped {
        #[serde(rename = "businessCenters")]
        business_centers: Vec<serde_json::Value>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProvidersDocument {
    List(Vec<serde_json::Value>),
    Wrapped { providers: Vec<serde_json::Value> },
}

pub fn load_business_centers(path: &Path) -> Result<Vec<BusinessCenter>> {
    info!("Loading business centers from {:?}...", path);
    let document: CentersDocument = read_json(path)?;
    let records = match document {
        CentersDocument::List(r) => r,
        CentersDocument::Wrapped { business_centers } => business_centers,
    };
    let centers = validate_centers(parse_records(records, "business center"));
    info!(
        "Loaded {} business centers with {} companies",
        centers.len(),
        centers.iter().map(BusinessCenter::company_count).sum::<usize>()
    );
    Ok(centers)
}

pub fn load_providers(path: &Path) -> Result<Vec<Provider>> {
    info!("Loading providers from {:?}...", path);
    let document: ProvidersDocument = read_json(path)?;
    let records = match document {
        ProvidersDocument::List(r) => r,
        ProvidersDocument::Wrapped { providers } => providers,
    };
    let providers: Vec<Provider> = parse_records(records, "provider");
    let total = providers.len();
    let providers: Vec<Provider> = providers
        .into_iter()
        .filter(|p| valid_position(p.location.lat, p.location.lng))
        .collect();
    if providers.len() < total {
        warn!("Skipped {} providers with invalid coordinates", total - providers.len());
    }
    info!("Loaded {} providers", providers.len());
    Ok(providers)
}

/// Deserializes each record on its own, skipping the ones that do not fit.
fn parse_records<T: DeserializeOwned>(records: Vec<serde_json::Value>, kind: &str) -> Vec<T> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match T::deserialize(record) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping {} record #{}: {}", kind, i, e);
                None
            }
        })
        .collect()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open JSON file: {:?}", path))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).with_context(|| format!("Failed to parse JSON file: {:?}", path))
}

fn valid_position(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Drops centers that cannot be placed on the map and reports duplicate ids.
fn validate_centers(centers: Vec<BusinessCenter>) -> Vec<BusinessCenter> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(centers.len());

    for bc in centers {
        if !valid_position(bc.latitude, bc.longitude) {
            warn!(
                "Skipping business center {} ({}) with invalid coordinates ({}, {})",
                bc.id, bc.business_center_name, bc.latitude, bc.longitude
            );
            continue;
        }
        if !seen.insert(bc.id.clone()) {
            warn!("Duplicate business center id {}", bc.id);
        }
        kept.push(bc);
    }

    kept
}
