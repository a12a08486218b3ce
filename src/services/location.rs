//! Location directory backed by a bundled PSGC extract.

use async_trait::async_trait;
use serde::Deserialize;

use super::{LocationCode, LocationLookup};
use crate::Result;

const BUNDLED: &str = include_str!("../../data/locations.json");

#[derive(Debug, Deserialize)]
struct Directory { provinces: Vec<ProvinceEntry> }

#[derive(Debug, Deserialize)]
struct ProvinceEntry { code: String, name: String, #[serde(default)] cities: Vec<CityEntry> }

#[derive(Debug, Deserialize)]
struct CityEntry { code: String, name: String, #[serde(default)] barangays: Vec<LocationCode> }

#[derive(Debug)]
pub struct StaticLocations { provinces: Vec<ProvinceEntry> }

impl StaticLocations {
    pub fn bundled() -> Result<Self> { Self::from_json(BUNDLED) }

    pub fn from_json(json: &str) -> Result<Self> {
        let directory: Directory = serde_json::from_str(json)?;
        Ok(Self { provinces: directory.provinces })
    }

    fn cities(&self) -> impl Iterator<Item = &CityEntry> { self.provinces.iter().flat_map(|p| p.cities.iter()) }
}

#[async_trait]
impl LocationLookup for StaticLocations {
    async fn list_provinces(&self) -> Result<Vec<LocationCode>> {
        let mut provinces: Vec<LocationCode> = self.provinces.iter().map(|p| LocationCode { code: p.code.clone(), name: p.name.clone() }).collect();
        provinces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(provinces)
    }

    async fn list_cities(&self, province_code: &str) -> Result<Vec<LocationCode>> {
        Ok(self.provinces.iter().find(|p| p.code == province_code)
            .map(|p| p.cities.iter().map(|c| LocationCode { code: c.code.clone(), name: c.name.clone() }).collect())
            .unwrap_or_default())
    }

    async fn list_barangays(&self, city_code: &str) -> Result<Vec<LocationCode>> {
        Ok(self.cities().find(|c| c.code == city_code).map(|c| c.barangays.clone()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bundled_directory() {
        let dir = StaticLocations::bundled().unwrap();
        let provinces = dir.list_provinces().await.unwrap();
        assert!(provinces.iter().any(|p| p.name == "Ilocos Norte"));
        let cities = dir.list_cities("012800000").await.unwrap();
        assert!(cities.iter().any(|c| c.name == "Paoay"));
        assert!(!dir.list_barangays("012819000").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_codes_are_empty() {
        let dir = StaticLocations::bundled().unwrap();
        assert!(dir.list_cities("999999999").await.unwrap().is_empty());
        assert!(dir.list_barangays("").await.unwrap().is_empty());
    }
}
