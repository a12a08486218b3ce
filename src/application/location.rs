//! Province → city → barangay cascade.
//!
//! Selections are strictly hierarchical: changing a level clears every level
//! below it, both the chosen value and the fetched list. Each list slot has a
//! request sequence number, and a lookup result is applied only if it answers
//! the latest request issued for that slot. A late reply for a province the
//! user already moved away from is dropped.

use crate::services::{LocationCode, LocationLookup};
use crate::{CommerceError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level { Provinces, Cities, Barangays }

/// Handle for one in-flight lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupTicket { pub level: Level, pub seq: u64, pub parent_code: Option<String> }

#[derive(Clone, Debug, Default)]
pub struct LocationCascade {
    provinces: Vec<LocationCode>,
    cities: Vec<LocationCode>,
    barangays: Vec<LocationCode>,
    province: Option<LocationCode>,
    city: Option<LocationCode>,
    barangay: Option<LocationCode>,
    seq: [u64; 3],
}

/// Names of a complete selection, ready to go into an address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaceNames { pub province: String, pub city: String, pub barangay: String }

impl Level {
    fn slot(self) -> usize { match self { Self::Provinces => 0, Self::Cities => 1, Self::Barangays => 2 } }
}

impl LocationCascade {
    pub fn new() -> Self { Self::default() }

    pub fn provinces(&self) -> &[LocationCode] { &self.provinces }
    pub fn cities(&self) -> &[LocationCode] { &self.cities }
    pub fn barangays(&self) -> &[LocationCode] { &self.barangays }
    pub fn province(&self) -> Option<&LocationCode> { self.province.as_ref() }
    pub fn city(&self) -> Option<&LocationCode> { self.city.as_ref() }
    pub fn barangay(&self) -> Option<&LocationCode> { self.barangay.as_ref() }

    pub fn begin_provinces(&mut self) -> LookupTicket { self.issue(Level::Provinces, None) }

    /// Selects a province (an empty code clears it), resets city and barangay,
    /// and returns the ticket for the city lookup.
    pub fn select_province(&mut self, code: &str) -> Result<Option<LookupTicket>> {
        let chosen = Self::find(&self.provinces, code, "province")?;
        self.province = chosen;
        self.city = None;
        self.barangay = None;
        self.cities.clear();
        self.barangays.clear();
        self.bump(Level::Barangays);
        let ticket = self.issue(Level::Cities, self.province.as_ref().map(|p| p.code.clone()));
        Ok(self.province.is_some().then_some(ticket))
    }

    /// Selects a city, resets barangay, and returns the ticket for the barangay lookup.
    pub fn select_city(&mut self, code: &str) -> Result<Option<LookupTicket>> {
        let chosen = Self::find(&self.cities, code, "city")?;
        self.city = chosen;
        self.barangay = None;
        self.barangays.clear();
        let ticket = self.issue(Level::Barangays, self.city.as_ref().map(|c| c.code.clone()));
        Ok(self.city.is_some().then_some(ticket))
    }

    pub fn select_barangay(&mut self, code: &str) -> Result<()> {
        self.barangay = Self::find(&self.barangays, code, "barangay")?;
        Ok(())
    }

    /// Stores a lookup result. Returns `false`, leaving state untouched, when the ticket is stale.
    pub fn apply(&mut self, ticket: &LookupTicket, results: Vec<LocationCode>) -> bool {
        if self.seq[ticket.level.slot()] != ticket.seq {
            tracing::debug!(level = ?ticket.level, seq = ticket.seq, latest = self.seq[ticket.level.slot()], "Discarding stale location lookup");
            return false;
        }
        match ticket.level {
            Level::Provinces => self.provinces = results,
            Level::Cities => self.cities = results,
            Level::Barangays => self.barangays = results,
        }
        true
    }

    /// Runs the lookup a ticket stands for and applies it.
    pub async fn fulfil(&mut self, lookup: &dyn LocationLookup, ticket: LookupTicket) -> Result<bool> {
        let results = match (&ticket.level, ticket.parent_code.as_deref()) {
            (Level::Provinces, _) => lookup.list_provinces().await?,
            (Level::Cities, Some(code)) => lookup.list_cities(code).await?,
            (Level::Barangays, Some(code)) => lookup.list_barangays(code).await?,
            (_, None) => Vec::new(),
        };
        Ok(self.apply(&ticket, results))
    }

    pub async fn load_provinces(&mut self, lookup: &dyn LocationLookup) -> Result<()> {
        let ticket = self.begin_provinces();
        self.fulfil(lookup, ticket).await.map(|_| ())
    }

    pub async fn choose_province(&mut self, lookup: &dyn LocationLookup, code: &str) -> Result<()> {
        if let Some(ticket) = self.select_province(code)? { self.fulfil(lookup, ticket).await?; }
        Ok(())
    }

    pub async fn choose_city(&mut self, lookup: &dyn LocationLookup, code: &str) -> Result<()> {
        if let Some(ticket) = self.select_city(code)? { self.fulfil(lookup, ticket).await?; }
        Ok(())
    }

    /// All three names, or `None` while any level is unselected.
    pub fn place_names(&self) -> Option<PlaceNames> {
        Some(PlaceNames {
            province: self.province.as_ref()?.name.clone(),
            city: self.city.as_ref()?.name.clone(),
            barangay: self.barangay.as_ref()?.name.clone(),
        })
    }

    fn find(options: &[LocationCode], code: &str, kind: &'static str) -> Result<Option<LocationCode>> {
        if code.is_empty() { return Ok(None); }
        options.iter().find(|o| o.code == code).cloned().map(Some).ok_or_else(|| CommerceError::Validation(format!("unknown {kind} code {code}")))
    }

    fn bump(&mut self, level: Level) -> u64 {
        let slot = &mut self.seq[level.slot()];
        *slot += 1;
        *slot
    }

    fn issue(&mut self, level: Level, parent_code: Option<String>) -> LookupTicket {
        LookupTicket { level, seq: self.bump(level), parent_code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StaticLocations;

    fn code(code: &str, name: &str) -> LocationCode { LocationCode { code: code.into(), name: name.into() } }

    async fn loaded() -> (LocationCascade, StaticLocations) {
        let dir = StaticLocations::bundled().unwrap();
        let mut cascade = LocationCascade::new();
        cascade.load_provinces(&dir).await.unwrap();
        (cascade, dir)
    }

    #[tokio::test]
    async fn test_full_selection() {
        let (mut cascade, dir) = loaded().await;
        cascade.choose_province(&dir, "012800000").await.unwrap();
        cascade.choose_city(&dir, "012819000").await.unwrap();
        cascade.select_barangay("012819031").unwrap();
        assert_eq!(cascade.place_names(), Some(PlaceNames { province: "Ilocos Norte".into(), city: "Paoay".into(), barangay: "Suba".into() }));
    }

    #[tokio::test]
    async fn test_new_province_resets_lower_levels() {
        let (mut cascade, dir) = loaded().await;
        cascade.choose_province(&dir, "012800000").await.unwrap();
        cascade.choose_city(&dir, "012812000").await.unwrap();
        cascade.select_barangay("012812001").unwrap();

        cascade.choose_province(&dir, "012900000").await.unwrap();
        assert!(cascade.city().is_none());
        assert!(cascade.barangay().is_none());
        assert!(cascade.barangays().is_empty());
        assert!(cascade.cities().iter().any(|c| c.name == "City of Vigan"));
        assert!(cascade.place_names().is_none());
    }

    #[tokio::test]
    async fn test_new_city_resets_barangay() {
        let (mut cascade, dir) = loaded().await;
        cascade.choose_province(&dir, "012800000").await.unwrap();
        cascade.choose_city(&dir, "012812000").await.unwrap();
        cascade.select_barangay("012812001").unwrap();
        cascade.choose_city(&dir, "012805000").await.unwrap();
        assert!(cascade.barangay().is_none());
        assert!(cascade.barangays().iter().any(|b| b.name == "Baay"));
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut cascade = LocationCascade::new();
        let t = cascade.begin_provinces();
        assert!(cascade.apply(&t, vec![code("P1", "North"), code("P2", "South")]));

        let first = cascade.select_province("P1").unwrap().unwrap();
        let second = cascade.select_province("P2").unwrap().unwrap();
        assert!(cascade.apply(&second, vec![code("C2", "South City")]));
        assert!(!cascade.apply(&first, vec![code("C1", "North City")]));
        assert_eq!(cascade.cities(), &[code("C2", "South City")]);
    }

    #[test]
    fn test_pending_barangays_invalidated_by_province_change() {
        let mut cascade = LocationCascade::new();
        let t = cascade.begin_provinces();
        cascade.apply(&t, vec![code("P1", "North")]);
        let cities = cascade.select_province("P1").unwrap().unwrap();
        cascade.apply(&cities, vec![code("C1", "North City")]);
        let barangays = cascade.select_city("C1").unwrap().unwrap();
        cascade.select_province("P1").unwrap();
        assert!(!cascade.apply(&barangays, vec![code("B1", "Poblacion")]));
        assert!(cascade.barangays().is_empty());
    }

    #[test]
    fn test_clearing_and_unknown_codes() {
        let mut cascade = LocationCascade::new();
        let t = cascade.begin_provinces();
        cascade.apply(&t, vec![code("P1", "North")]);
        assert!(cascade.select_province("").unwrap().is_none());
        assert!(matches!(cascade.select_province("P9"), Err(CommerceError::Validation(_))));
        assert!(matches!(cascade.select_city("C1"), Err(CommerceError::Validation(_))));
    }
}
