//! Seller Application Aggregate
//!
//! `pending → approved` or `pending → rejected`; both outcomes are final.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use crate::domain::events::{DomainEvent, SellerEvent};
use crate::domain::value_objects::{digits_only, validate_mobile_number};

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SellerApplication {
    pub id: Option<String>,
    pub user_id: String,
    #[validate(length(min = 1, message = "business name is required"))]
    pub business_name: String,
    #[validate(length(min = 1, message = "owner name is required"))]
    pub owner_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom = "validate_mobile_number")]
    pub phone_number: String,
    #[validate(length(min = 1, message = "province is required"))]
    pub province: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Form input for a new application.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
    pub business_name: String,
    pub owner_name: String,
    pub email: String,
    pub phone_number: String,
    pub province: String,
    pub city: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus { #[default] Pending, Approved, Rejected }

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Approved => "approved", Self::Rejected => "rejected" }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown application status: {other}")),
        }
    }
}

impl SellerApplication {
    /// Normalises the phone number to digits and validates the form.
    pub fn submit(user_id: impl Into<String>, form: ApplicationForm) -> Result<Self, ApplicationError> {
        let mut app = Self {
            id: Some(Uuid::now_v7().to_string()), user_id: user_id.into(), business_name: form.business_name.trim().to_string(),
            owner_name: form.owner_name.trim().to_string(), email: form.email.trim().to_string(), phone_number: digits_only(&form.phone_number),
            province: form.province, city: form.city, category: form.category, description: form.description,
            status: ApplicationStatus::Pending, created_at: Utc::now(), events: vec![],
        };
        app.validate().map_err(|e| ApplicationError::Invalid(e.to_string()))?;
        app.raise_event(DomainEvent::Seller(SellerEvent::ApplicationSubmitted { application_id: app.id().to_string(), user_id: app.user_id.clone() }));
        Ok(app)
    }

    pub fn id(&self) -> &str { self.id.as_deref().unwrap_or_default() }

    /// `"city, province"`, written to the seller profile as the shop address.
    pub fn shop_address(&self) -> String { format!("{}, {}", self.city, self.province) }

    pub fn approve(&mut self) -> Result<(), ApplicationError> {
        self.decide(ApplicationStatus::Approved)?;
        self.raise_event(DomainEvent::Seller(SellerEvent::ApplicationApproved { application_id: self.id().to_string(), user_id: self.user_id.clone() }));
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), ApplicationError> {
        self.decide(ApplicationStatus::Rejected)?;
        self.raise_event(DomainEvent::Seller(SellerEvent::ApplicationRejected { application_id: self.id().to_string() }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    fn decide(&mut self, outcome: ApplicationStatus) -> Result<(), ApplicationError> {
        if self.status != ApplicationStatus::Pending { return Err(ApplicationError::AlreadyDecided(self.status)); }
        self.status = outcome;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplicationError {
    #[error("Invalid application: {0}")]
    Invalid(String),
    #[error("Application already {0}")]
    AlreadyDecided(ApplicationStatus),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn form() -> ApplicationForm {
        ApplicationForm {
            business_name: "Paoay Loom House".into(), owner_name: "Lorna Agcaoili".into(), email: "lorna@example.com".into(),
            phone_number: "0917 123 4567".into(), province: "Ilocos Norte".into(), city: "Paoay".into(),
            category: "Weaving (Inabel)".into(), description: "Hand-loomed inabel".into(),
        }
    }

    #[test]
    fn test_submit_normalises_phone() {
        let app = SellerApplication::submit("u1", form()).unwrap();
        assert_eq!(app.phone_number, "09171234567");
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.shop_address(), "Paoay, Ilocos Norte");
    }

    #[test]
    fn test_submit_rejects_short_phone() {
        let mut f = form();
        f.phone_number = "0917123".into();
        assert!(matches!(SellerApplication::submit("u1", f), Err(ApplicationError::Invalid(_))));
    }

    #[test]
    fn test_decisions_are_final() {
        let mut app = SellerApplication::submit("u1", form()).unwrap();
        app.approve().unwrap();
        assert_eq!(app.reject().unwrap_err(), ApplicationError::AlreadyDecided(ApplicationStatus::Approved));
        assert_eq!(app.take_events().len(), 2);

        let mut app = SellerApplication::submit("u2", form()).unwrap();
        app.reject().unwrap();
        assert!(app.approve().is_err());
        assert_eq!(app.status, ApplicationStatus::Rejected);
    }
}
