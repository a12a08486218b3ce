//! User profile document
//!
//! The profile is owned by the identity/profile store. The pipeline reads the
//! role, the persisted bag and the address book from it, and writes back the
//! bag, the address list, and the seller fields on approval. Writes are
//! whole-field overwrites: the last writer wins, and two devices editing the
//! same profile are not reconciled.

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::{address::Address, cart::CartLine};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] Customer, Seller, Admin }

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Customer => "customer", Self::Seller => "seller", Self::Admin => "admin" }
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub bag: Vec<CartLine>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub shop_name: Option<String>,
    pub shop_address: Option<String>,
}

/// Partial update for `saveProfileFields`; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<Address>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_address: Option<String>,
}

impl Profile {
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self { uid: uid.into(), display_name: display_name.into(), role, ..Self::default() }
    }

    pub fn apply(&mut self, patch: ProfilePatch) {
        if let Some(addresses) = patch.addresses { self.addresses = addresses; }
        if let Some(role) = patch.role { self.role = role; }
        if patch.shop_name.is_some() { self.shop_name = patch.shop_name; }
        if patch.shop_address.is_some() { self.shop_address = patch.shop_address; }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_names() {
        for role in [Role::Customer, Role::Seller, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut p = Profile::new("u1", "Juan", Role::Customer);
        p.shop_name = Some("Old".into());
        p.apply(ProfilePatch { role: Some(Role::Seller), ..ProfilePatch::default() });
        assert_eq!(p.role, Role::Seller);
        assert_eq!(p.shop_name.as_deref(), Some("Old"));
    }

    #[test]
    fn test_profile_document_shape() {
        let json = serde_json::to_value(Profile::new("u1", "Juan", Role::Admin)).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["displayName"], "Juan");
    }
}
