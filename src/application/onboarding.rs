//! Seller onboarding.
//!
//! Signed-in customers apply; admins review. Approval promotes the applicant's
//! profile to `Seller` and writes the shop identity fields.

use std::sync::Arc;

use super::Actor;
use crate::domain::aggregates::{ApplicationForm, ApplicationStatus, ProfilePatch, Role, SellerApplication};
use crate::services::{publish_all, EventPublisher, ProfileStore, SellerApplicationStore};
use crate::{CommerceError, Result};

pub struct SellerOnboarding {
    applications: Arc<dyn SellerApplicationStore>,
    profiles: Arc<dyn ProfileStore>,
    publisher: Arc<dyn EventPublisher>,
}

fn require_admin(actor: &Actor) -> Result<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Customer | Role::Seller => Err(CommerceError::Forbidden(format!("{} cannot review seller applications", actor.uid))),
    }
}

impl SellerOnboarding {
    pub fn new(applications: Arc<dyn SellerApplicationStore>, profiles: Arc<dyn ProfileStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { applications, profiles, publisher }
    }

    pub async fn submit(&self, actor: &Actor, form: ApplicationForm) -> Result<SellerApplication> {
        match actor.role {
            Role::Customer if !actor.guest => {}
            Role::Customer => return Err(CommerceError::Forbidden("sign in to apply as a seller".into())),
            Role::Seller | Role::Admin => return Err(CommerceError::Forbidden(format!("{} is already a {}", actor.uid, actor.role.as_str()))),
        }
        let mut application = SellerApplication::submit(actor.uid.clone(), form)?;
        self.applications.submit(&application).await?;
        tracing::info!(application_id = %application.id(), uid = %actor.uid, business = %application.business_name, "Seller application submitted");
        publish_all(self.publisher.as_ref(), application.take_events()).await;
        Ok(application)
    }

    pub async fn list(&self, actor: &Actor, status: ApplicationStatus) -> Result<Vec<SellerApplication>> {
        require_admin(actor)?;
        self.applications.list_by_status(status).await
    }

    /// `false` when the application is unknown or already decided.
    pub async fn approve(&self, actor: &Actor, id: &str) -> Result<bool> {
        require_admin(actor)?;
        let Some(mut application) = self.applications.get(id).await? else { return Ok(false) };
        if let Err(e) = application.approve() {
            tracing::info!(application_id = id, reason = %e, "Approval skipped");
            return Ok(false);
        }
        if !self.applications.approve(&application).await? { return Ok(false); }

        let patch = ProfilePatch {
            role: Some(Role::Seller),
            shop_name: Some(application.business_name.clone()),
            shop_address: Some(application.shop_address()),
            ..ProfilePatch::default()
        };
        if let Err(e) = self.profiles.save_profile_fields(&application.user_id, patch).await {
            tracing::error!(application_id = id, uid = %application.user_id, error = %e, "Application approved but profile promotion failed");
            return Err(e);
        }
        tracing::info!(application_id = id, uid = %application.user_id, by = %actor.uid, "Seller application approved");
        publish_all(self.publisher.as_ref(), application.take_events()).await;
        Ok(true)
    }

    pub async fn reject(&self, actor: &Actor, id: &str) -> Result<bool> {
        require_admin(actor)?;
        let Some(mut application) = self.applications.get(id).await? else { return Ok(false) };
        if let Err(e) = application.reject() {
            tracing::info!(application_id = id, reason = %e, "Rejection skipped");
            return Ok(false);
        }
        if !self.applications.reject(id).await? { return Ok(false); }
        tracing::info!(application_id = id, by = %actor.uid, "Seller application rejected");
        publish_all(self.publisher.as_ref(), application.take_events()).await;
        Ok(true)
    }
}

impl std::fmt::Debug for SellerOnboarding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("SellerOnboarding").finish_non_exhaustive() }
}
