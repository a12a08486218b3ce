//! Address selection during checkout.
//!
//! ```text
//! Viewing ──change──▶ Listing ──add new──▶ Creating ──save──▶ Viewing
//!    ▲                   │ choose                │
//!    └───────────────────┘                       └──cancel (book not empty)──▶ Viewing
//! ```

use super::location::LocationCascade;
use super::session::Session;
use crate::domain::aggregates::{Address, AddressBook};
use crate::{CommerceError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressStep { Viewing, Listing, Creating }

/// Fields of the new-address form.
#[derive(Clone, Debug, Default)]
pub struct AddressDraft {
    pub full_name: String,
    pub mobile_number: String,
    pub street: String,
    pub zip_code: String,
    pub location: LocationCascade,
}

#[derive(Clone, Debug)]
pub struct AddressFlow {
    step: AddressStep,
    selected: Option<Address>,
    draft: AddressDraft,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressFlowError {
    #[error("Cannot {action} while {step:?}")]
    InvalidStep { step: AddressStep, action: &'static str },
    #[error("No saved address to return to")]
    NothingToReturnTo,
    #[error("No saved address at position {0}")]
    NoSuchAddress(usize),
    #[error("Select a province, city and barangay")]
    IncompleteLocation,
}

impl From<AddressFlowError> for CommerceError {
    fn from(e: AddressFlowError) -> Self { Self::Validation(e.to_string()) }
}

impl AddressFlow {
    /// Starts on the default address, or on the form when the book is empty.
    pub fn new(book: &AddressBook) -> Self {
        let selected = book.default_address().cloned();
        let step = if selected.is_some() { AddressStep::Viewing } else { AddressStep::Creating };
        Self { step, selected, draft: AddressDraft::default() }
    }

    pub fn step(&self) -> AddressStep { self.step }
    pub fn selected(&self) -> Option<&Address> { self.selected.as_ref() }
    pub fn draft(&self) -> &AddressDraft { &self.draft }
    pub fn draft_mut(&mut self) -> &mut AddressDraft { &mut self.draft }

    pub fn request_change(&mut self) -> std::result::Result<(), AddressFlowError> {
        self.expect(AddressStep::Viewing, "list addresses")?;
        self.step = AddressStep::Listing;
        Ok(())
    }

    pub fn choose(&mut self, book: &AddressBook, index: usize) -> std::result::Result<&Address, AddressFlowError> {
        self.expect(AddressStep::Listing, "choose an address")?;
        let address = book.get(index).ok_or(AddressFlowError::NoSuchAddress(index))?.clone();
        self.step = AddressStep::Viewing;
        Ok(&*self.selected.insert(address))
    }

    pub fn add_new(&mut self) -> std::result::Result<(), AddressFlowError> {
        self.expect(AddressStep::Listing, "add an address")?;
        self.draft = AddressDraft::default();
        self.step = AddressStep::Creating;
        Ok(())
    }

    pub fn cancel(&mut self, book: &AddressBook) -> std::result::Result<(), AddressFlowError> {
        if book.is_empty() { return Err(AddressFlowError::NothingToReturnTo); }
        if self.selected.is_none() { self.selected = book.default_address().cloned(); }
        self.step = AddressStep::Viewing;
        Ok(())
    }

    /// Saves the draft into the session's address book and selects it.
    /// On failure the flow stays on the form with the draft intact.
    pub async fn save(&mut self, session: &mut Session) -> Result<&Address> {
        self.expect(AddressStep::Creating, "save an address")?;
        let names = self.draft.location.place_names().ok_or(AddressFlowError::IncompleteLocation)?;
        let address = Address {
            id: None,
            full_name: self.draft.full_name.trim().to_string(),
            mobile_number: self.draft.mobile_number.trim().to_string(),
            street: self.draft.street.trim().to_string(),
            barangay: names.barangay,
            city: names.city,
            province: names.province,
            zip_code: self.draft.zip_code.trim().to_string(),
            is_default: false,
        };
        let saved = session.save_address(address).await?;
        self.step = AddressStep::Viewing;
        self.draft = AddressDraft::default();
        Ok(&*self.selected.insert(saved))
    }

    fn expect(&self, step: AddressStep, action: &'static str) -> std::result::Result<(), AddressFlowError> {
        if self.step == step { Ok(()) } else { Err(AddressFlowError::InvalidStep { step: self.step, action }) }
    }
}
