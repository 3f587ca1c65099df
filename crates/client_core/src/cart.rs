//! Session-local donation cart.
//!
//! Entries are positional for the outgoing protocol. An index handed out by
//! [`CartBuilder::entries`] stays valid only until the next mutation, so a UI that removes
//! by index must re-render before allowing another index-based removal. Each entry also
//! carries a synthetic [`EntryId`] which stays valid for the entry's lifetime.

use shared::{domain::DonationItem, protocol::ItemsCatalog};
use tracing::{debug, info};

use crate::error::{CartError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

/// Unvalidated form input. `quantity` is signed so out-of-range input can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemCandidate {
    pub category: String,
    pub name: String,
    pub quantity: i64,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEntry {
    pub id: EntryId,
    pub item: DonationItem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddAck {
    pub entry_id: EntryId,
    pub item: DonationItem,
    pub cart_len: usize,
}

impl AddAck {
    pub fn message(&self) -> String {
        format!(
            "Added {} (Category: {}, Quantity: {}, Condition: {})",
            self.item.name, self.item.category, self.item.quantity, self.item.condition
        )
    }
}

/// Quantity input control. Floors at 1 on decrement; has no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityStepper {
    value: i64,
}

impl Default for QuantityStepper {
    fn default() -> Self {
        Self { value: 1 }
    }
}

impl QuantityStepper {
    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn increment(&mut self) -> i64 {
        self.value = self.value.max(0).saturating_add(1);
        self.value
    }

    pub fn decrement(&mut self) -> i64 {
        self.value = self.value.saturating_sub(1).max(1);
        self.value
    }

    /// Typed-in value; kept as entered until the next validation pass.
    pub fn set(&mut self, value: i64) {
        self.value = value;
    }

    pub fn normalize(&mut self) -> i64 {
        if self.value < 1 {
            self.value = 1;
        }
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 1;
    }
}

#[derive(Debug, Default)]
pub struct CartBuilder {
    catalog: Option<ItemsCatalog>,
    entries: Vec<CartEntry>,
    next_entry_id: u64,
    stepper: QuantityStepper,
}

impl CartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_catalog(&mut self, catalog: ItemsCatalog) {
        info!(
            categories = catalog.categories.len(),
            condition_levels = catalog.condition_levels.len(),
            "items catalog loaded"
        );
        self.catalog = Some(catalog);
    }

    /// True once a catalog has loaded; a later failed reload does not revoke it.
    pub fn is_ready(&self) -> bool {
        self.catalog.is_some()
    }

    pub fn catalog(&self) -> Option<&ItemsCatalog> {
        self.catalog.as_ref()
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn items(&self) -> Vec<DonationItem> {
        self.entries.iter().map(|entry| entry.item.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stepper(&self) -> &QuantityStepper {
        &self.stepper
    }

    pub fn stepper_mut(&mut self) -> &mut QuantityStepper {
        &mut self.stepper
    }

    /// Checks fields in order (category, name, quantity, condition) and reports the
    /// first one that fails.
    pub fn validate(&self, candidate: &ItemCandidate) -> Result<DonationItem, CartError> {
        let catalog = self.catalog.as_ref().ok_or(CartError::CatalogNotReady)?;

        let category = candidate.category.trim();
        if category.is_empty() {
            return Err(ValidationError::MissingCategory.into());
        }
        if !catalog.has_category(category) {
            return Err(ValidationError::UnknownCategory(category.to_string()).into());
        }

        let name = candidate.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName.into());
        }

        if candidate.quantity < 1 {
            return Err(ValidationError::QuantityBelowOne(candidate.quantity).into());
        }
        let quantity = u32::try_from(candidate.quantity)
            .map_err(|_| ValidationError::QuantityTooLarge(candidate.quantity))?;

        let condition = candidate.condition.trim();
        if condition.is_empty() {
            return Err(ValidationError::MissingCondition.into());
        }
        if !catalog.has_condition(condition) {
            return Err(ValidationError::UnknownCondition(condition.to_string()).into());
        }

        Ok(DonationItem {
            category: category.to_string(),
            name: name.to_string(),
            quantity,
            condition: condition.to_string(),
        })
    }

    pub fn add_item(&mut self, candidate: &ItemCandidate) -> Result<AddAck, CartError> {
        let item = match self.validate(candidate) {
            Ok(item) => item,
            Err(err) => {
                self.stepper.normalize();
                debug!(error = %err, "rejected cart candidate");
                return Err(err);
            }
        };

        self.next_entry_id += 1;
        let entry_id = EntryId(self.next_entry_id);
        self.entries.push(CartEntry {
            id: entry_id,
            item: item.clone(),
        });
        self.stepper.reset();
        debug!(entry = entry_id.0, name = %item.name, "added cart entry");

        Ok(AddAck {
            entry_id,
            item,
            cart_len: self.entries.len(),
        })
    }

    /// Removes whatever entry is at `index` right now; later entries shift left.
    pub fn remove_item(&mut self, index: usize) -> Result<CartEntry, CartError> {
        if index >= self.entries.len() {
            return Err(CartError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    pub fn remove_entry(&mut self, id: EntryId) -> Result<CartEntry, CartError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(CartError::UnknownEntry(id.0))?;
        Ok(self.entries.remove(index))
    }
}

#[cfg(test)]
#[path = "tests/cart_tests.rs"]
mod tests;
