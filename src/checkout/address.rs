//! Shipping addresses and the new-address sub-form.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::api::{AddressLookup, ApiError, Region};

/// Id of a saved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressId(pub u64);

impl fmt::Display for AddressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A delivery address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingAddress {
    /// Id on the customer's profile; `None` for a freshly entered address.
    pub id: Option<AddressId>,

    /// Who receives the parcel.
    pub recipient_name: String,

    /// Recipient phone.
    pub phone: String,

    /// Street address.
    #[serde(alias = "address_line")]
    pub line: String,

    /// Ward.
    pub ward: String,

    /// District.
    pub district: String,

    /// City or province.
    #[serde(alias = "province")]
    pub city: String,

    /// Whether this is the profile's default address.
    pub is_default: bool,
}

impl ShippingAddress {
    /// `line, ward, district, city`, skipping empty parts.
    #[must_use]
    pub fn formatted(&self) -> String {
        [&self.line, &self.ward, &self.district, &self.city]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Pick the address to ship to.
///
/// The selected saved address wins, then the default saved address, then the
/// first saved address, then a completed new-address form.
#[must_use]
pub fn resolve_address(
    saved: &[ShippingAddress],
    selected: Option<AddressId>,
    new_address: Option<&NewAddressForm>,
) -> Option<ShippingAddress> {
    let chosen = selected
        .and_then(|id| saved.iter().find(|address| address.id == Some(id)))
        .or_else(|| saved.iter().find(|address| address.is_default))
        .or_else(|| saved.first());

    match chosen {
        Some(address) => Some(address.clone()),
        None => new_address.and_then(NewAddressForm::complete),
    }
}

/// The new-address sub-form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewAddressForm {
    /// Who receives the parcel.
    pub recipient_name: String,

    /// Recipient phone.
    pub phone: String,

    /// Street address.
    pub line: String,

    /// Chosen province.
    pub province: Option<Region>,

    /// Chosen district.
    pub district: Option<Region>,

    /// Chosen ward.
    pub ward: Option<Region>,
}

impl NewAddressForm {
    /// The address, once the street line and all three regions are filled in.
    #[must_use]
    pub fn complete(&self) -> Option<ShippingAddress> {
        let line = self.line.trim();

        if line.is_empty() {
            return None;
        }

        let (Some(province), Some(district), Some(ward)) =
            (&self.province, &self.district, &self.ward)
        else {
            return None;
        };

        Some(ShippingAddress {
            id: None,
            recipient_name: self.recipient_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            line: line.to_string(),
            ward: ward.name.clone(),
            district: district.name.clone(),
            city: province.name.clone(),
            is_default: false,
        })
    }
}

/// Errors raised by the province/district/ward cascade.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The lookup service failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The code is not among the loaded options.
    #[error("unknown region code {0}")]
    UnknownRegion(String),
}

/// Drives the cascading province, district and ward pickers.
///
/// Choosing a province reloads its districts and clears the district and ward;
/// choosing a district reloads its wards and clears the ward.
pub struct AddressCascade {
    lookup: Arc<dyn AddressLookup>,
    provinces: Vec<Region>,
    districts: Vec<Region>,
    wards: Vec<Region>,
    form: NewAddressForm,
}

impl fmt::Debug for AddressCascade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressCascade")
            .field("provinces", &self.provinces.len())
            .field("districts", &self.districts.len())
            .field("wards", &self.wards.len())
            .field("form", &self.form)
            .finish_non_exhaustive()
    }
}

impl AddressCascade {
    /// Create an empty cascade.
    #[must_use]
    pub fn new(lookup: Arc<dyn AddressLookup>) -> Self {
        Self {
            lookup,
            provinces: Vec::new(),
            districts: Vec::new(),
            wards: Vec::new(),
            form: NewAddressForm::default(),
        }
    }

    /// Load the province options.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn load_provinces(&mut self) -> Result<&[Region], AddressError> {
        self.provinces = self.lookup.provinces().await?;

        debug!(count = self.provinces.len(), "loaded provinces");

        Ok(&self.provinces)
    }

    /// Choose a province and load its districts.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is unknown or the lookup fails.
    pub async fn select_province(&mut self, code: &str) -> Result<&[Region], AddressError> {
        let province = find(&self.provinces, code)?;

        self.districts = self.lookup.districts(&province.code).await?;
        self.wards.clear();
        self.form.province = Some(province);
        self.form.district = None;
        self.form.ward = None;

        Ok(&self.districts)
    }

    /// Choose a district and load its wards.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is unknown or the lookup fails.
    pub async fn select_district(&mut self, code: &str) -> Result<&[Region], AddressError> {
        let district = find(&self.districts, code)?;

        self.wards = self.lookup.wards(&district.code).await?;
        self.form.district = Some(district);
        self.form.ward = None;

        Ok(&self.wards)
    }

    /// Choose a ward.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::UnknownRegion`] if the code is not loaded.
    pub fn select_ward(&mut self, code: &str) -> Result<(), AddressError> {
        self.form.ward = Some(find(&self.wards, code)?);

        Ok(())
    }

    /// Set the street line.
    pub fn set_line(&mut self, line: impl Into<String>) {
        self.form.line = line.into();
    }

    /// Set the recipient.
    pub fn set_recipient(&mut self, name: impl Into<String>, phone: impl Into<String>) {
        self.form.recipient_name = name.into();
        self.form.phone = phone.into();
    }

    /// The form as filled in so far.
    #[must_use]
    pub fn form(&self) -> &NewAddressForm {
        &self.form
    }
}

fn find(options: &[Region], code: &str) -> Result<Region, AddressError> {
    options
        .iter()
        .find(|region| region.code == code)
        .cloned()
        .ok_or_else(|| AddressError::UnknownRegion(code.to_string()))
}
