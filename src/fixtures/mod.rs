//! Fixtures
//!
//! YAML carts, vouchers and checkout forms used by the command line and tests.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{
    cart::{CartError, CartLineItem},
    checkout::CheckoutForm,
    vouchers::{Voucher, VoucherError},
};

pub mod cart;

pub use cart::{CartFixture, CartItemFixture, parse_price};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,

        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Price in a currency other than the storefront's
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Invalid cart line
    #[error("Invalid cart line: {0}")]
    Cart(#[from] CartError),

    /// Invalid voucher definition
    #[error("Invalid voucher: {0}")]
    Voucher(#[from] VoucherError),
}

/// Fixture
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Create a fixture loader rooted at `./fixtures`
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a fixture loader with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Load `carts/{name}.yml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn cart(&self, name: &str) -> Result<Vec<CartLineItem>, FixtureError> {
        read_cart(&self.base_path.join("carts").join(format!("{name}.yml")))
    }

    /// Load `vouchers/{name}.yml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the voucher is invalid.
    pub fn voucher(&self, name: &str) -> Result<Voucher, FixtureError> {
        read_voucher(&self.base_path.join("vouchers").join(format!("{name}.yml")))
    }

    /// Load `forms/{name}.yml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn form(&self, name: &str) -> Result<CheckoutForm, FixtureError> {
        read_form(&self.base_path.join("forms").join(format!("{name}.yml")))
    }
}

fn read(path: &Path) -> Result<String, FixtureError> {
    fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse cart lines from YAML
///
/// # Errors
///
/// Returns an error if the YAML or a line is invalid.
pub fn cart_from_str(yaml: &str) -> Result<Vec<CartLineItem>, FixtureError> {
    let fixture: CartFixture = serde_norway::from_str(yaml)?;

    fixture.items.into_iter().map(CartLineItem::try_from).collect()
}

/// Parse a voucher from YAML and check its invariants
///
/// # Errors
///
/// Returns an error if the YAML or the voucher is invalid.
pub fn voucher_from_str(yaml: &str) -> Result<Voucher, FixtureError> {
    let voucher: Voucher = serde_norway::from_str(yaml)?;

    voucher.validate()?;

    Ok(voucher)
}

/// Read cart lines from a YAML file
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_cart(path: &Path) -> Result<Vec<CartLineItem>, FixtureError> {
    cart_from_str(&read(path)?)
}

/// Read a voucher from a YAML file
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the voucher is invalid.
pub fn read_voucher(path: &Path) -> Result<Voucher, FixtureError> {
    voucher_from_str(&read(path)?)
}

/// Read a checkout form from a YAML file
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_form(path: &Path) -> Result<CheckoutForm, FixtureError> {
    Ok(serde_norway::from_str(&read(path)?)?)
}
