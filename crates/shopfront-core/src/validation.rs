//! # Validation Module
//!
//! Input validation for cart operations and the shipping form.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form / CLI input                                             │
//! │  └── raw strings, nothing trusted                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── product id present, quantity positive                             │
//! │  └── every required shipping field non-empty (per-field messages)     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Remote store API                                             │
//! │  └── product exists, price re-checked at checkout                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Shipping fields are checked for presence only. Postal codes and phone
//! numbers are not format-checked.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::ShippingAddress;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates that a product carries a usable identifier.
///
/// ## Example
/// ```rust
/// use shopfront_core::validation::validate_product_id;
///
/// assert!(validate_product_id("p1").is_ok());
/// assert!(validate_product_id("   ").is_err());
/// ```
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("product id"));
    }
    Ok(())
}

/// Validates a cart quantity.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// There is no upper cap: the merge invariant (quantity equals the sum of
/// all additions) holds for any sequence of adds that fits in an i64.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }
    Ok(())
}

// =============================================================================
// Shipping Form
// =============================================================================

/// Raw shipping form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingForm {
    pub full_name: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state_province: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

impl From<&ShippingAddress> for ShippingForm {
    /// Pre-fills the form from a previously staged address.
    fn from(address: &ShippingAddress) -> Self {
        ShippingForm {
            full_name: address.full_name.clone(),
            address_line1: address.address_line1.clone(),
            address_line2: address.address_line2.clone().unwrap_or_default(),
            city: address.city.clone(),
            state_province: address.state_province.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            phone: address.phone.clone(),
        }
    }
}

/// One failed form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FieldError {
    /// Form field name, as used by the front end (`fullName`, `city`, ...).
    pub field: String,
    pub message: String,
}

/// All failed fields of one form submission, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FieldErrors {
    pub errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns the message for a form field, if that field failed.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn push(&mut self, field: &str, message: String) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message,
        });
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// Validates the shipping form and builds a [`ShippingAddress`].
///
/// ## Rules
/// - Every field except `addressLine2` must be non-empty after trimming
/// - Values are trimmed; an empty `addressLine2` becomes `None`
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Shipping step: user presses "Continue to Payment"                     │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_shipping_form(form) ← THIS FUNCTION                          │
/// │       │                                                                 │
/// │       ├── city empty? → { field: "city", "City is required" }          │
/// │       │   (stay on shipping step, show message under the field)        │
/// │       │                                                                 │
/// │       └── all present → ShippingAddress → staged → payment step        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_shipping_form(form: &ShippingForm) -> Result<ShippingAddress, FieldErrors> {
    let mut errors = FieldErrors::default();

    let mut required = |field: &str, label: &str, value: &str| -> String {
        let value = value.trim();
        if value.is_empty() {
            errors.push(field, format!("{} is required", label));
        }
        value.to_string()
    };

    let full_name = required("fullName", "Full Name", &form.full_name);
    let address_line1 = required("addressLine1", "Address Line 1", &form.address_line1);
    let city = required("city", "City", &form.city);
    let state_province = required("stateProvince", "State/Province", &form.state_province);
    let postal_code = required("postalCode", "Postal Code", &form.postal_code);
    let country = required("country", "Country", &form.country);
    let phone = required("phone", "Phone Number", &form.phone);

    if !errors.is_empty() {
        return Err(errors);
    }

    let address_line2 = Some(form.address_line2.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(ShippingAddress {
        full_name,
        address_line1,
        address_line2,
        city,
        state_province,
        postal_code,
        country,
        phone,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> ShippingForm {
        ShippingForm {
            full_name: "Ada Lovelace".to_string(),
            address_line1: "12 St James's Square".to_string(),
            address_line2: String::new(),
            city: "London".to_string(),
            state_province: "Greater London".to_string(),
            postal_code: "SW1Y 4JH".to_string(),
            country: "UK".to_string(),
            phone: "+44 20 7946 0000".to_string(),
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_product_id() {
        assert!(validate_product_id("prod-123").is_ok());
        assert_eq!(
            validate_product_id("").unwrap_err(),
            ValidationError::required("product id")
        );
    }

    #[test]
    fn test_validate_price_and_tax() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(validate_tax_rate_bps(800).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_complete_form_builds_address() {
        let address = validate_shipping_form(&complete_form()).unwrap();
        assert_eq!(address.full_name, "Ada Lovelace");
        assert_eq!(address.address_line2, None);
    }

    #[test]
    fn test_values_are_trimmed() {
        let mut form = complete_form();
        form.city = "  London  ".to_string();
        form.address_line2 = "  Flat 2 ".to_string();

        let address = validate_shipping_form(&form).unwrap();
        assert_eq!(address.city, "London");
        assert_eq!(address.address_line2.as_deref(), Some("Flat 2"));
    }

    #[test]
    fn test_each_missing_field_is_reported() {
        let mut form = complete_form();
        form.city = "   ".to_string();
        form.phone = String::new();

        let errors = validate_shipping_form(&form).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("city"), Some("City is required"));
        assert_eq!(errors.get("phone"), Some("Phone Number is required"));
        assert_eq!(errors.get("fullName"), None);
    }

    #[test]
    fn test_empty_form_reports_all_required_fields_in_order() {
        let errors = validate_shipping_form(&ShippingForm::default()).unwrap_err();
        let fields: Vec<&str> = errors.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "fullName",
                "addressLine1",
                "city",
                "stateProvince",
                "postalCode",
                "country",
                "phone"
            ]
        );
        assert_eq!(errors.get("stateProvince"), Some("State/Province is required"));
    }

    #[test]
    fn test_form_prefills_from_address() {
        let address = validate_shipping_form(&complete_form()).unwrap();
        let form = ShippingForm::from(&address);
        assert_eq!(form, complete_form());
    }
}
