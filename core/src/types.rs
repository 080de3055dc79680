//! Request and response DTOs for the Conekta API.
//!
//! # Design
//! Request types use sparse encoding: every field holding its type's default
//! value is left out of the JSON body, so callers only send what they set.
//! Nested objects that the API treats as "absent vs. present" (customer info,
//! shipping contact) are `Option`s, keeping `None` distinct from an empty
//! object.
//!
//! Response types default every missing or `null` field, so a partial payload
//! from the server still decodes.

use serde::{Deserialize, Deserializer, Serialize};

/// Mexican pesos, ISO 4217.
pub const MXN: &str = "MXN";

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Decode an explicit JSON `null` as the type's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Payload for `POST /orders`.
/// See <https://developers.conekta.com/reference/createorder>.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub currency: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<Product>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shipping_lines: Vec<ShippingLine>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tax_lines: Vec<TaxLine>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discount_lines: Vec<DiscountLine>,
    #[serde(skip_serializing_if = "is_false")]
    pub pre_authorize: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<CustomerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_contact: Option<ShippingContact>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub charges: Vec<Charge>,
}

/// A line item of an order. Prices are in cents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub unit_price: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingLine {
    #[serde(skip_serializing_if = "is_zero")]
    pub amount: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub carrier: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tracking_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub method: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxLine {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscountLine {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code: String,
    /// `loyalty`, `campaign`, `coupon` or `sign`.
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub discount_type: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub amount: i64,
}

/// Customer attached to an order, either by id or inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerInfo {
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub customer_id: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(skip_serializing_if = "is_false", deserialize_with = "null_as_default")]
    pub corporate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingContact {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub receiver: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub street1: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub street2: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub postal_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Charge {
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentMethod {
    /// `default`, `card`, `oxxo_cash`, `spei`, ...
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub method_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token_id: String,
    /// Unix timestamp, used by cash and bank transfer methods.
    #[serde(skip_serializing_if = "is_zero")]
    pub expires_at: i64,
}

/// Payload for `POST /customers`.
/// See <https://developers.conekta.com/reference/createcustomer>.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub payment_sources: Vec<PaymentSource>,
    #[serde(skip_serializing_if = "is_false")]
    pub corporate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSource {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token_id: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub source_type: String,
}

/// An order as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub object: String,
    #[serde(deserialize_with = "null_as_default")]
    pub livemode: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub amount: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(deserialize_with = "null_as_default")]
    pub payment_status: String,
    pub customer_info: Option<CustomerInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: i64,
}

/// A customer as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub object: String,
    #[serde(deserialize_with = "null_as_default")]
    pub livemode: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub corporate: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub default_payment_source_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: i64,
}
