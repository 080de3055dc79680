//! Blocking client for the Conekta payments REST API.
//!
//! # Overview
//! Every operation goes through one generic binder: the request value is
//! encoded as JSON, sent with the API's Basic authentication and versioned
//! `Accept` header, and the answer is decoded either into the operation's
//! response type (HTTP 200) or into a structured `Failure` (anything else).
//!
//! # Design
//! - `bind::build_request` and `bind::parse_response` are pure; only
//!   `Client::bind` performs I/O, through a shared `ureq` agent with a
//!   60-second timeout.
//! - Decoding produces a tagged `Reply`, so success and API failure are
//!   distinct in the type before they are folded into `Result`.
//! - No retries, no hidden state: the client is safe to share across
//!   threads.

pub mod bind;
pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use bind::Reply;
pub use client::{Client, ClientConfig, CUSTOMER_URI, HOST, MAX_BODY, ORDER_URI};
pub use error::{Detail, Error, Failure};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{
    Address, Charge, Customer, CustomerInfo, CustomerRequest, DiscountLine, Order, OrderRequest,
    PaymentMethod, PaymentSource, Product, ShippingContact, ShippingLine, TaxLine, MXN,
};
