//! `savx-orders` — order domain: draft validation, placed orders, status
//! lifecycle and the placement error taxonomy.

pub mod draft;
pub mod error;
pub mod order;
pub mod status;

pub use draft::{DraftLine, OrderDraft, ValidatedLine};
pub use error::{PlaceOrderError, Shortage};
pub use order::{CustomerInfo, Order, OrderLineItem, ShippingInfo, StatusChange, Tracking};
pub use status::{notifies_customer, OrderStatus, StatusStamp};
