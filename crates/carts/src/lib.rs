//! `savx-carts` — customer cart domain.

pub mod cart;

pub use cart::{CartLine, CartLineDetail, NewCartLine};
