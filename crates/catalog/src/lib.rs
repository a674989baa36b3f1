//! `savx-catalog` — product and variant domain.

pub mod product;

pub use product::{NewProduct, NewVariant, Product, ProductUpdate, Variant};
