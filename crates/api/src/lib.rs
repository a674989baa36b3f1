//! `savx-api` — HTTP surface of the storefront.

pub mod app;
