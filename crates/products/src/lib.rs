//! Catalog products as seen by the till.
//!
//! Products are owned by the catalog backend; the till only reads them and
//! feeds them into the cart.

pub mod product;

pub use product::Product;
pub use till_core::ProductId;
