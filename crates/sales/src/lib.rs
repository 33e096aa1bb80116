//! The cart of the sale being rung up (event-sourced aggregate).
//!
//! This crate contains the cart's business rules, implemented purely as
//! deterministic domain logic (no IO, no timers, no rendering).

pub mod cart;

pub use cart::{
    AddItem, Cart, CartCleared, CartCommand, CartEvent, CartLine, CartLocked, CartUnlocked,
    CheckoutLine, ClearCart, LineAdded, LineRemoved, LockCart, QuantityDecreased,
    QuantityIncreased, RemoveItem, UnlockCart,
};
