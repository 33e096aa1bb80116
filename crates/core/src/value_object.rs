//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**. A notification message reading
//! `Success("Saved")` is the same value wherever it appears; a product is an
//! entity because two products with the same name are still distinct by id.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// enum Message { Success(String) }
///
/// impl ValueObject for Message {}
///
/// assert_eq!(Message::Success("ok".into()), Message::Success("ok".into()));
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
