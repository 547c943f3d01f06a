//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values only;
/// two instances with the same values are the same value. `Money` is the
/// canonical example here: a held deposit of 150.00 GBP equals any other
/// 150.00 GBP regardless of where it came from. To "modify" a value object,
/// construct a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
