//! Vendor adapters that normalize upstream wire shapes.

#[cfg(any(feature = "vendor-a", feature = "vendor-b"))]
pub mod simulation;

#[cfg(feature = "vendor-a")]
pub mod vendor_a;

#[cfg(feature = "vendor-b")]
pub mod vendor_b;
