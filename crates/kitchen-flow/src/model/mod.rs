//! Pure data structures. Behaviour lives in [`crate::transitions`],
//! [`crate::order_actor`] and [`crate::sync_tracker`].

pub mod integration;
pub mod order;

pub use integration::*;
pub use order::*;
