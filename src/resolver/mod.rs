//! Table and column resolution.
//!
//! Both resolvers are ordered lists of strategies; the first strategy that
//! produces a match decides the result and its confidence.

pub mod column;
pub mod table;

pub use column::*;
pub use table::*;
