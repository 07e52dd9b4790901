//! Domain data model.

pub mod lookup;
pub mod session;
