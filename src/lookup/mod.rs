//! Result normalization for coordinate and address lookups.

pub mod normalize;

pub use normalize::{normalize_address, normalize_point, resolve_district, DISTRICT_FIELDS};
