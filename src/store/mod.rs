//! Arena storage for the physics graph.
pub mod quantity;
pub mod registry;
pub mod types;

pub use quantity::{Multiplier, Quantity, Storage};
pub use registry::Registry;
pub use types::{Kind, QuantityId, QuantityMetadata, Unit};
