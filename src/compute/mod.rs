//! Updaters and the array kernels they run on.
pub mod array;
pub mod ode;
pub mod pointwise;
pub mod reduce;
pub mod sum;
pub mod updater;

pub use array::Array;
pub use updater::{Compute, UpdateContext, Updater};
