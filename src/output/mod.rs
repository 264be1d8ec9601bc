//! Inversion results and their on-disk form.

pub mod dem;

pub use dem::*;
