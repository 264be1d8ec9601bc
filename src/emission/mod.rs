//! Emission lines and their contribution functions.
//!
//! Contribution functions are trait objects so that tabulated
//! ([`ContFuncDiscrete`]) and analytic ([`ContFuncGaussian`]) forms can be
//! mixed inside one [`LineCollection`].

pub mod cont_func;
pub mod line;

pub use cont_func::*;
pub use line::*;
