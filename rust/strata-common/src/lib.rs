//! Core definitions relied upon by all strata-* crates: the error taxonomy, the result
//! alias and a few argument/data verification macros.

pub mod error;
pub mod macros;
pub mod result;

pub use result::Result;
