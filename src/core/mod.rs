pub mod calculator;
pub mod catalog;
pub mod compliance;
pub mod instructions;
pub mod recipes;
pub mod strains;
pub mod units;

pub use crate::domain::ports::{Storage, StrainSource};
pub use crate::utils::error::Result;
