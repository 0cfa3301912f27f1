//! Bundled sample problems, built with the `ast` helpers.

pub mod elevators;
pub mod recon;
