//! Core shared helpers

pub mod string;
