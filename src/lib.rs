//! Food catalog and composition service: foods, nutrition and companies with
//! short unique codes, plus mixtures and salads built from weighted foods.

pub mod app;
pub mod catalog;
pub mod codes;
pub mod compositions;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod state;

#[cfg(test)]
mod testing;
