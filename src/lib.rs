//! Deduction-tree dataset generation for legal reasoning benchmarks.
//!
//! A tax-authority decision is decomposed into three legal elements, each
//! justified two levels down by explicit facts and commonsense rules. The
//! crate builds fixed-shape skeletons, fills them from an external content
//! producer under validation, and derives correct/incorrect chapter trees.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
