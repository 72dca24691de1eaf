// src/lib.rs

pub mod config;
pub mod core;
pub mod dedup;
pub mod discovery;
pub mod error;
pub mod learning;
pub mod persistence;
pub mod progress;
pub mod render;
pub mod validation;

pub use crate::core::engine::GlossaryEngine;
pub use crate::core::store::TermStore;
pub use crate::core::subglossary::{SubGlossary, SubGlossaryBuilder};
pub use crate::core::types::{Category, Chapter, Gender, Term};
pub use crate::error::{GlossaryError, Result};
