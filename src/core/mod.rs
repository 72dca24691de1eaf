// src/core/mod.rs
pub mod context;
pub mod engine;
pub mod scanner;
pub mod store;
pub mod subglossary;
pub mod trie;
pub mod types;
