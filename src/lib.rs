//! ContextSmith: a deterministic, token-aware context bundler for LLMs.
//!
//! The `diff` subcommand's pipeline lives in [`diffctx`]; its entry point is
//! [`diffctx::build_diff_context`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod diffctx;
pub mod error;
pub mod git;
pub mod indexer;
pub mod manifest;
pub mod output;
pub mod ranker;
pub mod scanner;
pub mod symbols;
pub mod tokens;
pub mod utils;

pub use diffctx::{build_diff_context, BuildOptions, DiffContext};
