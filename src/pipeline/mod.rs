//! Pipeline stages applied to a staged upload.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the orchestrator reads as a plain sequence of calls.
//!
//! ## Data Flow
//!
//! ```text
//! staged file ──▶ invoke ──▶ normalize ──▶ metadata
//!   (path)      (converter)  (plain text)   (stats)
//! ```
//!
//! 1. [`invoke`]    — call the [`crate::converter::DocumentConverter`]; the
//!    only stage that can take an unbounded amount of time
//! 2. [`normalize`] — strip Markdown syntax to get a plain-text rendering
//! 3. [`metadata`]  — size, word and page counts plus a format guess
//!
//! Stages 2 and 3 are pure, synchronous and fast.

pub mod invoke;
pub mod metadata;
pub mod normalize;
