//! Pipeline stages for slide enhancement.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! ExtractedSlide ──▶ enhance ──▶ generate ──▶ parse ──▶ Slide
//!                   (fan-out)   (AI call)   (strict JSON)
//! ```
//!
//! 1. [`enhance`]: build the four prompts, run them concurrently, assemble
//!    the slide; also the three regenerate operations
//! 2. [`generate`]: the [`generate::TextGenerator`] seam and the
//!    edgequake-llm adapter; the only stage with network I/O
//! 3. [`parse`]: fence stripping, balanced-JSON location, serde decode
//!    and validation; fails closed

pub mod enhance;
pub mod generate;
pub mod parse;
