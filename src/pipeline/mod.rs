//! Pipeline stages for verified question answering.
//!
//! Each submodule implements exactly one step. Stages never touch
//! [`crate::state::PipelineState`] directly: they take what they need as
//! arguments and return new values, and the orchestrator writes them back.
//!
//! ## Data Flow
//!
//! ```text
//! query ──▶ validate ──▶ (extract) ──▶ summarize ──▶ search ──▶ verify
//!           (1 call)                   (N calls,     (1 call)   (M calls,
//!                                       bounded)                 bounded)
//! ```
//!
//! 1. [`validate`]  — classify the query as answerable or gibberish
//! 2. [`summarize`] — heading sentence + three key points per page
//! 3. [`search`]    — top relevant points across all summaries, attributed
//!    to one page each
//! 4. [`verify`]    — check each point against the normalized page text
//!
//! Shared helpers: [`parse`] decodes every model reply, [`normalize`] cleans
//! page text, and [`fanout`] runs the per-item stages with a concurrency cap.

pub mod fanout;
pub mod normalize;
pub mod parse;
pub mod search;
pub mod summarize;
pub mod validate;
pub mod verify;
