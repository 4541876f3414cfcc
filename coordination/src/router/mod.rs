//! Routing inputs: turning user text into a category and trigger set.
//!
//! ```text
//! text ──lowercase──▶ keyword hits per category ──max (ties: declaration order)──▶ category
//!      └────────────▶ any trigger keyword present ─────────────────────────────────▶ triggers
//! ```

pub mod classifier;

pub use classifier::{CategoryScore, ClassificationReport, ConcernClassifier};
