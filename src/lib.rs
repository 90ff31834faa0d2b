// Autofill: boundary strokes → closed patches → candidate interior fills.
// See engine/mod.rs for the module layout.

pub mod engine;

pub use engine::*;
