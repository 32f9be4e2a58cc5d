// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe WHAT the system works with:
//
//   architecture.rs — the fixed network shape (F, T, C, K, N, D)
//                     plus the memory-budget arithmetic derived
//                     from it
//   sample.rs       — a labelled training window and the result
//                     of classifying one
//   error.rs        — the typed errors raised by the core engine
//   traits.rs       — the seams other layers implement
//
// Rules for this layer:
//   - NO file I/O or network calls
//   - NO numeric kernels (those live in Layer 5 — ml)
//   - Only structs, enums, traits and their invariants
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Network shape shared by every producer and consumer of a model
pub mod architecture;

/// Typed errors for the model-and-training engine
pub mod error;

/// Labelled windows and classification results
pub mod sample;

/// Core abstractions (traits) that other layers implement
pub mod traits;
