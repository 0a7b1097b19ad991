//! Cross-crate tests for the replay catalog live under `tests/`.
