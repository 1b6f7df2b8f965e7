//! Workspace root. Exists to host the cross-crate integration tests in
//! `tests/`; the library surface lives in the member crates (start from
//! the `relay` umbrella crate).
