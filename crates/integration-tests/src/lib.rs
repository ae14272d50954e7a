//! End-to-end tests for the ad engine. The shared router harness lives in
//! `tests/common/mod.rs`; the scenarios are the `[[test]]` targets under `tests/`.
