//! Unit test harness for the codec.
//!
//! Byte-level wire format checks, whole-value roundtrips, path encoding
//! semantics, and protocol version gating.

mod roundtrip_tests;
mod version_gating_tests;
mod wire_format_tests;
