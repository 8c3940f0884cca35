//! Level 4: End-to-End Scenario Tests
//!
//! These tests run long random edit sequences and full disk round trips.
