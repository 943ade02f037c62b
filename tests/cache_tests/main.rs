//! Cache test suite
