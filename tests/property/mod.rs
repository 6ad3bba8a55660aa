//! Property-based tests for album membership and cache reconciliation

mod album_membership;
