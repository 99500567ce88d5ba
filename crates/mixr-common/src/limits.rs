//! Centralized limits for metadata traversal.
//!
//! The type table is filled in by upstream tooling and is assumed to be
//! well-formed, but a malformed table (for example a class that names itself
//! as its own base) must not hang or overflow the stack. Every traversal in
//! [`crate::table`] is bounded by one of these limits; exceeding a limit is
//! reported as a [`crate::TableError`].

/// Maximum length of a class inheritance chain.
///
/// Walking `base` links from a class towards the universal top type never
/// visits more than this many types. Real hierarchies rarely exceed a
/// dozen levels.
pub const MAX_BASE_CHAIN_DEPTH: usize = 256;

/// Maximum nesting of interface inheritance.
///
/// Bounds the recursion used to expand an interface into the set of
/// interfaces it transitively extends, and the recursion through generic
/// parameter constraints during requirement inference.
pub const MAX_INTERFACE_NESTING: usize = 64;
