//! Ranking and search primitives shared by every catalog storage backend.
//!
//! Nothing in this crate performs IO: it defines the list orderings and
//! pagination window, the hotness score, and the search-term lexer and
//! pattern that backends evaluate either in SQL or in memory.

pub mod hotness;
pub mod lexer;
pub mod order;
pub mod pattern;

pub use hotness::hotness;
pub use lexer::{tokenize, LexError, Term};
pub use order::{compare, sort_by_order, ListOrder, Page, RankKey, DEFAULT_COUNT, MAX_COUNT};
pub use pattern::SearchPattern;
