//! Lexical configuration: topic taxonomy, dimension indicator sets, and the
//! matcher both are compiled into.

pub mod indicators;
pub mod matcher;
pub mod taxonomy;

pub use indicators::{DimensionLexicon, DimensionLexiconDef, DimensionLexicons, IndicatorSet};
pub use matcher::{TermHit, TermKind, TermMatcher};
pub use taxonomy::{TopicDefinition, TopicTaxonomy};
