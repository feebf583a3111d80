//! Dictionary-based page translation
//!
//! The engine works on a host-independent [`Document`] tree: text nodes and a
//! fixed set of attributes are translated from their captured originals, so
//! switching back to English restores the source text exactly. The `api`
//! service also serves the dictionaries to browser clients.

pub mod dictionary;
pub mod document;
pub mod locale;
pub mod translator;

pub use dictionary::{Catalog, Dictionary, I18nError};
pub use document::{Document, NodeId};
pub use locale::{Direction, Locale, STORAGE_KEY, initial_language};
pub use translator::{Mutation, Translator};
