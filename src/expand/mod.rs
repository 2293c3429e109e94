//! Directive expansion passes
//!
//! - [`IncludeExpander`] - `@@include:id@@`, before generation, strict
//! - [`SnippetExpander`] - `@@snippet:id@@` and `@@reference:id@@`, after generation
//!
//! Both passes scan the input once; text spliced in by a substitution is never
//! rescanned for the same directive kind. Expanders keep per-call state, so
//! concurrent requests each need their own instance.

pub mod directive;
mod error;
mod include;
mod snippet;

pub use directive::{Directive, DirectiveKind};
pub use error::{InclusionError, SnippetError};
pub use include::IncludeExpander;
pub use snippet::{SnippetExpander, expand_references, reference_marker};
