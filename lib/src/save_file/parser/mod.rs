/// Commonly used types and other abstractions within the parser
pub mod types;

/// A submodule that provides the [XmlTree] the whole save is parsed into.
/// The extractors in [structures](super::structures) never see the raw
/// markup, only [ElementRef] handles into this tree. The tree keeps parent
/// links, which is what makes [reduction](super::reduce) cheap.
mod tree;
pub use tree::{ElementRef, XmlTree};

/// A submodule that provides [SearchPattern], the small path language used to
/// address elements within the tree.
mod pattern;
pub use pattern::SearchPattern;

mod error;
pub use error::{ParsingError, PatternError, XmlError};
