/// Lower level parsing functionality.
/// Turns the raw document into an [XmlTree](parser::XmlTree) and provides the
/// [SearchPattern](parser::SearchPattern) language used to address elements.
pub mod parser;

/// Output structures, like [structures::PawnRecord] and
/// [structures::PlantRecord], together with the routines extracting them
/// from a tree.
pub mod structures;

/// Pattern based pruning of trees
mod reduce;
pub use reduce::{remove_matching_elements, ReduceError, Reduction};

/// Typed record collections and their CSV form
mod table;
pub use table::{RecordTable, TableError};

/// Parser I/O, compression handling
mod save_file;
pub use save_file::{
    is_save_file_name, SaveFile, SaveFileError, COMPRESSED_SAVE_EXTENSION, SAVE_EXTENSION,
};

/// The facade, a fully loaded [Save]
mod save;
pub use save::{
    process_save_file, LoadError, LoadFailure, LoadOptions, LoadStage, ProcessReport, Save,
};

#[cfg(test)]
pub(crate) mod test_fixtures;
