/// Core save file parser. Wrapper over the lower level [save_file::parser]
/// module and [save_file::structures].
///
/// ## Getting Started
///
/// The facade for the entire module is the [save_file::Save] struct, which
/// loads a file, optionally [reduces](save_file::Reduction) its tree and
/// extracts every record type into a [table](save_file::RecordTable).
///
/// ## Lower level access
///
/// The steps [Save::load](save_file::Save::load) performs are all public.
/// A [save_file::SaveFile] parses into a [save_file::parser::XmlTree], the
/// extractors in [save_file::structures] turn a tree into records, and
/// [save_file::remove_matching_elements] prunes a tree in place.
///
/// ## Example
///
/// ```no_run
/// use rimworld_history_lib::save_file::{LoadOptions, Save};
///
/// if let Ok(save) = Save::load("/path/to/Colony.rws", &LoadOptions::default()) {
///     for pawn in save.pawns().iter().filter(|p| p.latest_record) {
///         println!("{}", pawn.pawn_id);
///     }
/// }
/// ```
pub mod save_file;

/// Loading many saves of the same game at once, and combining their tables
/// into longitudinal ones keyed by the tick counter.
pub mod series;

/// The reduction configuration file
pub mod config;
