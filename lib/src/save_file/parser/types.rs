/// A type alias for an index into the [XmlTree](super::XmlTree) arena.
/// Node ids are handed out in document order, so sorting ids sorts elements
/// the way they appear in the file.
pub type NodeId = usize;

/// A type alias for the in-game simulation step counter.
pub type Tick = u64;

// tale dates are signed in the save format, unlike the global counter
/// A type alias for the timestamp of a historical tale entry.
pub type TaleDate = i64;
