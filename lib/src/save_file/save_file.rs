use derive_more::{Display, Error, From};
use flate2::read::GzDecoder;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use super::parser::{XmlError, XmlTree};

/// The extension of an uncompressed save file.
pub const SAVE_EXTENSION: &str = ".rws";
/// The extension of a gzip compressed save file.
pub const COMPRESSED_SAVE_EXTENSION: &str = ".rws.gz";

const GZIP_EXTENSION: &str = "gz";

/// Checks whether the file name has one of the two save file extensions
pub fn is_save_file_name(name: &str) -> bool {
    name.ends_with(SAVE_EXTENSION) || name.ends_with(COMPRESSED_SAVE_EXTENSION)
}

/// An error that can occur when opening a save file.
/// Generally things that are the fault of the user, however unintentional those may be
#[derive(Debug, From, Display, Error)]
pub enum SaveFileError {
    /// Something went wrong with stdlib IO.
    IoError(io::Error),
    /// The contents are not a well formed document
    XmlError(XmlError),
}


/// A struct that represents a RimWorld save file on disk.
/// It is just a handle on the path, that knows the size of the file and
/// whether it has to be decompressed.
/// This is so that we can abstract away the compression and just return a
/// reader or a parsed tree.
#[derive(Debug, Clone)]
pub struct SaveFile {
    path: PathBuf,
    size: u64,
    compressed: bool,
}

impl SaveFile {
    /// Open a save file.
    ///
    /// # Compression
    ///
    /// Files ending in `.gz` are treated as gzip compressed and decompressed
    /// transparently while reading.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<SaveFile, SaveFileError> {
        let path = filename.as_ref().to_path_buf();
        let metadata = path.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a file").into());
        }
        let compressed = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(GZIP_EXTENSION));
        Ok(SaveFile {
            path,
            size: metadata.len(),
            compressed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The size of the file on disk, in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Returns a reader over the decompressed contents of the file
    pub fn reader(&self) -> Result<Box<dyn BufRead>, SaveFileError> {
        let file = File::open(&self.path)?;
        if self.compressed {
            Ok(Box::new(BufReader::new(GzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }

    /// Parse the whole file into a tree
    pub fn parse(&self) -> Result<XmlTree, SaveFileError> {
        Ok(XmlTree::parse(self.reader()?)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{write::GzEncoder, Compression};
    use tempfile::Builder;

    use super::*;

    const CONTENTS: &str = "<savegame><meta><gameVersion>1.4</gameVersion></meta></savegame>";

    #[test]
    fn test_open() {
        let mut file = Builder::new().suffix(".rws").tempfile().unwrap();
        file.write_all(CONTENTS.as_bytes()).unwrap();
        let save = SaveFile::open(file.path()).unwrap();
        assert!(!save.is_compressed());
        assert_eq!(save.size(), CONTENTS.len() as u64);
        let tree = save.parse().unwrap();
        assert_eq!(tree.root().tag(), "savegame");
    }

    #[test]
    fn test_compressed_open() {
        let mut file = Builder::new().suffix(".rws.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(&mut file, Compression::default());
        encoder.write_all(CONTENTS.as_bytes()).unwrap();
        encoder.finish().unwrap();
        let save = SaveFile::open(file.path()).unwrap();
        assert!(save.is_compressed());
        let tree = save.parse().unwrap();
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SaveFile::open(dir.path().join("missing.rws")),
            Err(SaveFileError::IoError(_))
        ));
        assert!(SaveFile::open(dir.path()).is_err());
    }

    #[test]
    fn test_malformed_file() {
        let mut file = Builder::new().suffix(".rws").tempfile().unwrap();
        file.write_all(b"<savegame><meta>").unwrap();
        let save = SaveFile::open(file.path()).unwrap();
        assert!(save.parse().is_err());
    }

    #[test]
    fn test_save_file_names() {
        assert!(is_save_file_name("demosave 1.rws"));
        assert!(is_save_file_name("demosave 1.rws.gz"));
        assert!(!is_save_file_name("demosave 1.xml"));
        assert!(!is_save_file_name("demosave 1.gz"));
    }
}
