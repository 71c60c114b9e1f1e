use std::{
    fs::File,
    io::{self, Read, Write},
    path::Path,
    slice,
};

use csv::{ReaderBuilder, WriterBuilder};
use derive_more::{Display, Error, From};

use super::structures::Record;

/// An error that can occur when moving a table in or out of its columnar
/// form.
#[derive(Debug, From, Display, Error)]
pub enum TableError {
    IoError(io::Error),
    CsvError(csv::Error),
    /// The header does not list exactly the columns of the record
    #[display("{record} table has columns {found:?}, expected {expected:?}")]
    SchemaError {
        record: &'static str,
        expected: &'static [&'static str],
        found: Vec<String>,
    },
}

/// An ordered collection of records of a single type
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable<R: Record> {
    rows: Vec<R>,
}

impl<R: Record> Default for RecordTable<R> {
    fn default() -> Self {
        RecordTable { rows: Vec::new() }
    }
}

impl<R: Record> From<Vec<R>> for RecordTable<R> {
    fn from(rows: Vec<R>) -> Self {
        RecordTable { rows }
    }
}

impl<R: Record> FromIterator<R> for RecordTable<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        RecordTable {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a, R: Record> IntoIterator for &'a RecordTable<R> {
    type Item = &'a R;
    type IntoIter = slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl<R: Record> RecordTable<R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [R] {
        &mut self.rows
    }

    pub fn iter(&self) -> slice::Iter<'_, R> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    /// Joins the tables into one, keeping the order of both the tables and
    /// their rows
    pub fn concat<'a, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = &'a RecordTable<R>>,
        R: 'a,
    {
        tables
            .into_iter()
            .flat_map(|table| table.rows.iter().cloned())
            .collect()
    }

    /// Writes the table as CSV. The header is always written, even when the
    /// table has no rows.
    pub fn to_csv<W: Write>(&self, output: W) -> Result<(), TableError> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(output);
        writer.write_record(R::COLUMNS)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a table from CSV. The header must list exactly the columns of
    /// the record, in order.
    pub fn from_csv<Rd: Read>(input: Rd) -> Result<Self, TableError> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(input);
        let found: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        if found != R::COLUMNS {
            return Err(TableError::SchemaError {
                record: R::NAME,
                expected: R::COLUMNS,
                found,
            });
        }
        let rows = reader.deserialize().collect::<Result<Vec<R>, _>>()?;
        Ok(RecordTable { rows })
    }

    pub fn write_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        self.to_csv(File::create(path)?)
    }

    pub fn read_csv_file<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        Self::from_csv(File::open(path)?)
    }
}
