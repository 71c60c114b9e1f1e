use derive_more::{Display, Error};

use super::super::save_file::{
    structures::{mark_latest_records, PawnRecord, Record},
    RecordTable, Save,
};

/// An error that can occur when combining the tables of many saves
#[derive(Debug, Display, Error)]
pub enum AggregateError {
    /// There were no tables to combine
    #[display("no {record} tables to aggregate")]
    EmptySeries { record: &'static str },
}

/// Concatenates one table of every save, in the order the saves are given.
/// Rows keep the tick counter of the save they came from.
pub fn aggregate<'a, R, I, F>(saves: I, table: F) -> Result<RecordTable<R>, AggregateError>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a Save>,
    F: Fn(&'a Save) -> &'a RecordTable<R>,
{
    let tables: Vec<&RecordTable<R>> = saves.into_iter().map(table).collect();
    if tables.is_empty() {
        return Err(AggregateError::EmptySeries { record: R::NAME });
    }
    Ok(RecordTable::concat(tables))
}

/// Concatenates the pawn tables and recomputes which records are the latest
/// ones for every pawn across the whole series
pub fn aggregate_pawns<'a, I>(saves: I) -> Result<RecordTable<PawnRecord>, AggregateError>
where
    I: IntoIterator<Item = &'a Save>,
{
    let mut pawns = aggregate(saves, Save::pawns)?;
    mark_latest_records(pawns.rows_mut());
    Ok(pawns)
}
