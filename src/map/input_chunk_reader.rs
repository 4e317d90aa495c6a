use std::{
    fmt::{Display, Formatter},
    iter::Map,
};

use log::error;

use crate::{
    errors::{Error, Result},
    map::record::Record,
};

/// Splits a stream of records into chunks that are mapped in parallel.
///
/// Very basic error checking and reporting happens here. Records that fail to parse are skipped.
pub struct TaskQueue<T> {
    chunk_id: usize,
    chunk_size: usize,
    records: T,
}

impl<T> Iterator for TaskQueue<T>
where
    T: Iterator<Item = Result<Record>>,
{
    type Item = TaskSheet;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self
            .records
            .by_ref()
            .filter_map(|record| {
                if let Err(ref e) = record {
                    error!("Skip record due to an error: {}", e);
                }
                record.ok()
            })
            .take(self.chunk_size)
            .collect::<Vec<_>>();
        self.chunk_id += 1;

        if chunk.is_empty() {
            None
        } else {
            Some(TaskSheet::from_records(self.chunk_id - 1, chunk))
        }
    }
}

/// Convertible to TaskQueue
pub trait IntoTaskQueue<E, I, O, T>
where
    E: Into<Error>,
    I: Into<Record>,
    T: Iterator<Item = std::result::Result<I, E>>,
    O: Iterator<Item = Result<Record>>,
{
    fn into_tasks(self, chunk_size: usize) -> TaskQueue<O>;
}

/// Adds the chunking conversion method to every compatible Iterator. When new input file types
/// are supported, it is sufficient to impl `From<T> for Record` for the additional item.
#[allow(clippy::type_complexity)]
impl<E, I, T> IntoTaskQueue<E, I, Map<T, fn(std::result::Result<I, E>) -> Result<Record>>, T> for T
where
    I: Into<Record>,
    E: Into<Error>,
    T: Iterator<Item = std::result::Result<I, E>>,
{
    fn into_tasks(
        self,
        chunk_size: usize,
    ) -> TaskQueue<Map<T, fn(std::result::Result<I, E>) -> Result<Record>>> {
        TaskQueue {
            chunk_id: 0,
            // A chunk size of zero would end the stream immediately
            chunk_size: chunk_size.max(1),
            records: self.map(|inner| inner.map(|v| v.into()).map_err(|e| e.into())),
        }
    }
}

/// One chunk of reads
#[derive(Debug)]
pub struct TaskSheet {
    chunk_id: usize,
    records: Vec<Record>,
}

impl Display for TaskSheet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.chunk_id)
    }
}

impl TaskSheet {
    pub fn from_records(chunk_id: usize, records: Vec<Record>) -> Self {
        Self { chunk_id, records }
    }

    pub fn get_id(&self) -> usize {
        self.chunk_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get_records(self) -> Vec<Record> {
        self.records
    }
}
