//! Append-only log store.
//!
//! The store guarantees the header line exists exactly once and that every
//! append is a complete, self-terminated line. Storage failures are
//! reported and the cycle's data is dropped; prior content is never
//! touched and nothing is retried.

pub mod sd_card;

use core::fmt::Debug;

use log::{error, info};

use crate::record::{CSV_HEADER, CycleRecord};

/// The byte sink behind the log store: a path-addressed medium with
/// write-create and append modes. Operations return failure instead of
/// raising; a handle is never held across calls.
pub trait LogMedium {
    type Error: Debug;

    /// Whether the file is absent or has no content yet.
    fn is_empty(&mut self, path: &str) -> Result<bool, Self::Error>;

    /// Create (or truncate) the file with the given contents.
    fn create(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Append the bytes and close the handle before returning.
    fn append(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error>;
}

/// The persisted record log: one header line, then one CSV line per cycle
/// in completion order.
pub struct LogStore<M: LogMedium> {
    medium: M,
    path: &'static str,
}

impl<M: LogMedium> LogStore<M> {
    pub fn new(medium: M, path: &'static str) -> Self {
        Self { medium, path }
    }

    /// Write the schema header iff the store is absent or empty.
    ///
    /// Idempotent across restarts: a store that already has content is
    /// left untouched.
    pub fn ensure_header(&mut self) {
        match self.medium.is_empty(self.path) {
            Ok(true) => {
                info!("Creating log file {}", self.path);
                if let Err(e) = self.medium.create(self.path, CSV_HEADER.as_bytes()) {
                    error!("Failed to write log header: {:?}", e);
                }
            }
            Ok(false) => info!("Log file {} already exists", self.path),
            Err(e) => error!("Failed to open log file {}: {:?}", self.path, e),
        }
    }

    /// Append one cycle's record as a complete CRLF-terminated line.
    ///
    /// On failure the record is dropped and the node carries on; the
    /// durable state stays a strict prefix-extension of what was there.
    pub fn append_record(&mut self, record: &CycleRecord) {
        let line = record.to_csv_line();
        if let Err(e) = self.medium.append(self.path, line.as_bytes()) {
            error!("Failed to append record {}: {:?}", record.id, e);
        }
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemMedium;
    use super::*;
    use crate::aggregate::aggregate_cycle;
    use crate::sensors::Reading;
    use crate::sensors::slots::SLOT_COUNT;

    fn any_record(id: u32) -> CycleRecord {
        let values = [Reading::Ok(1.0); SLOT_COUNT];
        CycleRecord::build(id, &aggregate_cycle(&values))
    }

    #[test]
    fn test_ensure_header_creates_header_once() {
        let mut store = LogStore::new(MemMedium::new(), "data.txt");

        store.ensure_header();

        assert_eq!(store.medium().contents(), CSV_HEADER.as_bytes());
    }

    #[test]
    fn test_ensure_header_is_idempotent_across_restarts() {
        let mut store = LogStore::new(MemMedium::new(), "data.txt");

        store.ensure_header();
        store.ensure_header();

        let contents = core::str::from_utf8(store.medium().contents()).unwrap();
        assert_eq!(contents.matches("ID, temp1").count(), 1);
        assert_eq!(contents, CSV_HEADER);
    }

    #[test]
    fn test_append_extends_in_completion_order() {
        let mut store = LogStore::new(MemMedium::new(), "data.txt");
        store.ensure_header();

        for id in 0..3 {
            store.append_record(&any_record(id));
        }

        let contents = core::str::from_utf8(store.medium().contents()).unwrap();
        let lines: Vec<&str> = contents.split("\r\n").collect();
        // header + 3 records + empty tail after the final CRLF
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("ID, temp1"));
        assert!(lines[1].starts_with("0, "));
        assert!(lines[2].starts_with("1, "));
        assert!(lines[3].starts_with("2, "));
        assert_eq!(lines[4], "");
    }

    #[test]
    fn test_append_failure_drops_record_and_continues() {
        let mut store = LogStore::new(MemMedium::failing(), "data.txt");

        store.ensure_header();
        store.append_record(&any_record(0));

        assert!(store.medium().contents().is_empty());
    }
}
