use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};
#[cfg(test)]
use std::time::Duration;

use tracing::{debug, trace};

use crate::domain::XTVError;
use crate::loader;
use crate::record::Record;

/// Result of one background import, tagged with the ticket it was started under.
#[derive(Debug)]
pub struct ImportOutcome {
    pub ticket: u64,
    pub path: PathBuf,
    pub result: Result<Vec<Record>, XTVError>,
}

/// Runs file imports on the rayon pool and hands back completions in the order they finish.
/// Imports cannot be cancelled; if several are in flight the last one to finish wins.
pub struct Importer {
    sender: Sender<ImportOutcome>,
    receiver: Receiver<ImportOutcome>,
    issued: u64,
    in_flight: usize,
}

impl Default for Importer {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            issued: 0,
            in_flight: 0,
        }
    }
}

impl Importer {
    pub fn start(&mut self, path: PathBuf) -> u64 {
        self.issued += 1;
        self.in_flight += 1;
        let ticket = self.issued;
        let sender = self.sender.clone();
        debug!("Starting import #{ticket} of {}", path.display());

        rayon::spawn(move || {
            let result = loader::load_path(&path);
            // The receiver only disappears when the model is gone, then nobody cares.
            let _ = sender.send(ImportOutcome {
                ticket,
                path,
                result,
            });
        });
        ticket
    }

    /// All imports that completed since the last poll, never blocks.
    pub fn poll(&mut self) -> Vec<ImportOutcome> {
        let done: Vec<ImportOutcome> = self.receiver.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(done.len());
        if !done.is_empty() {
            trace!("{} imports completed, {} in flight", done.len(), self.in_flight);
        }
        done
    }

    #[cfg(test)]
    pub fn wait(&mut self, timeout: Duration) -> Option<ImportOutcome> {
        let outcome = self.receiver.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(outcome)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn latest_ticket(&self) -> u64 {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::seed_dataset;
    use crate::workbook;

    #[test]
    fn import_completes_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.xlsx");
        let data = seed_dataset();
        let refs: Vec<&Record> = data.iter().collect();
        workbook::save_records(&refs, &path).unwrap();

        let mut importer = Importer::default();
        let ticket = importer.start(path.clone());
        assert_eq!(importer.in_flight(), 1);

        let outcome = importer.wait(Duration::from_secs(10)).unwrap();
        assert_eq!(outcome.ticket, ticket);
        assert_eq!(outcome.path, path);
        assert_eq!(outcome.result.unwrap(), data);
        assert_eq!(importer.in_flight(), 0);
    }

    #[test]
    fn failures_come_back_as_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let mut importer = Importer::default();
        importer.start(path);
        let outcome = importer.wait(Duration::from_secs(10)).unwrap();
        assert!(outcome.result.is_err());
    }
}
