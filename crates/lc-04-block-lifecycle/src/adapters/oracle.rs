//! Oracle reader that buffers per-transaction reads.

use crate::ports::OracleReader;
use shared_types::OracleEntry;
use std::collections::BTreeMap;

/// Serves reads from locally configured feeds.
///
/// Reads are staged per transaction and kept only when the transaction
/// halts.
#[derive(Debug, Default, Clone)]
pub struct BufferedOracle {
    feeds: BTreeMap<String, Vec<u8>>,
    pending: Vec<OracleEntry>,
    merged: Vec<OracleEntry>,
}

impl BufferedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: impl Into<String>, content: Vec<u8>) -> Self {
        self.set_feed(url, content);
        self
    }

    /// Publish or replace the content served for `url`.
    pub fn set_feed(&mut self, url: impl Into<String>, content: Vec<u8>) {
        self.feeds.insert(url.into(), content);
    }
}

impl OracleReader for BufferedOracle {
    fn read(&mut self, url: &str) -> Option<Vec<u8>> {
        let content = self.feeds.get(url)?.clone();
        self.pending.push(OracleEntry {
            url: url.to_string(),
            content: content.clone(),
        });
        Some(content)
    }

    fn merge_tx_data(&mut self) {
        self.merged.append(&mut self.pending);
    }

    fn discard_tx_data(&mut self) {
        self.pending.clear();
    }

    fn entries(&self) -> Vec<OracleEntry> {
        self.merged.clone()
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.merged.clear();
    }
}
