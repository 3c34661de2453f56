//! Bounded, append-only interaction log.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::concept::InteractionRecord;

/// Default number of records kept.
pub const DEFAULT_LOG_CAP: usize = 1000;

/// Keeps the most recent `cap` interaction records; the oldest are dropped first.
#[derive(Debug)]
pub struct InteractionLog {
    records: Mutex<VecDeque<InteractionRecord>>,
    cap: usize,
}

impl InteractionLog {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(cap.min(DEFAULT_LOG_CAP))),
            cap,
        }
    }

    /// Append a record, evicting the oldest when over capacity.
    pub fn push(&self, record: InteractionRecord) {
        let mut records = self.records.lock().expect("interaction log lock poisoned");
        records.push_back(record);
        while records.len() > self.cap {
            records.pop_front();
        }
    }

    /// Replace the contents, keeping only the newest `cap` records.
    pub fn restore(&self, history: Vec<InteractionRecord>) {
        let mut records = self.records.lock().expect("interaction log lock poisoned");
        records.clear();
        let skip = history.len().saturating_sub(self.cap);
        records.extend(history.into_iter().skip(skip));
    }

    /// All records, oldest first.
    pub fn records(&self) -> Vec<InteractionRecord> {
        self.records
            .lock()
            .expect("interaction log lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// The newest `n` records, newest first.
    pub fn recent(&self, n: usize) -> Vec<InteractionRecord> {
        self.records
            .lock()
            .expect("interaction log lock poisoned")
            .iter()
            .rev()
            .take(n)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("interaction log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

impl Default for InteractionLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(i: usize) -> InteractionRecord {
        InteractionRecord {
            query: format!("q{i}"),
            response: String::new(),
            confidence: 0.5,
            domains_used: vec![],
            new_concepts: vec![],
            timestamp: i as u64,
        }
    }

    #[test]
    fn oldest_records_are_evicted() {
        let log = InteractionLog::new(3);
        for i in 0..5 {
            log.push(record(i));
        }
        assert_eq!(log.len(), 3);
        let queries: Vec<String> = log.records().into_iter().map(|r| r.query).collect();
        assert_eq!(queries, vec!["q2", "q3", "q4"]);
        assert_eq!(log.recent(1)[0].query, "q4");
    }

    #[test]
    fn default_cap_holds_one_thousand() {
        let log = InteractionLog::default();
        for i in 0..1005 {
            log.push(record(i));
        }
        assert_eq!(log.len(), DEFAULT_LOG_CAP);
        assert_eq!(log.records()[0].query, "q5");
    }

    #[test]
    fn restore_truncates_to_cap() {
        let log = InteractionLog::new(2);
        log.restore((0..4).map(record).collect());
        let queries: Vec<String> = log.records().into_iter().map(|r| r.query).collect();
        assert_eq!(queries, vec!["q2", "q3"]);
    }
}
