//! KV-record collaborator contract.

use std::collections::BTreeMap;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRecord {
    pub id: u32,
    pub kind: u32,
    pub case_sensitive: bool,
    pub key: String,
    pub value: String,
}

pub trait KvStore: Send {
    fn list(&self, kind: u32, n: u8, start: u32) -> Result<(Vec<KvRecord>, u32, u8), Error>;
    fn add(&mut self, records: Vec<KvRecord>) -> Result<(), Error>;
    fn remove(&mut self, kind: u32, ids: &[u32]) -> Result<(), Error>;
}

/// Fallback store the core wires in by default.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    records: BTreeMap<u32, KvRecord>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for InMemoryKvStore {
    fn list(&self, kind: u32, n: u8, start: u32) -> Result<(Vec<KvRecord>, u32, u8), Error> {
        let matching: Vec<&KvRecord> = self
            .records
            .values()
            .filter(|r| r.kind == kind)
            .collect();
        let total = matching.len() as u32;
        let fetched: Vec<KvRecord> = matching
            .into_iter()
            .skip(start as usize)
            .take(n as usize)
            .cloned()
            .collect();
        let fetched_count = fetched.len() as u8;
        Ok((fetched, total, fetched_count))
    }

    fn add(&mut self, records: Vec<KvRecord>) -> Result<(), Error> {
        for record in &records {
            let duplicate = self
                .records
                .values()
                .any(|existing| existing.kind == record.kind && keys_equal(existing, record));
            if duplicate {
                return Err(Error::Already);
            }
        }
        for record in records {
            self.records.insert(record.id, record);
        }
        Ok(())
    }

    fn remove(&mut self, kind: u32, ids: &[u32]) -> Result<(), Error> {
        for id in ids {
            if let Some(r) = self.records.get(id) {
                if r.kind == kind {
                    self.records.remove(id);
                }
            }
        }
        Ok(())
    }
}

fn keys_equal(a: &KvRecord, b: &KvRecord) -> bool {
    if a.case_sensitive || b.case_sensitive {
        a.key == b.key
    } else {
        a.key.eq_ignore_ascii_case(&b.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, key: &str) -> KvRecord {
        KvRecord { id, kind: 1, case_sensitive: false, key: key.into(), value: "v".into() }
    }

    #[test]
    fn add_rejects_duplicate_key() {
        let mut store = InMemoryKvStore::new();
        store.add(vec![record(1, "alpha")]).unwrap();
        let err = store.add(vec![record(2, "ALPHA")]).unwrap_err();
        assert_eq!(err, Error::Already);
    }

    #[test]
    fn list_paginates() {
        let mut store = InMemoryKvStore::new();
        store.add(vec![record(1, "a"), record(2, "b"), record(3, "c")]).unwrap();
        let (fetched, total, count) = store.list(1, 2, 1).unwrap();
        assert_eq!(total, 3);
        assert_eq!(count, 2);
        assert_eq!(fetched.len(), 2);
    }
}
