//! GetKvRecords response; AddKvRecords/RemoveKvRecords are
//! empty on success, so they have no serializer of their own.

use crate::kv::KvRecord;

pub fn serialize(total: u32, fetched: &[KvRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 1 + fetched.len() * (4 + 4 + 1 + 1 + 64 + 1 + 64));
    out.extend_from_slice(&total.to_be_bytes());
    out.push(fetched.len() as u8);
    for record in fetched {
        out.extend_from_slice(&record.id.to_be_bytes());
        out.extend_from_slice(&record.kind.to_be_bytes());
        out.push(record.case_sensitive as u8);
        let key_bytes = record.key.as_bytes();
        out.push(key_bytes.len().min(255) as u8);
        let mut key_field = [0u8; 64];
        let n = key_bytes.len().min(64);
        key_field[..n].copy_from_slice(&key_bytes[..n]);
        out.extend_from_slice(&key_field);
        let val_bytes = record.value.as_bytes();
        out.push(val_bytes.len().min(255) as u8);
        let mut val_field = [0u8; 64];
        let n = val_bytes.len().min(64);
        val_field[..n].copy_from_slice(&val_bytes[..n]);
        out.extend_from_slice(&val_field);
    }
    out
}
