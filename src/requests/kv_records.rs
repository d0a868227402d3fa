//! GetKvRecords / AddKvRecords / RemoveKvRecords.

use crate::error::Error;
use crate::kv::KvRecord;

pub struct GetKvRecordsRequest {
    pub kind: u32,
    pub n: u8,
    pub start: u32,
}

pub fn parse_get(body: &[u8]) -> Result<GetKvRecordsRequest, Error> {
    if body.len() != 9 {
        return Err(Error::InvalidMsg);
    }
    let kind = u32::from_le_bytes(body[0..4].try_into().unwrap());
    let n = body[4];
    let start = u32::from_le_bytes(body[5..9].try_into().unwrap());
    if n == 0 || n > crate::constants::MAX_KV_FETCH {
        return Err(Error::InvalidMsg);
    }
    Ok(GetKvRecordsRequest { kind, n, start })
}

const RECORD_WIRE_LEN: usize = 4 + 4 + 1 + 1 + 64 + 1 + 64;

pub fn parse_add(body: &[u8]) -> Result<Vec<KvRecord>, Error> {
    let count = *body.first().ok_or(Error::InvalidMsg)? as usize;
    if body.len() != 1 + count * RECORD_WIRE_LEN {
        return Err(Error::InvalidMsg);
    }
    let mut records = Vec::with_capacity(count);
    let mut offset = 1;
    for _ in 0..count {
        let chunk = &body[offset..offset + RECORD_WIRE_LEN];
        let id = u32::from_be_bytes(chunk[0..4].try_into().unwrap());
        let kind = u32::from_be_bytes(chunk[4..8].try_into().unwrap());
        let case_sensitive = chunk[8] != 0;
        let key_len = chunk[9] as usize;
        if key_len > crate::constants::MAX_KV_KEY_LEN {
            return Err(Error::InvalidMsg);
        }
        let key = String::from_utf8(chunk[10..10 + key_len].to_vec()).map_err(|_| Error::InvalidMsg)?;
        let val_len = chunk[10 + 64] as usize;
        if val_len > crate::constants::MAX_KV_VAL_LEN {
            return Err(Error::InvalidMsg);
        }
        let val_start = 10 + 64 + 1;
        let value = String::from_utf8(chunk[val_start..val_start + val_len].to_vec())
            .map_err(|_| Error::InvalidMsg)?;
        records.push(KvRecord { id, kind, case_sensitive, key, value });
        offset += RECORD_WIRE_LEN;
    }
    Ok(records)
}

pub fn serialize_add(records: &[KvRecord]) -> Vec<u8> {
    let mut out = vec![records.len() as u8];
    for record in records {
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

pub struct RemoveKvRecordsRequest {
    pub kind: u32,
    pub ids: Vec<u32>,
}

pub fn parse_remove(body: &[u8]) -> Result<RemoveKvRecordsRequest, Error> {
    if body.len() < 5 {
        return Err(Error::InvalidMsg);
    }
    let kind = u32::from_le_bytes(body[0..4].try_into().unwrap());
    let n = body[4] as usize;
    if body.len() != 5 + n * 4 {
        return Err(Error::InvalidMsg);
    }
    let mut ids = Vec::with_capacity(n);
    for chunk in body[5..].chunks_exact(4) {
        ids.push(u32::from_le_bytes(chunk.try_into().unwrap()));
    }
    Ok(RemoveKvRecordsRequest { kind, ids })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_rejects_zero_and_over_max() {
        let mut body = [0u8; 9];
        body[4] = 0;
        assert!(parse_get(&body).is_err());
        body[4] = 11;
        assert!(parse_get(&body).is_err());
        body[4] = 5;
        assert!(parse_get(&body).is_ok());
    }

    #[test]
    fn add_round_trips_through_serialize() {
        let records = vec![KvRecord {
            id: 1,
            kind: 2,
            case_sensitive: true,
            key: "k".into(),
            value: "v".into(),
        }];
        let wire = serialize_add(&records);
        let parsed = parse_add(&wire).unwrap();
        assert_eq!(parsed[0].key, "k");
        assert_eq!(parsed[0].value, "v");
    }
}
