//! Pack encoding: a self-verifying bundle of encoded objects.
//!
//! ```text
//! pack  = [1, [[bytes id, bytes object], ...]]
//! ```
//!
//! Decoding checks every object against its id, so a pack that decodes is a
//! pack whose contents are exactly what the pusher hashed.

use ciborium::value::Value;
use packchain_core::ObjectId;

use crate::error::{GraphError, Result};
use crate::object::{object_id, GraphObject};

/// Current pack format version.
pub const PACK_VERSION: u8 = 1;

/// Objects ready to be written to, or just read from, a pack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pack {
    entries: Vec<(ObjectId, Vec<u8>)>,
}

impl Pack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add encoded object bytes. The id is computed here.
    pub fn push(&mut self, encoded: Vec<u8>) -> ObjectId {
        let id = object_id(&encoded);
        self.entries.push((id, encoded));
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ObjectId, &[u8])> {
        self.entries.iter().map(|(id, bytes)| (id, bytes.as_slice()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.entries.iter().map(|(id, _)| id)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let objects = self
            .entries
            .iter()
            .map(|(id, bytes)| {
                Value::Array(vec![
                    Value::Bytes(id.as_bytes().to_vec()),
                    Value::Bytes(bytes.clone()),
                ])
            })
            .collect();
        let value = Value::Array(vec![
            Value::Integer(PACK_VERSION.into()),
            Value::Array(objects),
        ]);

        let mut buf = Vec::new();
        ciborium::into_writer(&value, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Decode and verify a pack.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(corrupt("empty pack"));
        }

        let value: Value = ciborium::from_reader(bytes).map_err(|e| corrupt(e.to_string()))?;
        let Value::Array(top) = value else {
            return Err(corrupt("expected array"));
        };
        let [Value::Integer(version), Value::Array(objects)] = <[Value; 2]>::try_from(top)
            .map_err(|_| corrupt("expected [version, objects]"))?
        else {
            return Err(corrupt("expected [version, objects]"));
        };

        if u64::try_from(version).ok() != Some(u64::from(PACK_VERSION)) {
            return Err(corrupt("unsupported pack version"));
        }

        let mut pack = Pack::new();
        for object in objects {
            let Value::Array(pair) = object else {
                return Err(corrupt("expected [id, object]"));
            };
            let [Value::Bytes(id), Value::Bytes(encoded)] = <[Value; 2]>::try_from(pair)
                .map_err(|_| corrupt("expected [id, object]"))?
            else {
                return Err(corrupt("expected [id, object]"));
            };

            let claimed = ObjectId::try_from(id.as_slice()).map_err(|e| corrupt(e.to_string()))?;
            let actual = object_id(&encoded);
            if claimed != actual {
                return Err(corrupt(format!(
                    "object {} hashes to {}",
                    claimed.short_hex(),
                    actual.short_hex()
                )));
            }
            GraphObject::decode(&encoded)
                .map_err(|reason| corrupt(format!("object {}: {}", claimed.short_hex(), reason)))?;

            pack.entries.push((actual, encoded));
        }

        Ok(pack)
    }
}

fn corrupt(reason: impl Into<String>) -> GraphError {
    GraphError::CorruptPack(reason.into())
}
