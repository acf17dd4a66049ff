//! The object model: blobs, trees and commits addressed by BLAKE3 content id.
//!
//! Each object has exactly one encoding, a CBOR array whose first element is
//! the kind:
//!
//! ```text
//! blob   = [0, bytes content]
//! tree   = [1, [[text name, uint mode, bytes id], ...]]   ; sorted by name
//! commit = [2, bytes tree, [bytes parent, ...], text author, text message, int timestamp]
//! ```
//!
//! The object id is the BLAKE3 hash of that encoding.

use ciborium::value::Value;
use packchain_core::ObjectId;

mod kind {
    pub const BLOB: u8 = 0;
    pub const TREE: u8 = 1;
    pub const COMMIT: u8 = 2;
}

/// Hash encoded object bytes.
pub fn object_id(encoded: &[u8]) -> ObjectId {
    ObjectId::from_bytes(*blake3::hash(encoded).as_bytes())
}

/// Mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryMode {
    File,
    Executable,
    Directory,
}

impl EntryMode {
    pub fn to_u32(self) -> u32 {
        match self {
            EntryMode::File => 0o100644,
            EntryMode::Executable => 0o100755,
            EntryMode::Directory => 0o040000,
        }
    }

    pub fn from_u32(mode: u32) -> Option<Self> {
        match mode {
            0o100644 => Some(EntryMode::File),
            0o100755 => Some(EntryMode::Executable),
            0o040000 => Some(EntryMode::Directory),
            _ => None,
        }
    }

    pub fn is_directory(self) -> bool {
        self == EntryMode::Directory
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub mode: EntryMode,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn file(name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            name: name.into(),
            mode: EntryMode::File,
            id,
        }
    }

    pub fn directory(name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            name: name.into(),
            mode: EntryMode::Directory,
            id,
        }
    }
}

/// A directory listing. Entries are kept sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    /// Empty for a root commit, two or more for a merge.
    pub parents: Vec<ObjectId>,
    pub author: String,
    pub message: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

/// A commit together with its id, as returned by history walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    pub id: ObjectId,
    pub commit: Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphObject {
    Blob(Vec<u8>),
    Tree(Tree),
    Commit(Commit),
}

impl GraphObject {
    pub fn kind(&self) -> &'static str {
        match self {
            GraphObject::Blob(_) => "blob",
            GraphObject::Tree(_) => "tree",
            GraphObject::Commit(_) => "commit",
        }
    }

    pub fn id(&self) -> ObjectId {
        object_id(&self.encode())
    }

    pub fn encode(&self) -> Vec<u8> {
        let value = match self {
            GraphObject::Blob(content) => Value::Array(vec![
                Value::Integer(kind::BLOB.into()),
                Value::Bytes(content.clone()),
            ]),
            GraphObject::Tree(tree) => Value::Array(vec![
                Value::Integer(kind::TREE.into()),
                Value::Array(
                    tree.entries
                        .iter()
                        .map(|entry| {
                            Value::Array(vec![
                                Value::Text(entry.name.clone()),
                                Value::Integer(entry.mode.to_u32().into()),
                                Value::Bytes(entry.id.as_bytes().to_vec()),
                            ])
                        })
                        .collect(),
                ),
            ]),
            GraphObject::Commit(commit) => Value::Array(vec![
                Value::Integer(kind::COMMIT.into()),
                Value::Bytes(commit.tree.as_bytes().to_vec()),
                Value::Array(
                    commit
                        .parents
                        .iter()
                        .map(|p| Value::Bytes(p.as_bytes().to_vec()))
                        .collect(),
                ),
                Value::Text(commit.author.clone()),
                Value::Text(commit.message.clone()),
                Value::Integer(commit.timestamp.into()),
            ]),
        };

        let mut buf = Vec::new();
        ciborium::into_writer(&value, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Decode bytes produced by [`GraphObject::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        let value: Value = ciborium::from_reader(bytes).map_err(|e| e.to_string())?;
        let mut items = into_array(value)?.into_iter();

        let kind = into_uint(next(&mut items)?)?;
        let object = match u8::try_from(kind).map_err(|_| format!("unknown kind {}", kind))? {
            kind::BLOB => GraphObject::Blob(into_bytes(next(&mut items)?)?),
            kind::TREE => {
                let entries = into_array(next(&mut items)?)?
                    .into_iter()
                    .map(decode_entry)
                    .collect::<Result<Vec<_>, _>>()?;
                let tree = Tree::new(entries);
                if tree.entries.windows(2).any(|w| w[0].name == w[1].name) {
                    return Err("duplicate tree entry".to_string());
                }
                GraphObject::Tree(tree)
            }
            kind::COMMIT => {
                let tree = into_id(next(&mut items)?)?;
                let parents = into_array(next(&mut items)?)?
                    .into_iter()
                    .map(into_id)
                    .collect::<Result<Vec<_>, _>>()?;
                let author = into_text(next(&mut items)?)?;
                let message = into_text(next(&mut items)?)?;
                let timestamp = i64::try_from(i128::from(into_integer(next(&mut items)?)?))
                    .map_err(|_| "timestamp out of range".to_string())?;
                GraphObject::Commit(Commit {
                    tree,
                    parents,
                    author,
                    message,
                    timestamp,
                })
            }
            other => return Err(format!("unknown kind {}", other)),
        };

        if items.next().is_some() {
            return Err("trailing fields".to_string());
        }
        Ok(object)
    }
}

fn decode_entry(value: Value) -> Result<TreeEntry, String> {
    let mut fields = into_array(value)?.into_iter();
    let name = into_text(next(&mut fields)?)?;
    let mode = into_uint(next(&mut fields)?)?;
    let mode = u32::try_from(mode)
        .ok()
        .and_then(EntryMode::from_u32)
        .ok_or_else(|| format!("unknown mode {:o}", mode))?;
    let id = into_id(next(&mut fields)?)?;
    Ok(TreeEntry { name, mode, id })
}

fn next(items: &mut impl Iterator<Item = Value>) -> Result<Value, String> {
    items.next().ok_or_else(|| "missing field".to_string())
}

fn into_array(value: Value) -> Result<Vec<Value>, String> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err("expected array".to_string()),
    }
}

fn into_bytes(value: Value) -> Result<Vec<u8>, String> {
    match value {
        Value::Bytes(bytes) => Ok(bytes),
        _ => Err("expected bytes".to_string()),
    }
}

fn into_text(value: Value) -> Result<String, String> {
    match value {
        Value::Text(text) => Ok(text),
        _ => Err("expected text".to_string()),
    }
}

fn into_integer(value: Value) -> Result<ciborium::value::Integer, String> {
    match value {
        Value::Integer(i) => Ok(i),
        _ => Err("expected integer".to_string()),
    }
}

fn into_uint(value: Value) -> Result<u64, String> {
    u64::try_from(into_integer(value)?).map_err(|_| "expected unsigned integer".to_string())
}

fn into_id(value: Value) -> Result<ObjectId, String> {
    let bytes = into_bytes(value)?;
    ObjectId::try_from(bytes.as_slice()).map_err(|e| e.to_string())
}
