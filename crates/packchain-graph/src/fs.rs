//! Object graph stored in a directory.
//!
//! Layout of the metadata directory:
//!
//! ```text
//! HEAD                    "ref: refs/heads/<branch>" or a hex commit id
//! index                   files written by the last checkout, one per line
//! objects/<xx>/<rest>     encoded objects, named by hex id
//! objects/pack/           packs staged while they are being indexed
//! refs/heads/<branch>     hex commit id
//! ```
//!
//! A working copy keeps the metadata directory in `<root>/.packchain` and the
//! checked out files in `<root>`. A bare repository is a metadata directory on
//! its own and has no working files.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use packchain_core::ObjectId;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{GraphError, Result};
use crate::object::{object_id, Commit, CommitEntry, EntryMode, GraphObject, Tree, TreeEntry};
use crate::pack::Pack;
use crate::traits::{IndexReport, ObjectGraph, WorkingCopy};

/// Name of the metadata directory inside a working copy.
pub const METADATA_DIR: &str = ".packchain";

/// Branch a fresh repository's HEAD points at.
pub const DEFAULT_BRANCH: &str = "master";

const HEADS_PREFIX: &str = "refs/heads/";

/// Filesystem-backed [`ObjectGraph`].
#[derive(Debug, Clone)]
pub struct FsObjectGraph {
    meta: PathBuf,
    work_tree: Option<PathBuf>,
    author: String,
}

impl FsObjectGraph {
    /// Create an empty bare repository at `path`.
    pub async fn init_bare(path: &Path) -> Result<Self> {
        if Self::contains_working_copy(path) {
            return Err(GraphError::AlreadyExists(path.to_path_buf()));
        }
        let graph = Self::at(path.to_path_buf(), None);
        graph.create_layout().await?;
        Ok(graph)
    }

    fn at(meta: PathBuf, work_tree: Option<PathBuf>) -> Self {
        Self {
            meta,
            work_tree,
            author: "packchain".to_string(),
        }
    }

    /// Author recorded on commits made through [`FsObjectGraph::commit`].
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn metadata_dir(&self) -> &Path {
        &self.meta
    }

    /// Checkout destination, `None` for a bare repository.
    pub fn work_tree(&self) -> Option<&Path> {
        self.work_tree.as_deref()
    }

    pub fn is_bare(&self) -> bool {
        self.work_tree.is_none()
    }

    async fn create_layout(&self) -> Result<()> {
        fs::create_dir_all(self.pack_dir()).await?;
        fs::create_dir_all(self.meta.join("refs").join("heads")).await?;
        fs::write(self.head_path(), format!("ref: {}{}\n", HEADS_PREFIX, DEFAULT_BRANCH)).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Paths
    // ─────────────────────────────────────────────────────────────────────────

    fn objects_dir(&self) -> PathBuf {
        self.meta.join("objects")
    }

    fn pack_dir(&self) -> PathBuf {
        self.objects_dir().join("pack")
    }

    fn head_path(&self) -> PathBuf {
        self.meta.join("HEAD")
    }

    fn index_path(&self) -> PathBuf {
        self.meta.join("index")
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir().join(&hex[..2]).join(&hex[2..])
    }

    /// Map a branch name or `refs/heads/<name>` to its ref file.
    fn branch_path(&self, reference: &str) -> Result<PathBuf> {
        let branch = reference.strip_prefix(HEADS_PREFIX).unwrap_or(reference);
        let mut path = self.meta.join("refs").join("heads");
        for part in branch.split('/') {
            if part.is_empty() || part == "." || part == ".." || part.contains('\\') {
                return Err(GraphError::InvalidPath(reference.to_string()));
            }
            path.push(part);
        }
        Ok(path)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Raw object storage
    // ─────────────────────────────────────────────────────────────────────────

    async fn read_raw(&self, id: &ObjectId) -> Result<Vec<u8>> {
        match fs::read(self.object_path(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(GraphError::ObjectNotFound(*id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store encoded bytes under `id`. Returns false if already present.
    async fn write_raw(&self, id: &ObjectId, encoded: &[u8]) -> Result<bool> {
        let path = self.object_path(id);
        if fs::try_exists(&path).await? {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let staging = path.with_extension("tmp");
        fs::write(&staging, encoded).await?;
        fs::rename(&staging, &path).await?;
        Ok(true)
    }

    async fn read_commit(&self, id: &ObjectId) -> Result<Commit> {
        match self.read_object(id).await? {
            GraphObject::Commit(commit) => Ok(commit),
            other => Err(wrong_kind(id, "commit", &other)),
        }
    }

    async fn read_tree(&self, id: &ObjectId) -> Result<Tree> {
        match self.read_object(id).await? {
            GraphObject::Tree(tree) => Ok(tree),
            other => Err(wrong_kind(id, "tree", &other)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HEAD
    // ─────────────────────────────────────────────────────────────────────────

    async fn read_head(&self) -> Result<String> {
        match fs::read_to_string(self.head_path()).await {
            Ok(head) => Ok(head.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(format!("ref: {}{}", HEADS_PREFIX, DEFAULT_BRANCH))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Branch HEAD points at, `None` when detached.
    pub async fn head_branch(&self) -> Result<Option<String>> {
        let head = self.read_head().await?;
        Ok(head
            .strip_prefix("ref: ")
            .map(|target| target.strip_prefix(HEADS_PREFIX).unwrap_or(target).to_string()))
    }

    async fn read_branch(&self, reference: &str) -> Result<Option<ObjectId>> {
        match fs::read_to_string(self.branch_path(reference)?).await {
            Ok(hex) => Ok(Some(ObjectId::from_hex(hex.trim())?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_branch(&self, reference: &str) -> Result<bool> {
        if reference == "HEAD" {
            return Ok(false);
        }
        if reference.starts_with(HEADS_PREFIX) {
            return Ok(true);
        }
        Ok(parse_hex_id(reference).is_none() || self.read_branch(reference).await?.is_some())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authoring
    // ─────────────────────────────────────────────────────────────────────────

    /// Store an object and return its id.
    pub async fn write_object(&self, object: &GraphObject) -> Result<ObjectId> {
        let encoded = object.encode();
        let id = object_id(&encoded);
        self.write_raw(&id, &encoded).await?;
        Ok(id)
    }

    pub async fn write_blob(&self, content: impl Into<Vec<u8>>) -> Result<ObjectId> {
        self.write_object(&GraphObject::Blob(content.into())).await
    }

    pub async fn write_tree(&self, entries: Vec<TreeEntry>) -> Result<ObjectId> {
        self.write_object(&GraphObject::Tree(Tree::new(entries))).await
    }

    /// Store a commit object without moving any ref.
    pub async fn commit_tree(
        &self,
        tree: ObjectId,
        parents: Vec<ObjectId>,
        message: impl Into<String>,
    ) -> Result<ObjectId> {
        self.write_object(&GraphObject::Commit(Commit {
            tree,
            parents,
            author: self.author.clone(),
            message: message.into(),
            timestamp: now_millis(),
        }))
        .await
    }

    /// Commit a full snapshot of `files` on top of HEAD and advance HEAD.
    ///
    /// Keys are `/`-separated paths relative to the repository root.
    pub async fn commit(
        &self,
        files: &BTreeMap<String, Vec<u8>>,
        message: impl Into<String>,
    ) -> Result<ObjectId> {
        let (tree, objects) = snapshot_objects(files)?;
        for object in &objects {
            self.write_object(object).await?;
        }

        let parents = self.resolve_ref("HEAD").await?.into_iter().collect();
        let id = self.commit_tree(tree, parents, message).await?;
        self.advance_head(&id).await?;
        Ok(id)
    }

    /// Move HEAD's branch, or a detached HEAD, to `id`.
    pub async fn advance_head(&self, id: &ObjectId) -> Result<()> {
        match self.head_branch().await? {
            Some(branch) => self.write_ref(&branch, id).await,
            None => Ok(fs::write(self.head_path(), format!("{}\n", id.to_hex())).await?),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checkout
    // ─────────────────────────────────────────────────────────────────────────

    /// Files of a tree, recursively, as `(relative path, blob id, mode)`.
    async fn flatten_tree(&self, root: &ObjectId) -> Result<Vec<(String, ObjectId, EntryMode)>> {
        let mut files = Vec::new();
        let mut pending = vec![(String::new(), *root)];

        while let Some((prefix, tree_id)) = pending.pop() {
            for entry in self.read_tree(&tree_id).await?.entries() {
                check_entry_name(&entry.name)?;
                let path = if prefix.is_empty() {
                    entry.name.clone()
                } else {
                    format!("{}/{}", prefix, entry.name)
                };
                if entry.mode.is_directory() {
                    pending.push((path, entry.id));
                } else {
                    files.push((path, entry.id, entry.mode));
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn read_index(&self) -> Result<Vec<String>> {
        match fs::read_to_string(self.index_path()).await {
            Ok(index) => Ok(index.lines().filter(|l| !l.is_empty()).map(String::from).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_stale(&self, work_tree: &Path, stale: &[String]) -> Result<()> {
        for rel in stale {
            let path = work_tree.join(rel);
            match fs::remove_file(&path).await {
                Ok(()) => debug!(path = %rel, "removed stale file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }

            // Prune directories the removal emptied, stopping at the first non-empty one.
            let mut dir = path.parent();
            while let Some(d) = dir {
                if d == work_tree || fs::remove_dir(d).await.is_err() {
                    break;
                }
                dir = d.parent();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectGraph for FsObjectGraph {
    async fn resolve_ref(&self, reference: &str) -> Result<Option<ObjectId>> {
        if reference == "HEAD" {
            let head = self.read_head().await?;
            return match head.strip_prefix("ref: ") {
                Some(target) => self.read_branch(target).await,
                None => Ok(Some(ObjectId::from_hex(&head)?)),
            };
        }

        if let Some(id) = self.read_branch(reference).await? {
            return Ok(Some(id));
        }
        match parse_hex_id(reference) {
            Some(id) if self.has_object(&id).await? => Ok(Some(id)),
            _ => Ok(None),
        }
    }

    async fn history_from(&self, reference: &str) -> Result<Vec<CommitEntry>> {
        let Some(head) = self.resolve_ref(reference).await? else {
            return Ok(Vec::new());
        };

        // Depth-first post-order over parents.
        let mut commits: HashMap<ObjectId, Commit> = HashMap::new();
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![(head, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                if let Some(commit) = commits.remove(&id) {
                    order.push(CommitEntry { id, commit });
                }
                continue;
            }
            if !visited.insert(id) {
                continue;
            }

            let commit = self.read_commit(&id).await?;
            stack.push((id, true));
            for parent in commit.parents.iter().rev() {
                if !visited.contains(parent) {
                    stack.push((*parent, false));
                }
            }
            commits.insert(id, commit);
        }

        Ok(order)
    }

    async fn read_object(&self, id: &ObjectId) -> Result<GraphObject> {
        let bytes = self.read_raw(id).await?;
        if object_id(&bytes) != *id {
            return Err(GraphError::CorruptObject {
                id: *id,
                reason: "content does not match id".to_string(),
            });
        }
        GraphObject::decode(&bytes).map_err(|reason| GraphError::CorruptObject { id: *id, reason })
    }

    async fn has_object(&self, id: &ObjectId) -> Result<bool> {
        Ok(fs::try_exists(self.object_path(id)).await?)
    }

    async fn write_ref(&self, name: &str, id: &ObjectId) -> Result<()> {
        let path = self.branch_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, format!("{}\n", id.to_hex())).await?;
        debug!(reference = %name, id = %id.short_hex(), "wrote ref");
        Ok(())
    }

    async fn checkout(&self, reference: &str) -> Result<()> {
        let id = self
            .resolve_ref(reference)
            .await?
            .ok_or_else(|| GraphError::UnknownRef(reference.to_string()))?;
        let commit = self.read_commit(&id).await?;

        if self.is_branch(reference).await? {
            let branch = reference.strip_prefix(HEADS_PREFIX).unwrap_or(reference);
            fs::write(self.head_path(), format!("ref: {}{}\n", HEADS_PREFIX, branch)).await?;
        } else if reference != "HEAD" {
            fs::write(self.head_path(), format!("{}\n", id.to_hex())).await?;
        }

        let Some(work_tree) = self.work_tree.clone() else {
            debug!(id = %id.short_hex(), "bare repository, no files to check out");
            return Ok(());
        };

        let files = self.flatten_tree(&commit.tree).await?;
        let wanted: HashSet<&str> = files.iter().map(|(path, _, _)| path.as_str()).collect();
        let stale: Vec<String> = self
            .read_index()
            .await?
            .into_iter()
            .filter(|path| !wanted.contains(path.as_str()))
            .collect();
        self.remove_stale(&work_tree, &stale).await?;

        for (rel, blob_id, mode) in &files {
            let content = match self.read_object(blob_id).await? {
                GraphObject::Blob(content) => content,
                other => return Err(wrong_kind(blob_id, "blob", &other)),
            };
            let path = work_tree.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, content).await?;
            set_mode(&path, *mode).await?;
        }

        let mut index = files
            .iter()
            .map(|(path, _, _)| path.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        index.push('\n');
        fs::write(self.index_path(), index).await?;

        debug!(id = %id.short_hex(), files = files.len(), removed = stale.len(), "checked out");
        Ok(())
    }

    async fn build_pack(&self, ids: &[ObjectId]) -> Result<Vec<u8>> {
        let mut pack = Pack::new();
        for id in ids {
            pack.push(self.read_raw(id).await?);
        }
        Ok(pack.to_bytes())
    }

    async fn index_pack(&self, bytes: &[u8]) -> Result<IndexReport> {
        fs::create_dir_all(self.pack_dir()).await?;
        let staged = self
            .pack_dir()
            .join(format!("pack-{}.pack", blake3::hash(bytes).to_hex()));
        fs::write(&staged, bytes).await?;

        let result = self.index_staged(bytes).await;
        if let Err(e) = fs::remove_file(&staged).await {
            warn!(path = %staged.display(), error = %e, "failed to remove staged pack");
        }
        result
    }
}

impl FsObjectGraph {
    async fn index_staged(&self, bytes: &[u8]) -> Result<IndexReport> {
        let pack = Pack::from_bytes(bytes)?;
        let mut report = IndexReport {
            objects: pack.len(),
            new_objects: 0,
        };
        for (id, encoded) in pack.entries() {
            if self.write_raw(id, encoded).await? {
                report.new_objects += 1;
            }
        }
        debug!(objects = report.objects, new = report.new_objects, "indexed pack");
        Ok(report)
    }
}

#[async_trait]
impl WorkingCopy for FsObjectGraph {
    fn contains_working_copy(path: &Path) -> bool {
        path.join(METADATA_DIR).is_dir()
            || (path.join("objects").is_dir() && path.join("HEAD").is_file())
    }

    async fn init(path: &Path) -> Result<Self> {
        if Self::contains_working_copy(path) {
            return Err(GraphError::AlreadyExists(path.to_path_buf()));
        }
        let graph = Self::at(path.join(METADATA_DIR), Some(path.to_path_buf()));
        graph.create_layout().await?;
        debug!(path = %path.display(), "initialized working copy");
        Ok(graph)
    }

    /// Open `path`. A directory without a metadata directory inside it is
    /// opened as a bare repository.
    async fn open(path: &Path) -> Result<Self> {
        let meta = path.join(METADATA_DIR);
        if fs::metadata(&meta).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Ok(Self::at(meta, Some(path.to_path_buf())));
        }
        match fs::metadata(path).await {
            Ok(m) if m.is_dir() => Ok(Self::at(path.to_path_buf(), None)),
            _ => Err(GraphError::NotAWorkingCopy(path.to_path_buf())),
        }
    }
}

/// Build the tree objects for a snapshot. Returns the root tree id and every
/// object to store, children before parents.
fn snapshot_objects(files: &BTreeMap<String, Vec<u8>>) -> Result<(ObjectId, Vec<GraphObject>)> {
    #[derive(Default)]
    struct Dir {
        files: BTreeMap<String, Vec<u8>>,
        dirs: BTreeMap<String, Dir>,
    }

    fn build(dir: &Dir, out: &mut Vec<GraphObject>) -> ObjectId {
        let mut entries = Vec::with_capacity(dir.files.len() + dir.dirs.len());
        for (name, content) in &dir.files {
            let blob = GraphObject::Blob(content.clone());
            entries.push(TreeEntry::file(name.clone(), blob.id()));
            out.push(blob);
        }
        for (name, child) in &dir.dirs {
            entries.push(TreeEntry::directory(name.clone(), build(child, out)));
        }
        let tree = GraphObject::Tree(Tree::new(entries));
        let id = tree.id();
        out.push(tree);
        id
    }

    let mut root = Dir::default();
    for (path, content) in files {
        let mut parts: Vec<&str> = path.split('/').collect();
        let name = parts.pop().unwrap_or_default();
        for part in parts.iter().copied().chain(std::iter::once(name)) {
            check_entry_name(part)?;
        }

        let mut dir = &mut root;
        for part in parts {
            if dir.files.contains_key(part) {
                return Err(GraphError::InvalidPath(path.clone()));
            }
            dir = dir.dirs.entry(part.to_string()).or_default();
        }
        if dir.dirs.contains_key(name) {
            return Err(GraphError::InvalidPath(path.clone()));
        }
        dir.files.insert(name.to_string(), content.clone());
    }

    let mut objects = Vec::new();
    let id = build(&root, &mut objects);
    Ok((id, objects))
}

fn check_entry_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name == METADATA_DIR
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        Err(GraphError::InvalidPath(name.to_string()))
    } else {
        Ok(())
    }
}

fn parse_hex_id(reference: &str) -> Option<ObjectId> {
    if reference.len() == 64 {
        ObjectId::from_hex(reference).ok()
    } else {
        None
    }
}

fn wrong_kind(id: &ObjectId, expected: &'static str, actual: &GraphObject) -> GraphError {
    GraphError::WrongKind {
        id: *id,
        expected,
        actual: actual.kind(),
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: EntryMode) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let bits = if mode == EntryMode::Executable { 0o755 } else { 0o644 };
    fs::set_permissions(path, std::fs::Permissions::from_mode(bits)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: EntryMode) -> Result<()> {
    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn files(pairs: &[(&str, &str)]) -> BTreeMap<String, Vec<u8>> {
        pairs
            .iter()
            .map(|(path, content)| (path.to_string(), content.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn test_init_then_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repo");

        let graph = FsObjectGraph::init(&path).await.unwrap();
        assert!(!graph.is_bare());
        assert!(FsObjectGraph::contains_working_copy(&path));
        assert!(matches!(
            FsObjectGraph::init(&path).await,
            Err(GraphError::AlreadyExists(_))
        ));

        let reopened = FsObjectGraph::open(&path).await.unwrap();
        assert_eq!(reopened.metadata_dir(), path.join(METADATA_DIR));
        assert_eq!(reopened.resolve_ref("HEAD").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_directory_without_metadata_opens_bare() {
        let dir = tempdir().unwrap();
        let graph = FsObjectGraph::open(dir.path()).await.unwrap();
        assert!(graph.is_bare());
        assert!(matches!(
            FsObjectGraph::open(&dir.path().join("missing")).await,
            Err(GraphError::NotAWorkingCopy(_))
        ));
    }

    #[tokio::test]
    async fn test_commits_carry_configured_author() {
        let dir = tempdir().unwrap();
        let graph = FsObjectGraph::init(dir.path()).await.unwrap();
        graph.commit(&files(&[("a", "1")]), "default").await.unwrap();

        let graph = graph.with_author("alice");
        graph.commit(&files(&[("a", "2")]), "signed").await.unwrap();

        let history = graph.history_from("HEAD").await.unwrap();
        assert_eq!(history[0].commit.author, "packchain");
        assert_eq!(history[1].commit.author, "alice");
    }

    #[tokio::test]
    async fn test_history_is_oldest_first() {
        let dir = tempdir().unwrap();
        let graph = FsObjectGraph::init(dir.path()).await.unwrap();

        let c1 = graph.commit(&files(&[("a", "1")]), "one").await.unwrap();
        let c2 = graph.commit(&files(&[("a", "2")]), "two").await.unwrap();
        let c3 = graph.commit(&files(&[("a", "3")]), "three").await.unwrap();

        let ids: Vec<_> = graph
            .history_from("HEAD")
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        assert_eq!(ids, vec![c1, c2, c3]);
        assert_eq!(graph.resolve_ref("master").await.unwrap(), Some(c3));
        assert_eq!(graph.resolve_ref(&c1.to_hex()).await.unwrap(), Some(c1));
    }

    #[tokio::test]
    async fn test_merge_history_puts_parents_first() {
        let dir = tempdir().unwrap();
        let graph = FsObjectGraph::init(dir.path()).await.unwrap();

        let base = graph.commit(&files(&[("a", "base")]), "base").await.unwrap();
        let tree = graph.write_tree(Vec::new()).await.unwrap();
        let left = graph.commit_tree(tree, vec![base], "left").await.unwrap();
        let right = graph.commit_tree(tree, vec![base], "right").await.unwrap();
        let merge = graph.commit_tree(tree, vec![left, right], "merge").await.unwrap();
        graph.write_ref("master", &merge).await.unwrap();

        let ids: Vec<_> = graph
            .history_from("master")
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], base);
        assert_eq!(ids[3], merge);
        let pos = |id: &ObjectId| ids.iter().position(|x| x == id).unwrap();
        assert!(pos(&left) < pos(&merge) && pos(&right) < pos(&merge));
    }

    #[tokio::test]
    async fn test_checkout_writes_and_prunes() {
        let dir = tempdir().unwrap();
        let graph = FsObjectGraph::init(dir.path()).await.unwrap();

        graph
            .commit(&files(&[("keep.txt", "k"), ("docs/old.md", "old")]), "first")
            .await
            .unwrap();
        graph.checkout("master").await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("docs/old.md")).unwrap(), "old");

        graph
            .commit(&files(&[("keep.txt", "k2"), ("new.txt", "n")]), "second")
            .await
            .unwrap();
        graph.checkout("master").await.unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("keep.txt")).unwrap(), "k2");
        assert_eq!(std::fs::read_to_string(dir.path().join("new.txt")).unwrap(), "n");
        assert!(!dir.path().join("docs").exists());
        assert!(dir.path().join(METADATA_DIR).is_dir());
    }

    #[tokio::test]
    async fn test_pack_transfers_objects() {
        let src_dir = tempdir().unwrap();
        let dst_dir = tempdir().unwrap();
        let src = FsObjectGraph::init(src_dir.path()).await.unwrap();
        let dst = FsObjectGraph::init(dst_dir.path()).await.unwrap();

        let head = src.commit(&files(&[("f", "content")]), "c").await.unwrap();
        let GraphObject::Commit(commit) = src.read_object(&head).await.unwrap() else {
            panic!("expected commit");
        };
        let tree = src.read_tree(&commit.tree).await.unwrap();
        let mut ids = vec![head, commit.tree];
        ids.extend(tree.entries().iter().map(|e| e.id));

        let pack = src.build_pack(&ids).await.unwrap();
        let report = dst.index_pack(&pack).await.unwrap();
        assert_eq!(report, IndexReport { objects: 3, new_objects: 3 });
        assert_eq!(dst.index_pack(&pack).await.unwrap().new_objects, 0);

        dst.write_ref("master", &head).await.unwrap();
        dst.checkout("master").await.unwrap();
        assert_eq!(std::fs::read_to_string(dst_dir.path().join("f")).unwrap(), "content");
        assert_eq!(std::fs::read_dir(dst.pack_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_pack_rejected() {
        let dir = tempdir().unwrap();
        let graph = FsObjectGraph::init(dir.path()).await.unwrap();
        let err = graph.index_pack(b"not a pack").await.unwrap_err();
        assert!(matches!(err, GraphError::CorruptPack(_)));
    }

    #[tokio::test]
    async fn test_snapshot_rejects_metadata_path() {
        let dir = tempdir().unwrap();
        let graph = FsObjectGraph::init(dir.path()).await.unwrap();
        let err = graph
            .commit(&files(&[(".packchain/HEAD", "x")]), "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidPath(_)));
    }
}
