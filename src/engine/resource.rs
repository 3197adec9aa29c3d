//! engine::resource
//!
//! Change buckets derived from status entries.
//!
//! # Mapping
//!
//! Each [`RawStatusEntry`] carries two letters: `x` for the index and `y` for
//! the working tree. The pair is translated through a fixed table:
//!
//! | Letters | Bucket | Status |
//! |---|---|---|
//! | `??` | working tree / untracked / dropped (policy) | `Untracked` |
//! | `!!` | working tree / untracked / dropped (policy) | `Ignored` |
//! | `DD` `AU` `UD` `UA` `DU` `AA` `UU` | merge | conflict kinds |
//! | `x` ∈ `MADRCT` | index | `Index*` |
//! | `y` ∈ `MDART` | working tree | `Modified`, `Deleted`, ... |
//!
//! An ordinary entry can produce two resources, one in the index bucket and
//! one in the working-tree bucket (`MM`). Conflict pairs produce exactly one.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::config::UntrackedPolicy;
use crate::git::parse::RawStatusEntry;

/// The four buckets a panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceGroupKind {
    Merge,
    Index,
    WorkingTree,
    Untracked,
}

/// Change kind of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    IndexModified,
    IndexAdded,
    IndexDeleted,
    IndexRenamed,
    IndexCopied,
    IndexTypeChanged,

    Modified,
    Deleted,
    Untracked,
    Ignored,
    IntentToAdd,
    IntentToRename,
    TypeChanged,

    AddedByUs,
    AddedByThem,
    DeletedByUs,
    DeletedByThem,
    BothAdded,
    BothDeleted,
    BothModified,
}

impl Status {
    /// Single-letter decoration, as shown next to a file.
    pub fn letter(&self) -> char {
        match self {
            Self::IndexModified | Self::Modified => 'M',
            Self::IndexAdded | Self::IntentToAdd => 'A',
            Self::IndexDeleted | Self::Deleted => 'D',
            Self::IndexRenamed | Self::IntentToRename => 'R',
            Self::IndexCopied => 'C',
            Self::IndexTypeChanged | Self::TypeChanged => 'T',
            Self::Untracked => 'U',
            Self::Ignored => 'I',
            Self::AddedByUs
            | Self::AddedByThem
            | Self::DeletedByUs
            | Self::DeletedByThem
            | Self::BothAdded
            | Self::BothDeleted
            | Self::BothModified => '!',
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.letter() == '!'
    }
}

/// One changed path in one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub group: ResourceGroupKind,
    pub status: Status,
    /// Absolute path of the file as it is now.
    pub path: PathBuf,
    /// Absolute source path of a rename or copy.
    pub original_path: Option<PathBuf>,
}

/// All four buckets. Replaced wholesale on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceGroups {
    pub merge: Vec<Resource>,
    pub index: Vec<Resource>,
    pub working_tree: Vec<Resource>,
    pub untracked: Vec<Resource>,
}

impl ResourceGroups {
    /// Sort `entries` into buckets under `policy`.
    pub fn from_entries(entries: &[RawStatusEntry], root: &Path, policy: UntrackedPolicy) -> Self {
        let mut groups = Self::default();
        for entry in entries {
            for resource in resources_for(entry, root, policy) {
                groups.push(resource);
            }
        }
        groups
    }

    pub fn group(&self, kind: ResourceGroupKind) -> &[Resource] {
        match kind {
            ResourceGroupKind::Merge => &self.merge,
            ResourceGroupKind::Index => &self.index,
            ResourceGroupKind::WorkingTree => &self.working_tree,
            ResourceGroupKind::Untracked => &self.untracked,
        }
    }

    pub fn len(&self) -> usize {
        self.merge.len() + self.index.len() + self.working_tree.len() + self.untracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every resource, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.merge
            .iter()
            .chain(&self.index)
            .chain(&self.working_tree)
            .chain(&self.untracked)
    }

    fn push(&mut self, resource: Resource) {
        match resource.group {
            ResourceGroupKind::Merge => self.merge.push(resource),
            ResourceGroupKind::Index => self.index.push(resource),
            ResourceGroupKind::WorkingTree => self.working_tree.push(resource),
            ResourceGroupKind::Untracked => self.untracked.push(resource),
        }
    }
}

fn conflict_status(x: char, y: char) -> Option<Status> {
    Some(match (x, y) {
        ('D', 'D') => Status::BothDeleted,
        ('A', 'U') => Status::AddedByUs,
        ('U', 'D') => Status::DeletedByThem,
        ('U', 'A') => Status::AddedByThem,
        ('D', 'U') => Status::DeletedByUs,
        ('A', 'A') => Status::BothAdded,
        ('U', 'U') => Status::BothModified,
        _ => return None,
    })
}

fn index_status(x: char) -> Option<Status> {
    Some(match x {
        'M' => Status::IndexModified,
        'A' => Status::IndexAdded,
        'D' => Status::IndexDeleted,
        'R' => Status::IndexRenamed,
        'C' => Status::IndexCopied,
        'T' => Status::IndexTypeChanged,
        _ => return None,
    })
}

fn working_tree_status(y: char) -> Option<Status> {
    Some(match y {
        'M' => Status::Modified,
        'D' => Status::Deleted,
        'A' => Status::IntentToAdd,
        'R' => Status::IntentToRename,
        'T' => Status::TypeChanged,
        _ => return None,
    })
}

/// Resources for one status entry; empty when the policy hides it.
pub fn resources_for(entry: &RawStatusEntry, root: &Path, policy: UntrackedPolicy) -> Vec<Resource> {
    let path = root.join(&entry.path);
    let original_path = entry.original_path.as_ref().map(|p| root.join(p));

    let make = |group, status, original: Option<PathBuf>| Resource {
        group,
        status,
        path: path.clone(),
        original_path: original,
    };

    let untracked_bucket = match policy {
        UntrackedPolicy::Mixed => Some(ResourceGroupKind::WorkingTree),
        UntrackedPolicy::Separate => Some(ResourceGroupKind::Untracked),
        UntrackedPolicy::Hidden => None,
    };

    match (entry.x, entry.y) {
        ('?', '?') => {
            return untracked_bucket
                .map(|group| vec![make(group, Status::Untracked, None)])
                .unwrap_or_default()
        }
        ('!', '!') => {
            return untracked_bucket
                .map(|group| vec![make(group, Status::Ignored, None)])
                .unwrap_or_default()
        }
        _ => {}
    }

    if let Some(status) = conflict_status(entry.x, entry.y) {
        return vec![make(ResourceGroupKind::Merge, status, None)];
    }

    let mut resources = Vec::with_capacity(2);
    if let Some(status) = index_status(entry.x) {
        let original = matches!(status, Status::IndexRenamed | Status::IndexCopied)
            .then(|| original_path.clone())
            .flatten();
        resources.push(make(ResourceGroupKind::Index, status, original));
    }
    if let Some(status) = working_tree_status(entry.y) {
        let original = (status == Status::IntentToRename)
            .then(|| original_path.clone())
            .flatten();
        resources.push(make(ResourceGroupKind::WorkingTree, status, original));
    }
    resources
}
