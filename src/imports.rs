//! Computes which files are visible to each file through its imports.

use std::{
    collections::{BTreeSet, VecDeque},
    sync::Arc,
};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    ast::{self, ImportKind},
    check::CheckError,
    files::{FileId, FileMap},
};

/// Memoized visible-file sets.
#[derive(Debug, Default)]
pub(crate) struct ImportGraph {
    memo: RwLock<FxHashMap<FileId, Memo>>,
}

#[derive(Debug)]
struct Memo {
    generation: u64,
    files: Arc<BTreeSet<FileId>>,
}

impl ImportGraph {
    /// The files visible to `file`: itself, each direct import, and everything reachable from a
    /// direct import through public imports only.
    pub fn visible(&self, files: &FileMap, file: FileId) -> Option<Arc<BTreeSet<FileId>>> {
        let entry = files.get(file)?;
        if let Some(memo) = self.memo.read().get(&file) {
            if memo.generation == entry.generation {
                tracing::trace!(file = entry.ast.name(), "visible files cache hit");
                return Some(memo.files.clone());
            }
        }

        let visible = Arc::new(compute_visible(files, file, &entry.ast));
        self.memo.write().insert(
            file,
            Memo {
                generation: entry.generation,
                files: visible.clone(),
            },
        );
        Some(visible)
    }

    /// Drops the memo of every file that imports `name`, directly or transitively.
    pub fn invalidate(&mut self, files: &FileMap, name: &str) {
        let memo = self.memo.get_mut();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut queue = VecDeque::from([name.to_owned()]);
        seen.insert(name.to_owned());

        while let Some(changed) = queue.pop_front() {
            if let Some(id) = files.id(&changed) {
                memo.remove(&id);
            }
            for (id, file) in files.iter() {
                if file
                    .ast
                    .imports()
                    .iter()
                    .any(|import| import.path == changed)
                    && seen.insert(file.ast.name().to_owned())
                {
                    tracing::debug!(
                        file = file.ast.name(),
                        changed = %changed,
                        "invalidating visible files"
                    );
                    memo.remove(&id);
                    queue.push_back(file.ast.name().to_owned());
                }
            }
        }
    }

    /// Drops every memo entry for a file that has been removed.
    pub fn forget(&mut self, file: FileId) {
        self.memo.get_mut().remove(&file);
    }
}

fn compute_visible(files: &FileMap, id: FileId, file: &ast::File) -> BTreeSet<FileId> {
    let mut visible = BTreeSet::from([id]);
    let mut stack: Vec<FileId> = file
        .imports()
        .iter()
        .filter_map(|import| files.id(&import.path))
        .collect();

    while let Some(next) = stack.pop() {
        if !visible.insert(next) {
            continue;
        }
        if let Some(entry) = files.get(next) {
            stack.extend(
                entry
                    .ast
                    .imports()
                    .iter()
                    .filter(|import| import.kind == ImportKind::Public)
                    .filter_map(|import| files.id(&import.path)),
            );
        }
    }

    visible
}

/// Reports missing, repeated and cyclic imports of a file.
pub(crate) fn check_imports(files: &FileMap, id: FileId, file: &ast::File) -> Vec<CheckError> {
    let mut errors = Vec::new();
    let mut seen: FxHashMap<&str, &ast::Import> = FxHashMap::default();

    for import in file.imports() {
        if let Some(first) = seen.insert(import.path.as_str(), import) {
            errors.push(CheckError::DuplicateImport {
                name: import.path.clone(),
                first: first.span.clone().map(Into::into),
                second: import.span.clone().map(Into::into),
            });
            continue;
        }

        match files.id(&import.path) {
            Some(target) => {
                if let Some(cycle) = find_cycle(files, id, target) {
                    errors.push(CheckError::ImportCycle {
                        cycle,
                        span: import.span.clone().map(Into::into),
                    });
                }
            }
            None if import.kind == ImportKind::Weak => {}
            None => errors.push(CheckError::UnresolvedImport {
                name: import.path.clone(),
                span: import.span.clone().map(Into::into),
            }),
        }
    }

    errors
}

/// Finds a path of imports from `start` back to `root`, formatted as `a -> b -> a`.
fn find_cycle(files: &FileMap, root: FileId, start: FileId) -> Option<String> {
    let mut parents: FxHashMap<FileId, FileId> = FxHashMap::default();
    let mut queue = VecDeque::from([start]);
    let mut visited = FxHashSet::default();
    visited.insert(start);

    while let Some(current) = queue.pop_front() {
        if current == root {
            let mut path = vec![root];
            let mut node = root;
            while node != start {
                let Some(&parent) = parents.get(&node) else {
                    break;
                };
                node = parent;
                path.push(node);
            }
            path.push(root);
            path.reverse();
            let names: Vec<&str> = path
                .iter()
                .map(|&id| files.get(id).map_or("?", |file| file.ast.name()))
                .collect();
            return Some(names.join(" -> "));
        }

        let Some(entry) = files.get(current) else {
            continue;
        };
        for import in entry.ast.imports() {
            if let Some(next) = files.id(&import.path) {
                if visited.insert(next) {
                    parents.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
    }

    None
}
