use std::{fmt, ops::Index, sync::Arc};

use rustc_hash::FxHashMap;

use crate::{
    ast::{self, DeclId},
    check::FileScope,
};

/// Identifies a file loaded into an [`Analyzer`](crate::Analyzer).
///
/// Ids are stable for the lifetime of the analyzer: re-adding a file with the same name reuses
/// its id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

/// A declaration in a specific file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclRef {
    /// The file containing the declaration.
    pub file: FileId,
    /// The declaration within the file.
    pub decl: DeclId,
}

#[derive(Debug, Default)]
pub(crate) struct FileMap {
    files: Vec<Option<Arc<File>>>,
    file_names: FxHashMap<String, FileId>,
    generation: u64,
}

#[derive(Debug)]
pub(crate) struct File {
    pub ast: Arc<ast::File>,
    pub scope: FileScope,
    pub generation: u64,
}

impl FileId {
    /// The position of this file in load order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FileMap {
    /// Adds a file, replacing any previous file with the same name.
    pub fn insert(&mut self, ast: Arc<ast::File>) -> (FileId, Option<Arc<File>>) {
        self.generation += 1;
        let file = Arc::new(File {
            scope: FileScope::build(&ast),
            ast,
            generation: self.generation,
        });

        match self.file_names.get(file.ast.name()) {
            Some(&id) => {
                let previous = self.files[id.index()].replace(file);
                (id, previous)
            }
            None => {
                let id = FileId(self.files.len() as u32);
                self.file_names.insert(file.ast.name().to_owned(), id);
                self.files.push(Some(file));
                (id, None)
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<(FileId, Arc<File>)> {
        let id = *self.file_names.get(name)?;
        let file = self.files[id.index()].take()?;
        Some((id, file))
    }

    pub fn get(&self, id: FileId) -> Option<&Arc<File>> {
        self.files.get(id.index()).and_then(Option::as_ref)
    }

    pub fn id(&self, name: &str) -> Option<FileId> {
        self.file_names
            .get(name)
            .copied()
            .filter(|&id| self.get(id).is_some())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileId, &Arc<File>)> {
        self.files
            .iter()
            .enumerate()
            .filter_map(|(index, file)| Some((FileId(index as u32), file.as_ref()?)))
    }
}

impl Index<FileId> for FileMap {
    type Output = File;

    fn index(&self, id: FileId) -> &Self::Output {
        match self.get(id) {
            Some(file) => file,
            None => panic!("file {} is not loaded", id),
        }
    }
}
