use super::{DeclId, File};

/// A preorder traversal of the declarations in a [`File`], created by [`File::walk`].
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    file: &'a File,
    stack: Vec<DeclId>,
}

impl<'a> Walk<'a> {
    pub(super) fn new(file: &'a File) -> Self {
        Walk {
            file,
            stack: file.items.iter().rev().copied().collect(),
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = DeclId;

    fn next(&mut self) -> Option<DeclId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.file.decl(id).children.iter().rev().copied());
        Some(id)
    }
}
