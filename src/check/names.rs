use std::collections::hash_map;

use rustc_hash::{FxHashMap, FxHashSet};

use super::{source_span, CheckError, Context};
use crate::{
    ast::{self, DeclId, DeclKind},
    case::{group_field_name, to_json_name, to_lower_without_underscores},
};

/// The name tables of a single file.
///
/// Each container has a table of the names declared directly inside it, after hoisting: enum
/// values are also registered in the container of their enum, oneof members and extension
/// fields in the enclosing message (or file), and groups under both their type name and their
/// field name.
#[derive(Debug)]
pub(crate) struct FileScope {
    root: NameTable,
    tables: Vec<NameTable>,
    symbols: FxHashMap<String, DeclId>,
    packages: FxHashSet<String>,
    errors: Vec<CheckError>,
}

#[derive(Debug, Default)]
pub(crate) struct NameTable {
    names: FxHashMap<String, DeclId>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Conflict {
    Report,
    EnumValue(DeclId),
    Ignore,
}

struct Builder<'a> {
    file: &'a ast::File,
    tables: Vec<NameTable>,
    symbols: FxHashMap<String, DeclId>,
    errors: Vec<CheckError>,
}

impl FileScope {
    pub fn build(file: &ast::File) -> Self {
        let mut builder = Builder {
            file,
            tables: (0..file.len()).map(|_| NameTable::default()).collect(),
            symbols: FxHashMap::default(),
            errors: Vec::new(),
        };
        let root = builder.build_table(None, &file.package().to_string());

        let mut packages = FxHashSet::default();
        for prefix in file.package().prefixes() {
            if !prefix.is_empty() {
                packages.insert(prefix.join("."));
            }
        }

        FileScope {
            root,
            tables: builder.tables,
            symbols: builder.symbols,
            packages,
            errors: builder.errors,
        }
    }

    /// The table of `container`, or of the file root if `container` is `None`.
    pub fn table(&self, container: Option<DeclId>) -> &NameTable {
        match container {
            Some(id) => &self.tables[id.index()],
            None => &self.root,
        }
    }

    /// Looks up a declaration by its full name, without a leading dot.
    pub fn symbol(&self, full_name: &str) -> Option<DeclId> {
        self.symbols.get(full_name).copied()
    }

    /// Returns `true` if `name` is the file's package or one of its prefixes.
    pub fn is_package(&self, name: &str) -> bool {
        self.packages.contains(name)
    }

    /// Collisions found while building the tables.
    pub fn errors(&self) -> &[CheckError] {
        &self.errors
    }
}

impl NameTable {
    pub fn get(&self, name: &str) -> Option<DeclId> {
        self.names.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DeclId)> {
        self.names.iter().map(|(name, &id)| (name.as_str(), id))
    }
}

impl<'a> Builder<'a> {
    fn build_table(&mut self, container: Option<DeclId>, prefix: &str) -> NameTable {
        let file = self.file;
        let mut table = NameTable::default();
        for &child in file.children(container) {
            self.add_member(&mut table, prefix, child);
        }
        if let Some(container) = container {
            self.check_reserved_names(container);
        }
        table
    }

    fn add_member(&mut self, table: &mut NameTable, prefix: &str, id: DeclId) {
        let file = self.file;
        let decl = file.decl(id);
        match &decl.kind {
            DeclKind::ReservedRange(_) | DeclKind::ReservedName | DeclKind::ExtensionRange(_) => {}
            DeclKind::Extend(_) => {
                for &field in &decl.children {
                    self.add_member(table, prefix, field);
                }
            }
            DeclKind::Oneof => {
                self.insert(table, prefix, id, Conflict::Report);
                let mut oneof_table = NameTable::default();
                for &member in &decl.children {
                    self.insert(&mut oneof_table, prefix, member, Conflict::Ignore);
                    self.add_member(table, prefix, member);
                }
                self.tables[id.index()] = oneof_table;
            }
            DeclKind::Enum => {
                self.insert(table, prefix, id, Conflict::Report);
                let name = full_name(prefix, decl.name().unwrap_or_default());
                let values = self.build_table(Some(id), &name);
                self.tables[id.index()] = values;
                for &value in &decl.children {
                    if matches!(file.decl(value).kind, DeclKind::EnumValue(_)) {
                        self.insert(table, prefix, value, Conflict::EnumValue(id));
                    }
                }
            }
            DeclKind::Message | DeclKind::Service | DeclKind::Group(_) => {
                self.insert(table, prefix, id, Conflict::Report);
                if let (DeclKind::Group(_), Some(name)) = (&decl.kind, decl.name()) {
                    let field_name = group_field_name(name);
                    if field_name != name {
                        self.insert_name(table, prefix, field_name, id, Conflict::Report);
                    }
                }
                let name = full_name(prefix, decl.name().unwrap_or_default());
                let members = self.build_table(Some(id), &name);
                self.tables[id.index()] = members;
            }
            DeclKind::Method(_) | DeclKind::Field(_) | DeclKind::EnumValue(_) => {
                self.insert(table, prefix, id, Conflict::Report);
            }
        }
    }

    fn insert(&mut self, table: &mut NameTable, prefix: &str, id: DeclId, conflict: Conflict) {
        let file = self.file;
        if let Some(name) = file.decl(id).name() {
            self.insert_name(table, prefix, name.to_owned(), id, conflict);
        }
    }

    fn insert_name(
        &mut self,
        table: &mut NameTable,
        prefix: &str,
        name: String,
        id: DeclId,
        conflict: Conflict,
    ) {
        match table.names.entry(name) {
            hash_map::Entry::Vacant(entry) => {
                self.symbols
                    .entry(full_name(prefix, entry.key()))
                    .or_insert(id);
                entry.insert(id);
            }
            hash_map::Entry::Occupied(entry) => {
                let first = *entry.get();
                let name = entry.key().clone();
                if let Some(err) = self.conflict(first, id, name, prefix, conflict) {
                    self.errors.push(err);
                }
            }
        }
    }

    fn conflict(
        &self,
        first: DeclId,
        second: DeclId,
        name: String,
        prefix: &str,
        conflict: Conflict,
    ) -> Option<CheckError> {
        let first_span = source_span(self.file.decl(first).name_span());
        let second_span = source_span(self.file.decl(second).name_span());
        match conflict {
            Conflict::Ignore => None,
            Conflict::Report => Some(CheckError::DuplicateName {
                name: full_name(prefix, &name),
                first: first_span,
                second: second_span,
            }),
            // Collisions between values of the same enum are reported in the enum's own table.
            Conflict::EnumValue(enumeration) if self.file.parent(first) == Some(enumeration) => {
                None
            }
            Conflict::EnumValue(_) => Some(CheckError::EnumValueConflict {
                name: full_name(prefix, &name),
                first_name: self.file.full_name(first).to_string(),
                first: first_span,
                second: second_span,
            }),
        }
    }

    fn check_reserved_names(&mut self, container: DeclId) {
        let file = self.file;
        let reserved: FxHashSet<&str> = file
            .decl(container)
            .children
            .iter()
            .map(|&child| file.decl(child))
            .filter(|child| matches!(child.kind, DeclKind::ReservedName))
            .filter_map(ast::Decl::name)
            .collect();
        if reserved.is_empty() {
            return;
        }

        for member in numbered_members(file, container) {
            let member = file.decl(member);
            let name = match (&member.kind, member.name()) {
                (DeclKind::Group(_), Some(name)) => group_field_name(name),
                (_, Some(name)) => name.to_owned(),
                (_, None) => continue,
            };
            if reserved.contains(name.as_str()) {
                self.errors.push(CheckError::ReservedName {
                    name,
                    span: source_span(member.name_span()),
                });
            }
        }
    }
}

/// The fields, groups and enum values that occupy numbers in `container`, including the
/// members of its oneofs, in declaration order.
pub(crate) fn numbered_members(file: &ast::File, container: DeclId) -> Vec<DeclId> {
    let mut members = Vec::new();
    for &child in &file.decl(container).children {
        match &file.decl(child).kind {
            DeclKind::Field(_) | DeclKind::Group(_) | DeclKind::EnumValue(_) => {
                members.push(child)
            }
            DeclKind::Oneof => members.extend(file.decl(child).children.iter().copied()),
            _ => {}
        }
    }
    members
}

fn full_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{}.{}", prefix, name)
    }
}

impl<'a> Context<'a> {
    /// Reports top-level names that are also defined by another visible file.
    pub(super) fn check_duplicate_symbols(&mut self) {
        let entry = self.file;
        let file = self.ast();
        let prefix = file.package().to_string();
        let mut names: Vec<(&str, DeclId)> = entry.scope.table(None).iter().collect();
        names.sort_by_key(|&(_, id)| id);

        for (name, id) in names {
            let full_name = full_name(&prefix, name);
            let other = self
                .visible
                .iter()
                .filter(|&&other| other != self.id)
                .filter_map(|&other| self.analyzer.files.get(other))
                .find(|other| other.scope.symbol(&full_name).is_some())
                .map(|other| other.ast.name().to_owned());
            if let Some(other) = other {
                self.add_error(CheckError::DuplicateSymbol {
                    name: full_name,
                    file: other,
                    span: source_span(file.decl(id).name_span()),
                });
            }
        }
    }

    /// Reports fields of a message whose names only differ in case or underscores.
    pub(super) fn check_json_names(&mut self) {
        let file = self.ast();
        for id in file.walk() {
            if !file.decl(id).kind.is_message() {
                continue;
            }

            let mut names: FxHashMap<String, DeclId> = FxHashMap::default();
            for member in numbered_members(file, id) {
                let Some(name) = file.decl(member).name() else {
                    continue;
                };
                match names.entry(to_lower_without_underscores(name)) {
                    hash_map::Entry::Vacant(entry) => {
                        entry.insert(member);
                    }
                    hash_map::Entry::Occupied(entry) => {
                        let first = file.decl(*entry.get());
                        let first_name = first.name().unwrap_or_default();
                        if first_name == name {
                            // exact duplicates are reported as duplicate names
                            continue;
                        }
                        self.add_error(CheckError::JsonNameConflict {
                            first_name: first_name.to_owned(),
                            first_json: to_json_name(first_name),
                            first: source_span(first.name_span()),
                            second_name: name.to_owned(),
                            second_json: to_json_name(name),
                            second: source_span(file.decl(member).name_span()),
                        });
                    }
                }
            }
        }
    }
}
