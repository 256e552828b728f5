use prost::Message as _;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use similar_asserts::assert_eq;

use super::*;
use crate::{
    ast::{FileBuilder, ImportKind, Label, NumberRange, Syntax},
    SpaceKind,
};

const OPTIONAL: Option<Label> = Some(Label::Optional);

fn empty(name: &str) -> ast::File {
    FileBuilder::new(name).build()
}

fn importing(name: &str, imports: &[(&str, ImportKind)]) -> ast::File {
    imports
        .iter()
        .fold(FileBuilder::new(name), |file, &(path, kind)| {
            file.import(path, kind)
        })
        .build()
}

fn visible(analyzer: &Analyzer, id: FileId) -> Vec<&str> {
    analyzer
        .visible_files(id)
        .unwrap()
        .iter()
        .map(|&file| analyzer.file(file).unwrap().name())
        .collect()
}

#[test]
fn visible_files_follow_public_imports() {
    let mut analyzer = Analyzer::new();
    analyzer.add_file(empty("d.proto"));
    analyzer.add_file(importing("c.proto", &[("d.proto", ImportKind::Normal)]));
    analyzer.add_file(importing("b.proto", &[("c.proto", ImportKind::Public)]));
    let a = analyzer.add_file(importing("a.proto", &[("b.proto", ImportKind::Normal)]));

    assert_eq!(visible(&analyzer, a), vec!["c.proto", "b.proto", "a.proto"]);
}

#[test]
fn visible_files_invalidated_by_imports() {
    let mut analyzer = Analyzer::new();
    let a = analyzer.add_file(importing("a.proto", &[("b.proto", ImportKind::Normal)]));
    assert_eq!(visible(&analyzer, a), vec!["a.proto"]);

    analyzer.add_file(empty("b.proto"));
    assert_eq!(visible(&analyzer, a), vec!["a.proto", "b.proto"]);

    analyzer.add_file(importing("b.proto", &[("c.proto", ImportKind::Public)]));
    assert_eq!(visible(&analyzer, a), vec!["a.proto", "b.proto"]);

    analyzer.add_file(empty("c.proto"));
    assert_eq!(visible(&analyzer, a), vec!["a.proto", "b.proto", "c.proto"]);

    analyzer.remove_file("c.proto").unwrap();
    assert_eq!(visible(&analyzer, a), vec!["a.proto", "b.proto"]);
}

fn numbered(fields: &[i64]) -> ast::File {
    FileBuilder::new("foo.proto")
        .message("Foo", |m| {
            for (i, &number) in fields.iter().enumerate() {
                m.field(OPTIONAL, "int32", &format!("f{}", i), number);
            }
            m.reserved(NumberRange::new(5, 9))
                .extensions(NumberRange::new(100, 199));
        })
        .build()
}

#[test]
fn number_space() {
    let mut analyzer = Analyzer::new();
    let id = analyzer.add_file(numbered(&[1, 2]));
    let foo = analyzer.file(id).unwrap().find("Foo").unwrap();
    let container = DeclRef { file: id, decl: foo };

    let space = analyzer.number_space(container).unwrap();
    assert_eq!(space.kind(), SpaceKind::Message);
    assert_eq!(
        space.occupied().iter().map(|&(number, _)| number).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(
        space
            .reserved()
            .iter()
            .map(|range| (range.start, range.end))
            .collect::<Vec<_>>(),
        vec![(5, 9)]
    );
    assert_eq!(space.extensions().len(), 1);
    assert_eq!(space.next_free(), Some(3));
    assert!(space.is_free(3));
    assert!(!space.is_free(7));
    assert!(!space.is_free(150));
    assert!(!space.is_free(19_500));
    assert!(!space.is_free(0));

    let first = analyzer.number_check(id, foo).unwrap();
    assert!(Arc::ptr_eq(&first, &analyzer.number_check(id, foo).unwrap()));

    analyzer.add_file(numbered(&[1, 2]));
    assert!(Arc::ptr_eq(&first, &analyzer.number_check(id, foo).unwrap()));

    analyzer.add_file(numbered(&[1, 2, 3, 4]));
    assert!(!Arc::ptr_eq(&first, &analyzer.number_check(id, foo).unwrap()));
    assert_eq!(analyzer.number_space(container).unwrap().next_free(), Some(10));

    let field = analyzer.file(id).unwrap().find("Foo.f0").unwrap();
    assert_eq!(analyzer.number_space(DeclRef { file: id, decl: field }), None);
}

#[test]
fn number_cache_ignores_hash_collisions() {
    let mut analyzer = Analyzer::new();
    let old = numbered(&[1, 2]);
    let id = analyzer.add_file(old.clone());
    let foo = old.find("Foo").unwrap();
    let stale = analyzer.number_check(id, foo).unwrap();

    analyzer.add_file(numbered(&[1, 2, 3, 4]));
    let current = check::number_key(&analyzer.files[id].ast, foo);
    analyzer.numbers.write().insert(
        (id, foo),
        CachedNumbers {
            key: check::number_key(&old, foo).colliding_with(&current),
            check: stale.clone(),
        },
    );

    let fresh = analyzer.number_check(id, foo).unwrap();
    assert!(!Arc::ptr_eq(&stale, &fresh));
    assert_eq!(fresh.space.next_free(), Some(10));
    assert!(Arc::ptr_eq(&fresh, &analyzer.number_check(id, foo).unwrap()));
}

#[test]
fn remove_file() {
    let mut analyzer = Analyzer::new();
    let a = analyzer.add_file(empty("a.proto"));
    let b = analyzer.add_file(importing("b.proto", &[("a.proto", ImportKind::Normal)]));
    assert_eq!(analyzer.validate(b).unwrap(), Vec::<Diagnostic>::new());

    assert_eq!(analyzer.remove_file("a.proto").unwrap(), a);
    assert!(analyzer.remove_file("a.proto").unwrap_err().is_file_not_found());
    assert!(analyzer.validate(a).unwrap_err().is_file_not_found());
    assert!(analyzer.file(a).is_none());
    assert_eq!(analyzer.file_id("a.proto"), None);

    let rules: Vec<&str> = analyzer
        .validate(b)
        .unwrap()
        .iter()
        .map(|diagnostic| diagnostic.rule())
        .collect();
    assert_eq!(rules, vec!["unresolved-import"]);

    assert_eq!(analyzer.add_file(empty("a.proto")), a);
    assert_eq!(analyzer.validate(b).unwrap(), Vec::<Diagnostic>::new());
}

#[test]
fn validate_all() {
    let mut analyzer = Analyzer::new();
    let a = analyzer.add_file(empty("a.proto"));
    let b = analyzer.add_file(
        FileBuilder::new("b.proto")
            .enumeration("E", |_| {})
            .build(),
    );

    let validation = analyzer.validate_all(&CancellationToken::new());
    assert!(!validation.cancelled);
    assert!(validation.has_errors());
    assert_eq!(
        validation
            .files
            .iter()
            .map(|(id, diagnostics)| (*id, diagnostics.len()))
            .collect::<Vec<_>>(),
        vec![(a, 0), (b, 1)]
    );

    let token = CancellationToken::new();
    token.cancel();
    let validation = analyzer.validate_all(&token);
    assert!(validation.cancelled);
    assert!(validation.files.is_empty());
    assert!(!validation.has_errors());
}

#[test]
fn validate_is_repeatable() {
    let mut analyzer = Analyzer::new();
    let id = analyzer.add_file(
        FileBuilder::new("foo.proto")
            .message("Foo", |m| {
                m.field(OPTIONAL, "Missing", "a", 1)
                    .field(OPTIONAL, "int32", "b", 1);
            })
            .build(),
    );

    let first = analyzer.validate(id).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(analyzer.validate(id).unwrap(), first);
}

fn zero_not_first() -> ast::File {
    FileBuilder::new("foo.proto")
        .syntax(Syntax::Proto3)
        .enumeration("E", |e| {
            e.value("A", 1).value("B", 0);
        })
        .build()
}

#[test]
fn severity_configuration() {
    let mut analyzer = Analyzer::new();
    let id = analyzer.add_file(zero_not_first());
    let diagnostics = analyzer.validate(id).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity(), Severity::Warning);
    assert!(!analyzer.validate_all(&CancellationToken::new()).has_errors());

    analyzer.warnings_as_errors(true);
    let diagnostics = analyzer.validate(id).unwrap();
    assert_eq!(diagnostics[0].rule(), "enum-zero-not-first");
    assert_eq!(diagnostics[0].severity(), Severity::Error);
    assert!(analyzer.validate_all(&CancellationToken::new()).has_errors());

    analyzer.disable_rule("enum-zero-not-first");
    assert_eq!(analyzer.validate(id).unwrap(), Vec::<Diagnostic>::new());
}

#[test]
fn add_file_descriptor_set() {
    let set = FileDescriptorSet {
        file: vec![
            FileDescriptorProto {
                name: Some("a.proto".to_owned()),
                ..Default::default()
            },
            FileDescriptorProto {
                name: Some("b.proto".to_owned()),
                dependency: vec!["a.proto".to_owned()],
                ..Default::default()
            },
        ],
    };

    let mut analyzer = Analyzer::new();
    let ids = analyzer
        .add_file_descriptor_set(set.encode_to_vec().as_slice())
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(analyzer.file_id("b.proto"), Some(ids[1]));
    assert_eq!(visible(&analyzer, ids[1]), vec!["a.proto", "b.proto"]);

    let err = analyzer
        .add_file_descriptor_set([0xffu8].as_slice())
        .unwrap_err();
    assert!(err.is_decode());
    assert_eq!(analyzer.files().count(), 2);
}

#[test]
fn resolve_references() {
    let mut analyzer = Analyzer::new();
    let id = analyzer.add_file(
        FileBuilder::new("foo.proto")
            .package("pkg")
            .message("Foo", |m| {
                m.field(OPTIONAL, "int32", "a", 1)
                    .oneof("choice", |o| {
                        o.field(None, "string", "b", 2);
                    })
                    .extensions(NumberRange::new(100, 199));
            })
            .enumeration("E", |e| {
                e.value("X", 0);
            })
            .extend("Foo", |e| {
                e.field(OPTIONAL, "int32", "ext", 100);
            })
            .build(),
    );

    let file = analyzer.file(id).unwrap();
    let decl = |path: &str| DeclRef {
        file: id,
        decl: file.find(path).unwrap(),
    };

    let field = |message: &str, name: &str| Reference::Field {
        message: decl(message),
        name: name.to_owned(),
    };
    assert_eq!(analyzer.resolve(&field("Foo", "a")), Some(decl("Foo.a")));
    assert_eq!(analyzer.resolve(&field("Foo", "b")), Some(decl("Foo.b")));
    assert_eq!(analyzer.resolve(&field("Foo", "choice")), None);

    let value = Reference::EnumValue {
        enumeration: decl("E"),
        name: "X".to_owned(),
    };
    assert_eq!(analyzer.resolve(&value), Some(decl("X")));

    let ext = ast::TypeRef::parse("pkg.ext");
    let extension = Reference::Extension {
        file: id,
        scope: None,
        name: ext.clone(),
    };
    assert_eq!(analyzer.resolve(&extension), Some(decl("ext")));
    let ty = Reference::Type {
        file: id,
        scope: None,
        name: ext,
    };
    assert_eq!(analyzer.resolve(&ty), None);

    let absolute = Reference::Type {
        file: id,
        scope: Some(decl("Foo").decl),
        name: ast::TypeRef::parse(".pkg.E"),
    };
    assert_eq!(analyzer.resolve(&absolute), Some(decl("E")));
}
