use similar_asserts::assert_eq;

use super::*;
use crate::{
    ast::{ConstantKind, FileBuilder, ImportKind, Int, Label, NumberRange, OptionAssign, Syntax},
    convention::ResourceNameResolver,
    DeclRef, Reference, Severity,
};

const OPTIONAL: Option<Label> = Some(Label::Optional);

fn check_with(analyzer: &mut Analyzer, files: Vec<ast::File>) -> (FileId, Vec<Diagnostic>) {
    let mut id = None;
    for file in files {
        id = Some(analyzer.add_file(file));
    }
    let id = id.unwrap();
    (id, analyzer.validate(id).unwrap())
}

fn check(files: Vec<ast::File>) -> (FileId, Vec<Diagnostic>) {
    check_with(&mut Analyzer::new(), files)
}

fn assert_errors(files: Vec<ast::File>, expected: Vec<CheckError>) {
    let (id, diagnostics) = check(files);
    let expected: Vec<Diagnostic> = expected
        .into_iter()
        .map(|err| Diagnostic::from_check(id, err))
        .collect();
    assert_eq!(diagnostics, expected);
}

fn rules(files: Vec<ast::File>) -> Vec<&'static str> {
    check(files)
        .1
        .iter()
        .map(|diagnostic| diagnostic.rule())
        .collect()
}

fn proto3(name: &str) -> FileBuilder {
    FileBuilder::new(name).syntax(Syntax::Proto3)
}

fn descriptor_proto() -> ast::File {
    FileBuilder::new("google/protobuf/descriptor.proto")
        .package("google.protobuf")
        .message("FileOptions", |m| {
            m.field(OPTIONAL, "string", "java_package", 1)
                .extensions(NumberRange::to_max(1000));
        })
        .message("MessageOptions", |m| {
            m.field(OPTIONAL, "bool", "deprecated", 3)
                .extensions(NumberRange::to_max(1000));
        })
        .message("FieldOptions", |m| {
            m.field(OPTIONAL, "CType", "ctype", 1)
                .field(OPTIONAL, "bool", "deprecated", 3)
                .enumeration("CType", |e| {
                    e.value("STRING", 0).value("CORD", 1);
                })
                .extensions(NumberRange::to_max(1000));
        })
        .build()
}

fn resource_proto() -> ast::File {
    FileBuilder::new("google/api/resource.proto")
        .package("google.api")
        .import("google/protobuf/descriptor.proto", ImportKind::Normal)
        .extend("google.protobuf.MessageOptions", |e| {
            e.field(OPTIONAL, "ResourceDescriptor", "resource", 1053);
        })
        .extend("google.protobuf.FieldOptions", |e| {
            e.field(OPTIONAL, "ResourceReference", "resource_reference", 1055);
        })
        .message("ResourceDescriptor", |m| {
            m.field(OPTIONAL, "string", "type", 1);
        })
        .message("ResourceReference", |m| {
            m.field(OPTIONAL, "string", "type", 1)
                .field(OPTIONAL, "string", "child_type", 2);
        })
        .build()
}

#[test]
fn duplicate_name() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .message("Foo", |_| {})
            .enumeration("Foo", |e| {
                e.value("A", 0);
            })
            .build()],
        vec![CheckError::DuplicateName {
            name: "Foo".to_owned(),
            first: None,
            second: None,
        }],
    );
}

#[test]
fn duplicate_enum_value_in_enum() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .enumeration("E", |e| {
                e.value("A", 0).value("A", 1);
            })
            .build()],
        vec![CheckError::DuplicateName {
            name: "E.A".to_owned(),
            first: None,
            second: None,
        }],
    );
}

#[test]
fn enum_values_share_enclosing_scope() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .enumeration("E1", |e| {
                e.value("FOO", 0);
            })
            .enumeration("E2", |e| {
                e.value("FOO", 0);
            })
            .build()],
        vec![CheckError::EnumValueConflict {
            name: "FOO".to_owned(),
            first_name: "FOO".to_owned(),
            first: None,
            second: None,
        }],
    );
}

#[test]
fn reserved_name() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .message("Foo", |m| {
                m.reserved_names(&["foo"]).field(OPTIONAL, "int32", "foo", 1);
            })
            .build()],
        vec![CheckError::ReservedName {
            name: "foo".to_owned(),
            span: None,
        }],
    );
}

#[test]
fn field_name_does_not_shadow_type() {
    let mut analyzer = Analyzer::new();
    let id = analyzer.add_file(
        FileBuilder::new("foo.proto")
            .package("pkg")
            .message("Bar", |_| {})
            .message("Foo", |m| {
                m.field(OPTIONAL, "int32", "Bar", 1)
                    .field(OPTIONAL, "Bar", "bar", 2);
            })
            .build(),
    );

    let file = analyzer.file(id).unwrap();
    let reference = Reference::Type {
        file: id,
        scope: file.find("Foo"),
        name: ast::TypeRef::parse("Bar"),
    };
    let expected = DeclRef {
        file: id,
        decl: file.find("Bar").unwrap(),
    };
    assert_eq!(analyzer.resolve(&reference), Some(expected));
    assert_eq!(analyzer.validate(id).unwrap(), Vec::<Diagnostic>::new());
}

#[test]
fn package_relative_lookup() {
    let a = FileBuilder::new("a.proto")
        .package("foo.bar")
        .message("X", |_| {})
        .build();
    let b = FileBuilder::new("b.proto")
        .package("foo.baz")
        .import("a.proto", ImportKind::Normal)
        .message("Y", |m| {
            m.field(OPTIONAL, "bar.X", "x", 1)
                .field(OPTIONAL, ".foo.bar.X", "y", 2);
        })
        .message("Outer", |m| {
            m.message("foo", |_| {})
                .field(OPTIONAL, "foo.bar.X", "z", 1);
        })
        .build();

    assert_errors(
        vec![a, b],
        vec![CheckError::UnresolvedType {
            name: "foo.bar.X".to_owned(),
            span: None,
        }],
    );
}

#[test]
fn unresolved_and_invalid_types() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .service("S", |_| {})
            .message("Foo", |m| {
                m.field(OPTIONAL, "Missing", "a", 1)
                    .field(OPTIONAL, "S", "b", 2)
                    .map_field("double", "string", "c", 3);
            })
            .build()],
        vec![
            CheckError::UnresolvedType {
                name: "Missing".to_owned(),
                span: None,
            },
            CheckError::InvalidTypeKind {
                kind: "field",
                name: "S".to_owned(),
                expected: "a message or enum",
                span: None,
            },
            CheckError::InvalidMapKey {
                name: "double".to_owned(),
                span: None,
            },
        ],
    );
}

#[test]
fn method_types() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .enumeration("E", |e| {
                e.value("A", 0);
            })
            .message("Req", |_| {})
            .service("S", |s| {
                s.method("Get", "Req", "E");
            })
            .build()],
        vec![CheckError::InvalidTypeKind {
            kind: "method output",
            name: "E".to_owned(),
            expected: "a message",
            span: None,
        }],
    );
}

#[test]
fn empty_enum() {
    assert_errors(
        vec![FileBuilder::new("foo.proto").enumeration("E", |_| {}).build()],
        vec![CheckError::EmptyEnum {
            name: "E".to_owned(),
            span: None,
        }],
    );
}

#[test]
fn duplicate_symbol() {
    assert_errors(
        vec![
            FileBuilder::new("a.proto").message("Foo", |_| {}).build(),
            FileBuilder::new("b.proto")
                .import("a.proto", ImportKind::Normal)
                .message("Foo", |_| {})
                .build(),
        ],
        vec![CheckError::DuplicateSymbol {
            name: "Foo".to_owned(),
            file: "a.proto".to_owned(),
            span: None,
        }],
    );
}

#[test]
fn json_name_conflict() {
    let file = || {
        proto3("foo.proto")
            .message("Foo", |m| {
                m.field(None, "int32", "foo_bar", 1)
                    .field(None, "int32", "fooBar", 2);
            })
            .build()
    };

    assert_errors(
        vec![file()],
        vec![CheckError::JsonNameConflict {
            first_name: "foo_bar".to_owned(),
            first_json: "fooBar".to_owned(),
            first: None,
            second_name: "fooBar".to_owned(),
            second_json: "fooBar".to_owned(),
            second: None,
        }],
    );

    let mut analyzer = Analyzer::new();
    analyzer.check_json_names(false);
    assert_eq!(check_with(&mut analyzer, vec![file()]).1, Vec::<Diagnostic>::new());
}

#[test]
fn import_errors() {
    assert_errors(
        vec![
            FileBuilder::new("b.proto").build(),
            FileBuilder::new("a.proto")
                .import("missing.proto", ImportKind::Normal)
                .import("b.proto", ImportKind::Normal)
                .import("b.proto", ImportKind::Public)
                .build(),
        ],
        vec![
            CheckError::UnresolvedImport {
                name: "missing.proto".to_owned(),
                span: None,
            },
            CheckError::DuplicateImport {
                name: "b.proto".to_owned(),
                first: None,
                second: None,
            },
        ],
    );
}

#[test]
fn import_cycle() {
    assert_errors(
        vec![
            FileBuilder::new("b.proto")
                .import("a.proto", ImportKind::Normal)
                .build(),
            FileBuilder::new("a.proto")
                .import("b.proto", ImportKind::Normal)
                .build(),
        ],
        vec![CheckError::ImportCycle {
            cycle: "a.proto -> b.proto -> a.proto".to_owned(),
            span: None,
        }],
    );
}

#[test]
fn duplicate_and_reserved_numbers() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .message("Foo", |m| {
                m.field(OPTIONAL, "int32", "a", 1)
                    .field(OPTIONAL, "int32", "b", 2)
                    .field(OPTIONAL, "int32", "c", 2)
                    .field(OPTIONAL, "int32", "d", 5)
                    .reserved(NumberRange::single(5));
            })
            .build()],
        vec![
            CheckError::DuplicateNumber {
                kind: "field",
                number: 2,
                first_name: "b".to_owned(),
                first: None,
                second: None,
            },
            CheckError::ReservedNumber {
                kind: "field",
                name: "d".to_owned(),
                number: 5,
                span: None,
            },
        ],
    );
}

#[test]
fn invalid_field_numbers() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .message("Foo", |m| {
                m.field(OPTIONAL, "int32", "a", 0)
                    .field(OPTIONAL, "int32", "b", 536_870_912)
                    .field(OPTIONAL, "int32", "c", 19_000)
                    .field(OPTIONAL, "int32", "d", 536_870_911);
            })
            .build()],
        vec![
            CheckError::InvalidNumber {
                kind: "field",
                number: "0".to_owned(),
                min: 1,
                max: MAX_MESSAGE_FIELD_NUMBER,
                span: None,
            },
            CheckError::InvalidNumber {
                kind: "field",
                number: "536870912".to_owned(),
                min: 1,
                max: MAX_MESSAGE_FIELD_NUMBER,
                span: None,
            },
            CheckError::ImplementationReservedNumber {
                number: 19_000,
                span: None,
            },
        ],
    );
}

#[test]
fn invalid_enum_numbers() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .enumeration("E", |e| {
                e.value("A", 0)
                    .value("B", -1)
                    .value("C", 2_147_483_648);
            })
            .build()],
        vec![CheckError::InvalidNumber {
            kind: "enum value",
            number: "2147483648".to_owned(),
            min: -2_147_483_648,
            max: MAX_ENUM_NUMBER,
            span: None,
        }],
    );
}

#[test]
fn enum_alias() {
    let file = |alias: bool| {
        FileBuilder::new("foo.proto")
            .enumeration("E", |e| {
                if alias {
                    e.option(OptionAssign::new("allow_alias", ConstantKind::Bool(true)));
                }
                e.value("A", 0).value("B", 0);
            })
            .build()
    };

    assert_errors(vec![file(true)], vec![]);
    assert_errors(
        vec![file(false)],
        vec![CheckError::DuplicateNumber {
            kind: "enum value",
            number: 0,
            first_name: "A".to_owned(),
            first: None,
            second: None,
        }],
    );
}

#[test]
fn overlapping_reserved_ranges() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .message("Foo", |m| {
                m.reserved(NumberRange::new(1, 5))
                    .reserved(NumberRange::new(3, 8))
                    .reserved(NumberRange::new(9, 10));
            })
            .build()],
        vec![CheckError::OverlappingReservedRange {
            first_range: "1 to 5".to_owned(),
            first: None,
            second_range: "3 to 8".to_owned(),
            second: None,
        }],
    );
}

#[test]
fn extension_ranges() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .message("Foo", |m| {
                m.field(OPTIONAL, "int32", "a", 150)
                    .extensions(NumberRange::new(100, 199))
                    .reserved(NumberRange::new(190, 210));
            })
            .build()],
        vec![
            CheckError::NumberInExtensionRange {
                name: "a".to_owned(),
                number: 150,
                span: None,
            },
            CheckError::OverlappingExtensionRange {
                first_kind: "extension",
                first_range: "100 to 199".to_owned(),
                first: None,
                second_kind: "reserved",
                second_range: "190 to 210".to_owned(),
                second: None,
            },
        ],
    );
}

#[test]
fn malformed_ranges() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .message("Foo", |m| {
                m.reserved(NumberRange::new(10, 5)).reserved(NumberRange {
                    bounds: vec![Int::new(1), Int::new(2), Int::new(3)],
                    max: false,
                });
            })
            .build()],
        vec![
            CheckError::InvalidRange { span: None },
            CheckError::UnexpectedShape {
                what: "reserved range",
                bounds: 3,
                span: None,
            },
        ],
    );
}

#[test]
fn extension_number_not_declared() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .message("Foo", |m| {
                m.extensions(NumberRange::new(100, 199));
            })
            .extend("Foo", |e| {
                e.field(OPTIONAL, "int32", "bar", 300)
                    .field(OPTIONAL, "int32", "baz", 150);
            })
            .build()],
        vec![CheckError::ExtensionNumberNotDeclared {
            number: 300,
            message_name: "Foo".to_owned(),
            span: None,
        }],
    );
}

#[test]
fn required_in_proto3() {
    assert_eq!(
        rules(vec![proto3("foo.proto")
            .message("Foo", |m| {
                m.field(Some(Label::Required), "int32", "a", 1);
            })
            .build()]),
        vec!["required-label-forbidden"]
    );
}

#[test]
fn oneof_label_in_proto3() {
    assert_eq!(
        rules(vec![proto3("foo.proto")
            .message("Foo", |m| {
                m.oneof("choice", |o| {
                    o.field(OPTIONAL, "int32", "a", 1);
                });
            })
            .build()]),
        vec!["oneof-label-forbidden"]
    );
}

#[test]
fn required_oneof_member_in_proto3() {
    assert_eq!(
        rules(vec![proto3("foo.proto")
            .message("Foo", |m| {
                m.oneof("choice", |o| {
                    o.field(Some(Label::Required), "int32", "a", 1);
                });
            })
            .build()]),
        vec!["oneof-label-forbidden"]
    );
}

#[test]
fn group_in_proto3() {
    assert_eq!(
        rules(vec![proto3("foo.proto")
            .message("Foo", |m| {
                m.group(OPTIONAL, "Result", 1, |_| {});
            })
            .build()]),
        vec!["group-forbidden"]
    );
}

#[test]
fn extension_in_proto3() {
    assert_eq!(
        rules(vec![proto3("foo.proto")
            .message("Foo", |_| {})
            .extend("Foo", |_| {})
            .build()]),
        vec!["extension-forbidden"]
    );

    assert_eq!(
        rules(vec![
            descriptor_proto(),
            proto3("foo.proto")
                .import("google/protobuf/descriptor.proto", ImportKind::Normal)
                .extend("google.protobuf.FieldOptions", |e| {
                    e.field(None, "string", "my_option", 50000);
                })
                .build(),
        ]),
        Vec::<&str>::new()
    );
}

#[test]
fn weak_import_in_proto3() {
    assert_eq!(
        rules(vec![proto3("foo.proto")
            .import("missing.proto", ImportKind::Weak)
            .build()]),
        vec!["weak-import-forbidden"]
    );
}

#[test]
fn default_in_proto3() {
    assert_eq!(
        rules(vec![proto3("foo.proto")
            .message("Foo", |m| {
                m.field(None, "int32", "a", 1)
                    .with_option(OptionAssign::new("default", ConstantKind::int(5)));
            })
            .build()]),
        vec!["default-option-forbidden"]
    );
}

#[test]
fn enum_zero_in_proto3() {
    let file = |first: i64, second: i64| {
        proto3("foo.proto")
            .enumeration("E", |e| {
                e.value("A", first).value("B", second);
            })
            .build()
    };

    assert_eq!(rules(vec![file(0, 1)]), Vec::<&str>::new());
    assert_eq!(rules(vec![file(1, 2)]), vec!["enum-zero-required"]);

    let (_, diagnostics) = check(vec![file(1, 0)]);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule(), "enum-zero-not-first");
    assert_eq!(diagnostics[0].severity(), Severity::Warning);
    assert_eq!(
        diagnostics[0].message(),
        "the first value of enum 'E' should be numbered zero in proto3, but 'A' is not"
    );
}

#[test]
fn empty_enum_in_proto3() {
    let mut found = rules(vec![proto3("foo.proto").enumeration("E", |_| {}).build()]);
    found.sort_unstable();
    assert_eq!(found, vec!["empty-enum", "enum-zero-required"]);
}

#[test]
fn proto2_enum_in_proto3() {
    let (_, diagnostics) = check(vec![
        FileBuilder::new("a.proto")
            .enumeration("Color", |e| {
                e.value("RED", 0);
            })
            .build(),
        proto3("b.proto")
            .import("a.proto", ImportKind::Normal)
            .message("Foo", |m| {
                m.field(None, "Color", "color", 1);
            })
            .build(),
    ]);

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule(), "cross-version-enum-forbidden");
    assert_eq!(
        diagnostics[0].message(),
        "enum 'Color' is defined in proto2 file 'a.proto' and cannot be used in proto3"
    );
}

#[test]
fn extension_range_in_proto3() {
    assert_eq!(
        rules(vec![proto3("foo.proto")
            .message("Foo", |m| {
                m.extensions(NumberRange::new(100, 199));
            })
            .build()]),
        vec!["extension-range-forbidden"]
    );
}

#[test]
fn proto2_has_no_rules() {
    assert_eq!(
        rules(vec![FileBuilder::new("foo.proto")
            .import("missing.proto", ImportKind::Weak)
            .message("Foo", |m| {
                m.field(Some(Label::Required), "int32", "a", 1)
                    .group(OPTIONAL, "Result", 2, |_| {})
                    .extensions(NumberRange::new(100, 199));
            })
            .build()]),
        Vec::<&str>::new()
    );
}

#[test]
fn builtin_options() {
    let file = |option: OptionAssign| {
        FileBuilder::new("foo.proto")
            .import("google/protobuf/descriptor.proto", ImportKind::Normal)
            .message("Foo", |m| {
                m.field(OPTIONAL, "int32", "a", 1).with_option(option);
            })
            .build()
    };

    assert_errors(
        vec![
            descriptor_proto(),
            file(OptionAssign::new("foo", ConstantKind::int(1))),
        ],
        vec![CheckError::UnknownOption {
            name: "foo".to_owned(),
            namespace: "google.protobuf.FieldOptions".to_owned(),
            span: None,
        }],
    );
    assert_errors(
        vec![
            descriptor_proto(),
            file(OptionAssign::new("deprecated", ConstantKind::string("yes"))),
        ],
        vec![CheckError::ValueTypeMismatch {
            field: "google.protobuf.FieldOptions.deprecated".to_owned(),
            expected: "a bool".to_owned(),
            actual: "\"yes\"".to_owned(),
            span: None,
        }],
    );
    assert_errors(
        vec![
            descriptor_proto(),
            file(OptionAssign::new("ctype", ConstantKind::ident("BOGUS"))),
        ],
        vec![CheckError::UnknownEnumValue {
            value_name: "BOGUS".to_owned(),
            enum_name: "google.protobuf.FieldOptions.CType".to_owned(),
            span: None,
        }],
    );
    assert_errors(
        vec![
            descriptor_proto(),
            file(OptionAssign::new("ctype", ConstantKind::ident("CORD"))),
        ],
        vec![],
    );
}

#[test]
fn options_without_descriptor() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .message("Foo", |m| {
                m.field(OPTIONAL, "int32", "a", 1)
                    .with_option(OptionAssign::new("foo", ConstantKind::int(1)))
                    .with_option(OptionAssign::new("(my.opt)", ConstantKind::int(1)));
            })
            .build()],
        vec![CheckError::UnresolvedOption {
            name: "my.opt".to_owned(),
            span: None,
        }],
    );
}

fn custom_option_file(option: OptionAssign) -> ast::File {
    FileBuilder::new("foo.proto")
        .import("google/protobuf/descriptor.proto", ImportKind::Normal)
        .message("Info", |m| {
            m.field(OPTIONAL, "string", "name", 1)
                .field(OPTIONAL, "uint32", "count", 2);
        })
        .extend("google.protobuf.MessageOptions", |e| {
            e.field(OPTIONAL, "Info", "info", 50000);
        })
        .message("Foo", |m| {
            m.option(option);
        })
        .build()
}

#[test]
fn custom_message_option() {
    let value = ConstantKind::message([
        ("name", ConstantKind::string("x")),
        ("count", ConstantKind::int(-1)),
        ("bogus", ConstantKind::int(1)),
    ]);
    assert_errors(
        vec![
            descriptor_proto(),
            custom_option_file(OptionAssign::new("(info)", value)),
        ],
        vec![
            CheckError::ValueOutOfRange {
                field: "Info.count".to_owned(),
                ty: "uint32",
                min: "0".to_owned(),
                max: "4294967295".to_owned(),
                span: None,
            },
            CheckError::UnknownFieldName {
                name: "bogus".to_owned(),
                message: "Info".to_owned(),
                span: None,
            },
        ],
    );

    assert_errors(
        vec![
            descriptor_proto(),
            custom_option_file(OptionAssign::new("(info).count", ConstantKind::int(7))),
        ],
        vec![],
    );
    assert_errors(
        vec![
            descriptor_proto(),
            custom_option_file(OptionAssign::new("(info).name.x", ConstantKind::string("y"))),
        ],
        vec![CheckError::OptionScalarFieldAccess { span: None }],
    );
}

#[test]
fn default_values() {
    assert_errors(
        vec![FileBuilder::new("foo.proto")
            .enumeration("Color", |e| {
                e.value("RED", 0);
            })
            .message("Foo", |m| {
                m.field(OPTIONAL, "int32", "a", 1)
                    .with_option(OptionAssign::new("default", ConstantKind::string("x")))
                    .field(OPTIONAL, "int32", "b", 2)
                    .with_option(OptionAssign::new("default", ConstantKind::int(3_000_000_000)))
                    .field(OPTIONAL, "Color", "c", 3)
                    .with_option(OptionAssign::new("default", ConstantKind::ident("PURPLE")))
                    .field(OPTIONAL, "bool", "d", 4)
                    .with_option(OptionAssign::new("default", ConstantKind::Bool(true)))
                    .field(OPTIONAL, "double", "e", 5)
                    .with_option(OptionAssign::new("default", ConstantKind::ident("inf")));
            })
            .build()],
        vec![
            CheckError::ValueTypeMismatch {
                field: "Foo.a".to_owned(),
                expected: "an integer".to_owned(),
                actual: "\"x\"".to_owned(),
                span: None,
            },
            CheckError::ValueOutOfRange {
                field: "Foo.b".to_owned(),
                ty: "int32",
                min: "-2147483648".to_owned(),
                max: "2147483647".to_owned(),
                span: None,
            },
            CheckError::UnknownEnumValue {
                value_name: "PURPLE".to_owned(),
                enum_name: "Color".to_owned(),
                span: None,
            },
        ],
    );
}

fn library_proto() -> ast::File {
    let resource = ConstantKind::message([(
        "type",
        ConstantKind::string("library.googleapis.com/Book"),
    )]);
    let shelf = ConstantKind::message([(
        "type",
        ConstantKind::string("library.googleapis.com/Shelf"),
    )]);

    FileBuilder::new("library.proto")
        .package("library")
        .import("google/protobuf/descriptor.proto", ImportKind::Normal)
        .import("google/api/resource.proto", ImportKind::Normal)
        .message("Book", |m| {
            m.option(OptionAssign::new("(google.api.resource)", resource));
        })
        .message("GetBookRequest", |m| {
            m.field(OPTIONAL, "string", "name", 1)
                .with_option(OptionAssign::new(
                    "(google.api.resource_reference).type",
                    ConstantKind::string("library.googleapis.com/Book"),
                ))
                .field(OPTIONAL, "string", "shelf", 2)
                .with_option(OptionAssign::new("(google.api.resource_reference)", shelf))
                .field(OPTIONAL, "string", "any", 3)
                .with_option(OptionAssign::new(
                    "(google.api.resource_reference).child_type",
                    ConstantKind::string("*"),
                ));
        })
        .build()
}

#[test]
fn resource_names() {
    let files = || vec![descriptor_proto(), resource_proto(), library_proto()];

    assert_errors(files(), vec![]);

    let mut analyzer = Analyzer::new();
    analyzer.register_resolver(ResourceNameResolver::new());
    let (id, diagnostics) = check_with(&mut analyzer, files());
    let expected = vec![Diagnostic::from_check(
        id,
        CheckError::UnresolvedResourceName {
            value: "library.googleapis.com/Shelf".to_owned(),
            span: None,
        },
    )];
    assert_eq!(diagnostics, expected);

    let book = analyzer.file(id).unwrap().find("Book").unwrap();
    let reference = Reference::Value {
        file: id,
        scope: None,
        option: ast::QualifiedName::parse("google.api.resource_reference"),
        path: vec!["type".to_owned()],
        value: "library.googleapis.com/Book".to_owned(),
    };
    assert_eq!(
        analyzer.resolve(&reference),
        Some(DeclRef { file: id, decl: book })
    );
}

#[test]
fn resource_names_with_relative_option_names() {
    let resource = |ty: &str| ConstantKind::message([("type", ConstantKind::string(ty))]);
    let library = FileBuilder::new("library.proto")
        .package("google.api.library")
        .import("google/protobuf/descriptor.proto", ImportKind::Normal)
        .import("google/api/resource.proto", ImportKind::Normal)
        .message("Book", |m| {
            m.option(OptionAssign::new(
                "(resource)",
                resource("library.googleapis.com/Book"),
            ));
        })
        .message("Shelf", |m| {
            m.option(OptionAssign::new(
                "(api.resource)",
                resource("library.googleapis.com/Shelf"),
            ));
        })
        .message("GetBookRequest", |m| {
            m.field(OPTIONAL, "string", "name", 1)
                .with_option(OptionAssign::new(
                    "(resource_reference).type",
                    ConstantKind::string("library.googleapis.com/Book"),
                ))
                .field(OPTIONAL, "string", "shelf", 2)
                .with_option(OptionAssign::new(
                    "(api.resource_reference).type",
                    ConstantKind::string("library.googleapis.com/Shelf"),
                ));
        })
        .build();

    let mut analyzer = Analyzer::new();
    analyzer.register_resolver(ResourceNameResolver::new());
    let (id, diagnostics) = check_with(
        &mut analyzer,
        vec![descriptor_proto(), resource_proto(), library],
    );
    assert_eq!(diagnostics, Vec::<Diagnostic>::new());

    let shelf = analyzer.file(id).unwrap().find("Shelf").unwrap();
    let reference = Reference::Value {
        file: id,
        scope: None,
        option: ast::QualifiedName::parse("google.api.resource_reference"),
        path: vec!["type".to_owned()],
        value: "library.googleapis.com/Shelf".to_owned(),
    };
    assert_eq!(
        analyzer.resolve(&reference),
        Some(DeclRef { file: id, decl: shelf })
    );
}

#[test]
fn diagnostics_sorted_by_span() {
    let (_, diagnostics) = check(vec![FileBuilder::new("foo.proto")
        .message("Foo", |m| {
            m.field(OPTIONAL, "int32", "x", 5)
                .with_span(0..5)
                .field(OPTIONAL, "int32", "a", 1)
                .with_span(30..40)
                .field(OPTIONAL, "int32", "b", 1)
                .with_span(10..20)
                .reserved(NumberRange::single(5));
        })
        .enumeration("E", |_| {})
        .build()]);

    let found: Vec<(&str, Option<ast::Span>)> = diagnostics
        .iter()
        .map(|diagnostic| (diagnostic.rule(), diagnostic.span()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("empty-enum", None),
            ("reserved-number", Some(0..5)),
            ("duplicate-number", Some(10..20)),
        ]
    );
}
