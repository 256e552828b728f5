//! Language-version rules, kept as a static table.
//!
//! Each rule applies to one kind of node in files of one syntax. Rules are independent of each
//! other, so every matching rule runs on every node and all hits are reported.

use super::Context;
use crate::{
    ast::{self, DeclId, DeclKind, FieldType, ImportKind, Label, Span, Syntax},
    diagnostic::{Diagnostic, Diagnostics, Severity},
};

/// The messages that proto3 files may extend.
pub(crate) const OPTIONS_MESSAGES: &[&str] = &[
    "google.protobuf.FileOptions",
    "google.protobuf.MessageOptions",
    "google.protobuf.FieldOptions",
    "google.protobuf.OneofOptions",
    "google.protobuf.EnumOptions",
    "google.protobuf.EnumValueOptions",
    "google.protobuf.ServiceOptions",
    "google.protobuf.MethodOptions",
    "google.protobuf.ExtensionRangeOptions",
];

pub(crate) struct Rule {
    pub name: &'static str,
    pub syntax: Syntax,
    pub node: NodeKind,
    pub severity: Severity,
    /// The message, with `{key}` placeholders filled from the hit's arguments.
    pub message: &'static str,
    pub check: fn(&Context<'_>, Node<'_>) -> Option<Hit>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Import,
    Field,
    Group,
    Extend,
    Enum,
    ExtensionRange,
    FieldType,
    Option,
}

#[derive(Debug, Copy, Clone)]
pub(crate) enum Node<'a> {
    Import(&'a ast::Import),
    Decl(DeclId, &'a ast::Decl),
    /// A named type used by a field.
    FieldType(DeclId, &'a ast::TypeRef),
    Option(DeclId, &'a ast::OptionAssign),
}

#[derive(Debug)]
pub(crate) struct Hit {
    span: Option<Span>,
    args: Vec<(&'static str, String)>,
}

pub(crate) static RULES: &[Rule] = &[
    Rule {
        name: "required-label-forbidden",
        syntax: Syntax::Proto3,
        node: NodeKind::Field,
        severity: Severity::Error,
        message: "required fields are not allowed in proto3",
        check: required_label,
    },
    Rule {
        name: "oneof-label-forbidden",
        syntax: Syntax::Proto3,
        node: NodeKind::Field,
        severity: Severity::Error,
        message: "fields in oneof '{oneof}' must not have a label",
        check: oneof_label,
    },
    Rule {
        name: "group-forbidden",
        syntax: Syntax::Proto3,
        node: NodeKind::Group,
        severity: Severity::Error,
        message: "groups are not supported in proto3",
        check: group,
    },
    Rule {
        name: "extension-forbidden",
        syntax: Syntax::Proto3,
        node: NodeKind::Extend,
        severity: Severity::Error,
        message: "extensions in proto3 are only allowed for custom options, but '{extendee}' is not an options message",
        check: extension,
    },
    Rule {
        name: "weak-import-forbidden",
        syntax: Syntax::Proto3,
        node: NodeKind::Import,
        severity: Severity::Error,
        message: "weak imports are not supported in proto3",
        check: weak_import,
    },
    Rule {
        name: "default-option-forbidden",
        syntax: Syntax::Proto3,
        node: NodeKind::Option,
        severity: Severity::Error,
        message: "explicit default values are not allowed in proto3",
        check: default_option,
    },
    Rule {
        name: "enum-zero-required",
        syntax: Syntax::Proto3,
        node: NodeKind::Enum,
        severity: Severity::Error,
        message: "enum '{name}' must contain a value numbered zero in proto3",
        check: enum_zero_required,
    },
    Rule {
        name: "enum-zero-not-first",
        syntax: Syntax::Proto3,
        node: NodeKind::Enum,
        severity: Severity::Warning,
        message: "the first value of enum '{name}' should be numbered zero in proto3, but '{value}' is not",
        check: enum_zero_not_first,
    },
    Rule {
        name: "cross-version-enum-forbidden",
        syntax: Syntax::Proto3,
        node: NodeKind::FieldType,
        severity: Severity::Error,
        message: "enum '{name}' is defined in proto2 file '{file}' and cannot be used in proto3",
        check: cross_version_enum,
    },
    Rule {
        name: "extension-range-forbidden",
        syntax: Syntax::Proto3,
        node: NodeKind::ExtensionRange,
        severity: Severity::Error,
        message: "extension ranges are not supported in proto3",
        check: extension_range,
    },
];

/// Runs every rule for the file's syntax over every node of the file.
pub(crate) fn evaluate(cx: &Context<'_>, sink: &mut Diagnostics) {
    let syntax = cx.ast().syntax();
    let rules: Vec<&Rule> = RULES.iter().filter(|rule| rule.syntax == syntax).collect();
    if rules.is_empty() {
        tracing::trace!(file = cx.ast().name(), %syntax, "no rules for syntax");
        return;
    }

    for_each_node(cx.ast(), |node| {
        let Some(kind) = node.kind() else {
            return;
        };
        for rule in rules.iter().filter(|rule| rule.node == kind) {
            if let Some(hit) = (rule.check)(cx, node) {
                let message = render(rule.message, &hit.args);
                sink.push(Diagnostic::new(
                    sink.file(),
                    rule.name,
                    rule.severity,
                    message,
                    hit.span,
                ));
            }
        }
    });
}

fn for_each_node<'a>(file: &'a ast::File, mut f: impl FnMut(Node<'a>)) {
    for import in file.imports() {
        f(Node::Import(import));
    }
    for id in file.walk() {
        let decl = file.decl(id);
        f(Node::Decl(id, decl));
        if let DeclKind::Field(field) = &decl.kind {
            let mut types = vec![&field.ty];
            while let Some(ty) = types.pop() {
                match ty {
                    FieldType::Scalar(_) => {}
                    FieldType::Named(name) => f(Node::FieldType(id, name)),
                    FieldType::Map { key, value } => types.extend([&**value, &**key]),
                }
            }
        }
        for option in &decl.options {
            f(Node::Option(id, option));
        }
    }
}

fn render(template: &str, args: &[(&'static str, String)]) -> String {
    let mut message = template.to_owned();
    for (key, value) in args {
        message = message.replace(&format!("{{{}}}", key), value);
    }
    message
}

impl<'a> Node<'a> {
    fn kind(&self) -> Option<NodeKind> {
        match self {
            Node::Import(_) => Some(NodeKind::Import),
            Node::FieldType(..) => Some(NodeKind::FieldType),
            Node::Option(..) => Some(NodeKind::Option),
            Node::Decl(_, decl) => match decl.kind {
                DeclKind::Field(_) => Some(NodeKind::Field),
                DeclKind::Group(_) => Some(NodeKind::Group),
                DeclKind::Extend(_) => Some(NodeKind::Extend),
                DeclKind::Enum => Some(NodeKind::Enum),
                DeclKind::ExtensionRange(_) => Some(NodeKind::ExtensionRange),
                _ => None,
            },
        }
    }
}

impl Hit {
    fn new(span: Option<Span>) -> Self {
        Hit {
            span,
            args: Vec::new(),
        }
    }

    fn arg(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.args.push((key, value.into()));
        self
    }
}

fn required_label(cx: &Context<'_>, node: Node<'_>) -> Option<Hit> {
    let Node::Decl(id, decl) = node else {
        return None;
    };
    if decl.label() != Some(Label::Required) {
        return None;
    }
    // Oneof members are reported by `oneof-label-forbidden` instead.
    if let Some(parent) = cx.ast().parent(id) {
        if matches!(cx.ast().decl(parent).kind, DeclKind::Oneof) {
            return None;
        }
    }
    Some(Hit::new(decl.span.clone()))
}

fn oneof_label(cx: &Context<'_>, node: Node<'_>) -> Option<Hit> {
    let Node::Decl(id, decl) = node else {
        return None;
    };
    decl.label()?;
    let parent = cx.ast().decl(cx.ast().parent(id)?);
    if !matches!(parent.kind, DeclKind::Oneof) {
        return None;
    }
    Some(Hit::new(decl.span.clone()).arg("oneof", parent.name().unwrap_or_default()))
}

fn group(_: &Context<'_>, node: Node<'_>) -> Option<Hit> {
    let Node::Decl(_, decl) = node else {
        return None;
    };
    Some(Hit::new(decl.span.clone()))
}

fn extension(cx: &Context<'_>, node: Node<'_>) -> Option<Hit> {
    let Node::Decl(id, decl) = node else {
        return None;
    };
    let DeclKind::Extend(extend) = &decl.kind else {
        return None;
    };
    let full_name = match cx
        .analyzer
        .resolve_type(cx.id, cx.ast().parent(id), &extend.extendee)
    {
        Some(target) => cx.analyzer.full_name(target),
        None => extend.extendee.name.to_string(),
    };
    if OPTIONS_MESSAGES.contains(&full_name.as_str()) {
        return None;
    }
    let span = extend.extendee.span.clone().or_else(|| decl.span.clone());
    Some(Hit::new(span).arg("extendee", extend.extendee.to_string()))
}

fn weak_import(_: &Context<'_>, node: Node<'_>) -> Option<Hit> {
    match node {
        Node::Import(import) if import.kind == ImportKind::Weak => {
            Some(Hit::new(import.span.clone()))
        }
        _ => None,
    }
}

fn default_option(cx: &Context<'_>, node: Node<'_>) -> Option<Hit> {
    let Node::Option(id, option) = node else {
        return None;
    };
    let is_field = matches!(cx.ast().decl(id).kind, DeclKind::Field(_) | DeclKind::Group(_));
    (is_field && option.is_named("default")).then(|| Hit::new(option.span()))
}

/// The numbers of an enum's values, in declaration order.
fn enum_numbers<'a>(cx: &Context<'a>, decl: &'a ast::Decl) -> Vec<(Option<i64>, &'a ast::Decl)> {
    decl.children
        .iter()
        .map(|&child| cx.ast().decl(child))
        .filter_map(|value| match &value.kind {
            DeclKind::EnumValue(number) => Some((number.number.to_i64(), value)),
            _ => None,
        })
        .collect()
}

fn enum_zero_required(cx: &Context<'_>, node: Node<'_>) -> Option<Hit> {
    let Node::Decl(_, decl) = node else {
        return None;
    };
    if enum_numbers(cx, decl).iter().any(|&(number, _)| number == Some(0)) {
        return None;
    }
    Some(Hit::new(decl.name_span()).arg("name", decl.name().unwrap_or_default()))
}

fn enum_zero_not_first(cx: &Context<'_>, node: Node<'_>) -> Option<Hit> {
    let Node::Decl(_, decl) = node else {
        return None;
    };
    let numbers = enum_numbers(cx, decl);
    let (&(first_number, first), rest) = numbers.split_first()?;
    if first_number == Some(0) || !rest.iter().any(|&(number, _)| number == Some(0)) {
        return None;
    }
    Some(
        Hit::new(first.name_span())
            .arg("name", decl.name().unwrap_or_default())
            .arg("value", first.name().unwrap_or_default()),
    )
}

fn cross_version_enum(cx: &Context<'_>, node: Node<'_>) -> Option<Hit> {
    let Node::FieldType(id, ty) = node else {
        return None;
    };
    let target = cx.analyzer.lookup(cx.id, cx.ast().parent(id), ty, super::Want::Type)?;
    let file = cx.analyzer.files.get(target.file)?;
    let decl = file.ast.get(target.decl)?;
    if !matches!(decl.kind, DeclKind::Enum) || file.ast.syntax() != Syntax::Proto2 {
        return None;
    }
    let span = ty.span.clone().or_else(|| cx.ast().decl(id).span.clone());
    Some(
        Hit::new(span)
            .arg("name", file.ast.full_name(target.decl).to_string())
            .arg("file", file.ast.name()),
    )
}

fn extension_range(_: &Context<'_>, node: Node<'_>) -> Option<Hit> {
    let Node::Decl(_, decl) = node else {
        return None;
    };
    Some(Hit::new(decl.span.clone()))
}
