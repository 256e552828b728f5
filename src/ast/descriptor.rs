use std::collections::{HashMap, HashSet};

use prost_types::{
    field_descriptor_proto::{Label as ProtoLabel, Type},
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    ServiceDescriptorProto, UninterpretedOption,
};

use super::*;

/// The exclusive end used by descriptors for ranges written as `to max`.
const MESSAGE_RANGE_END: i32 = 536_870_912;

type NestedTypes<'a> = HashMap<&'a str, &'a DescriptorProto>;

impl File {
    /// Rebuilds a declaration tree from a compiled file descriptor.
    ///
    /// Map entry messages are folded back into `map<K, V>` field types, group messages into
    /// group declarations and synthetic oneofs into `optional` labels. Extensions are grouped
    /// into one `extend` block per extendee. Descriptors carry no locations, so no spans are
    /// set, and options are only available where they were left uninterpreted.
    pub fn from_file_descriptor_proto(proto: &FileDescriptorProto) -> Self {
        let syntax = Syntax::parse(proto.syntax()).unwrap_or_default();
        let mut file = File {
            name: proto.name().to_owned(),
            syntax,
            package: QualifiedName::parse(proto.package()),
            ..Default::default()
        };

        file.imports = proto
            .dependency
            .iter()
            .enumerate()
            .map(|(index, path)| {
                let index = index as i32;
                let kind = if proto.public_dependency.contains(&index) {
                    ImportKind::Public
                } else if proto.weak_dependency.contains(&index) {
                    ImportKind::Weak
                } else {
                    ImportKind::Normal
                };
                Import {
                    path: path.clone(),
                    kind,
                    span: None,
                }
            })
            .collect();

        if let Some(options) = &proto.options {
            file.options = uninterpreted(&options.uninterpreted_option);
        }

        let top_level: NestedTypes = proto
            .message_type
            .iter()
            .map(|message| (message.name(), message))
            .collect();
        let groups = group_type_names(&proto.extension);

        let mut converter = Converter {
            file: &mut file,
            syntax,
        };
        for message in &proto.message_type {
            if !groups.contains(message.name()) {
                converter.add_message(None, message);
            }
        }
        for enumeration in &proto.enum_type {
            converter.add_enum(None, enumeration);
        }
        for service in &proto.service {
            converter.add_service(service);
        }
        converter.add_extensions(None, &proto.extension, &top_level);

        file
    }
}

struct Converter<'a> {
    file: &'a mut File,
    syntax: Syntax,
}

impl<'a> Converter<'a> {
    fn add_message(&mut self, parent: Option<DeclId>, message: &DescriptorProto) -> DeclId {
        let id = self
            .file
            .push(parent, Decl::new(Some(message.name()), DeclKind::Message));
        self.add_message_body(id, message);
        id
    }

    fn add_message_body(&mut self, id: DeclId, message: &DescriptorProto) {
        if let Some(options) = &message.options {
            self.file.decls[id.index()]
                .options
                .extend(uninterpreted(&options.uninterpreted_option));
        }

        let nested: NestedTypes = message
            .nested_type
            .iter()
            .map(|nested| (nested.name(), nested))
            .collect();
        let mut groups = group_type_names(&message.field);
        groups.extend(group_type_names(&message.extension));

        let synthetic: HashSet<i32> = message
            .field
            .iter()
            .filter(|field| field.proto3_optional())
            .filter_map(|field| field.oneof_index)
            .collect();
        let mut oneofs: Vec<Option<DeclId>> = vec![None; message.oneof_decl.len()];

        for field in &message.field {
            let oneof = field
                .oneof_index
                .filter(|index| !synthetic.contains(index))
                .and_then(|index| usize::try_from(index).ok())
                .filter(|&index| index < oneofs.len());
            let parent = match oneof {
                Some(index) => *oneofs[index]
                    .get_or_insert_with(|| self.add_oneof(id, message, index)),
                None => id,
            };
            self.add_field(parent, field, &nested, oneof.is_some());
        }
        for (index, oneof) in oneofs.iter_mut().enumerate() {
            let index_i32 = index as i32;
            if oneof.is_none() && !synthetic.contains(&index_i32) {
                *oneof = Some(self.add_oneof(id, message, index));
            }
        }

        for nested_type in &message.nested_type {
            if !groups.contains(nested_type.name()) && !is_map_entry(nested_type) {
                self.add_message(Some(id), nested_type);
            }
        }
        for enumeration in &message.enum_type {
            self.add_enum(Some(id), enumeration);
        }
        self.add_extensions(Some(id), &message.extension, &nested);

        for range in &message.extension_range {
            let decl = self.file.push(
                Some(id),
                Decl::new(
                    None,
                    DeclKind::ExtensionRange(message_range(range.start(), range.end())),
                ),
            );
            if let Some(options) = &range.options {
                self.file.decls[decl.index()]
                    .options
                    .extend(uninterpreted(&options.uninterpreted_option));
            }
        }
        for range in &message.reserved_range {
            self.file.push(
                Some(id),
                Decl::new(
                    None,
                    DeclKind::ReservedRange(message_range(range.start(), range.end())),
                ),
            );
        }
        for name in &message.reserved_name {
            self.file
                .push(Some(id), Decl::new(Some(name), DeclKind::ReservedName));
        }
    }

    fn add_oneof(&mut self, message_id: DeclId, message: &DescriptorProto, index: usize) -> DeclId {
        let oneof = &message.oneof_decl[index];
        let mut decl = Decl::new(Some(oneof.name()), DeclKind::Oneof);
        if let Some(options) = &oneof.options {
            decl.options = uninterpreted(&options.uninterpreted_option);
        }
        self.file.push(Some(message_id), decl)
    }

    fn add_field(
        &mut self,
        parent: DeclId,
        field: &FieldDescriptorProto,
        nested: &NestedTypes,
        in_oneof: bool,
    ) {
        let number = Int::new(field.number().into());
        let label = self.label(field, in_oneof);

        if field.r#type.is_some() && field.r#type() == Type::Group {
            let body = nested.get(last_segment(field.type_name())).copied();
            let name = body.map_or(field.name(), |body| body.name());
            let mut decl = Decl::new(Some(name), DeclKind::Group(Group { label, number }));
            if let Some(options) = &field.options {
                decl.options = uninterpreted(&options.uninterpreted_option);
            }
            let id = self.file.push(Some(parent), decl);
            if let Some(body) = body {
                self.add_message_body(id, body);
            }
            return;
        }

        let ty = field_type(field, nested);
        let label = match ty {
            FieldType::Map { .. } => None,
            _ => label,
        };
        let mut decl = Decl::new(Some(field.name()), DeclKind::Field(Field { label, ty, number }));
        if let Some(default) = &field.default_value {
            if let DeclKind::Field(Field { ty, .. }) = &decl.kind {
                let value = default_value(ty, default);
                decl.options.push(OptionAssign::new("default", value));
            }
        }
        if let Some(options) = &field.options {
            decl.options
                .extend(uninterpreted(&options.uninterpreted_option));
        }
        self.file.push(Some(parent), decl);
    }

    fn label(&self, field: &FieldDescriptorProto, in_oneof: bool) -> Option<Label> {
        if field.label.is_none() || in_oneof {
            return None;
        }
        match field.label() {
            ProtoLabel::Required => Some(Label::Required),
            ProtoLabel::Repeated => Some(Label::Repeated),
            ProtoLabel::Optional => match self.syntax {
                Syntax::Proto2 => Some(Label::Optional),
                Syntax::Proto3 if field.proto3_optional() => Some(Label::Optional),
                Syntax::Proto3 => None,
            },
        }
    }

    fn add_extensions(
        &mut self,
        parent: Option<DeclId>,
        extensions: &[FieldDescriptorProto],
        nested: &NestedTypes,
    ) {
        let mut blocks: Vec<(&str, DeclId)> = Vec::new();
        for field in extensions {
            let extendee = field.extendee();
            let block = match blocks.iter().find(|(name, _)| *name == extendee) {
                Some(&(_, block)) => block,
                None => {
                    let block = self.file.push(
                        parent,
                        Decl::new(
                            None,
                            DeclKind::Extend(Extend {
                                extendee: TypeRef::parse(extendee),
                            }),
                        ),
                    );
                    blocks.push((extendee, block));
                    block
                }
            };
            self.add_field(block, field, nested, false);
        }
    }

    fn add_enum(&mut self, parent: Option<DeclId>, enumeration: &EnumDescriptorProto) {
        let mut decl = Decl::new(Some(enumeration.name()), DeclKind::Enum);
        if let Some(options) = &enumeration.options {
            if options.allow_alias() {
                decl.options
                    .push(OptionAssign::new("allow_alias", ConstantKind::Bool(true)));
            }
            decl.options
                .extend(uninterpreted(&options.uninterpreted_option));
        }
        let id = self.file.push(parent, decl);

        for value in &enumeration.value {
            let mut decl = Decl::new(
                Some(value.name()),
                DeclKind::EnumValue(EnumValue {
                    number: Int::new(value.number().into()),
                }),
            );
            if let Some(options) = &value.options {
                decl.options = uninterpreted(&options.uninterpreted_option);
            }
            self.file.push(Some(id), decl);
        }
        for range in &enumeration.reserved_range {
            let (start, end) = (i64::from(range.start()), i64::from(range.end()));
            let range = if start == end {
                NumberRange::single(start)
            } else {
                NumberRange::new(start, end)
            };
            self.file
                .push(Some(id), Decl::new(None, DeclKind::ReservedRange(range)));
        }
        for name in &enumeration.reserved_name {
            self.file
                .push(Some(id), Decl::new(Some(name), DeclKind::ReservedName));
        }
    }

    fn add_service(&mut self, service: &ServiceDescriptorProto) {
        let mut decl = Decl::new(Some(service.name()), DeclKind::Service);
        if let Some(options) = &service.options {
            decl.options = uninterpreted(&options.uninterpreted_option);
        }
        let id = self.file.push(None, decl);

        for method in &service.method {
            let mut decl = Decl::new(
                Some(method.name()),
                DeclKind::Method(Method {
                    input: TypeRef::parse(method.input_type()),
                    output: TypeRef::parse(method.output_type()),
                    client_streaming: method.client_streaming(),
                    server_streaming: method.server_streaming(),
                }),
            );
            if let Some(options) = &method.options {
                decl.options = uninterpreted(&options.uninterpreted_option);
            }
            self.file.push(Some(id), decl);
        }
    }
}

fn group_type_names(fields: &[FieldDescriptorProto]) -> HashSet<&str> {
    fields
        .iter()
        .filter(|field| field.r#type.is_some() && field.r#type() == Type::Group)
        .map(|field| last_segment(field.type_name()))
        .collect()
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    message
        .options
        .as_ref()
        .map_or(false, |options| options.map_entry())
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn field_type(field: &FieldDescriptorProto, nested: &NestedTypes) -> FieldType {
    if field.r#type.is_none() {
        return named_type(field, nested);
    }

    let scalar = match field.r#type() {
        Type::Message | Type::Enum | Type::Group => return named_type(field, nested),
        Type::Double => ScalarType::Double,
        Type::Float => ScalarType::Float,
        Type::Int64 => ScalarType::Int64,
        Type::Uint64 => ScalarType::Uint64,
        Type::Int32 => ScalarType::Int32,
        Type::Fixed64 => ScalarType::Fixed64,
        Type::Fixed32 => ScalarType::Fixed32,
        Type::Bool => ScalarType::Bool,
        Type::String => ScalarType::String,
        Type::Bytes => ScalarType::Bytes,
        Type::Uint32 => ScalarType::Uint32,
        Type::Sfixed32 => ScalarType::Sfixed32,
        Type::Sfixed64 => ScalarType::Sfixed64,
        Type::Sint32 => ScalarType::Sint32,
        Type::Sint64 => ScalarType::Sint64,
    };
    FieldType::Scalar(scalar)
}

fn named_type(field: &FieldDescriptorProto, nested: &NestedTypes) -> FieldType {
    let entry = nested
        .get(last_segment(field.type_name()))
        .filter(|entry| is_map_entry(entry));
    if let Some(entry) = entry {
        let key = entry.field.iter().find(|field| field.number() == 1);
        let value = entry.field.iter().find(|field| field.number() == 2);
        if let (Some(key), Some(value)) = (key, value) {
            return FieldType::Map {
                key: Box::new(field_type(key, nested)),
                value: Box::new(field_type(value, nested)),
            };
        }
    }
    FieldType::Named(TypeRef::parse(field.type_name()))
}

fn message_range(start: i32, end: i32) -> NumberRange {
    let start = i64::from(start);
    if end == MESSAGE_RANGE_END {
        NumberRange::to_max(start)
    } else if i64::from(end) - 1 == start {
        NumberRange::single(start)
    } else {
        NumberRange::new(start, i64::from(end) - 1)
    }
}

fn default_value(ty: &FieldType, value: &str) -> ConstantKind {
    match ty {
        FieldType::Scalar(ScalarType::Bool) => ConstantKind::Bool(value == "true"),
        FieldType::Scalar(ScalarType::String | ScalarType::Bytes) => {
            ConstantKind::String(value.to_owned())
        }
        FieldType::Scalar(ScalarType::Float | ScalarType::Double) => match value {
            "inf" => ConstantKind::Float(f64::INFINITY),
            "-inf" => ConstantKind::Float(f64::NEG_INFINITY),
            "nan" => ConstantKind::Float(f64::NAN),
            _ => value
                .parse()
                .map(ConstantKind::Float)
                .unwrap_or_else(|_| ConstantKind::String(value.to_owned())),
        },
        FieldType::Scalar(_) => {
            let (negative, digits) = match value.strip_prefix('-') {
                Some(digits) => (true, digits),
                None => (false, value),
            };
            digits
                .parse()
                .map(|value| ConstantKind::Int { negative, value })
                .unwrap_or_else(|_| ConstantKind::String(value.to_owned()))
        }
        FieldType::Named(_) | FieldType::Map { .. } => ConstantKind::Ident(value.to_owned()),
    }
}

fn uninterpreted(options: &[UninterpretedOption]) -> Vec<OptionAssign> {
    options
        .iter()
        .map(|option| OptionAssign {
            name: option
                .name
                .iter()
                .map(|part| {
                    if part.is_extension {
                        OptionNamePart::Extension(TypeRef::parse(&part.name_part))
                    } else {
                        OptionNamePart::Ident(Ident::new(part.name_part.clone()))
                    }
                })
                .collect(),
            value: Constant::new(uninterpreted_value(option)),
            span: None,
        })
        .collect()
}

fn uninterpreted_value(option: &UninterpretedOption) -> ConstantKind {
    if let Some(ident) = &option.identifier_value {
        match ident.as_str() {
            "true" => ConstantKind::Bool(true),
            "false" => ConstantKind::Bool(false),
            "inf" => ConstantKind::Float(f64::INFINITY),
            "nan" => ConstantKind::Float(f64::NAN),
            _ => ConstantKind::Ident(ident.clone()),
        }
    } else if let Some(value) = option.positive_int_value {
        ConstantKind::Int {
            negative: false,
            value,
        }
    } else if let Some(value) = option.negative_int_value {
        ConstantKind::int(value)
    } else if let Some(value) = option.double_value {
        ConstantKind::Float(value)
    } else if let Some(value) = &option.string_value {
        ConstantKind::String(String::from_utf8_lossy(value).into_owned())
    } else {
        ConstantKind::Aggregate(option.aggregate_value().to_owned())
    }
}
