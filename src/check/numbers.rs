use std::{
    hash::{Hash, Hasher},
    mem,
    ops::RangeInclusive,
    sync::Arc,
};

use rustc_hash::FxHasher;

use super::{
    names::numbered_members, source_span, CheckError, Context, MAX_ENUM_NUMBER,
    MAX_MESSAGE_FIELD_NUMBER,
};
use crate::{
    ast::{self, DeclId, DeclKind, NumberRange},
    inversion_list::InversionList,
};

const IMPLEMENTATION_RESERVED_NUMBERS: RangeInclusive<i64> = 19_000..=19_999;

/// The kind of container a [`NumberSpace`] belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SpaceKind {
    /// A message or group body: field numbers from 1 to 536870911.
    Message,
    /// An enum: any `int32` value.
    Enum,
    /// An `extend` block: the numbers its fields take in the extended message.
    Extend,
}

/// An inclusive range of numbers declared by a `reserved` or `extensions` statement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    /// The first number in the range.
    pub start: i64,
    /// The last number in the range.
    pub end: i64,
    /// The declaration of the range.
    pub decl: DeclId,
}

/// The numbers used and reserved by a single container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberSpace {
    kind: SpaceKind,
    occupied: Vec<(i64, DeclId)>,
    reserved: Vec<Interval>,
    extensions: Vec<Interval>,
}

/// A cached number space together with the findings that only depend on the container
/// itself.
#[derive(Debug)]
pub(crate) struct NumberCheck {
    pub space: Arc<NumberSpace>,
    pub errors: Vec<CheckError>,
}

/// Everything in a container that affects its [`NumberCheck`].
///
/// The hash comes first so that comparing two keys usually stops there. Equal hashes still
/// compare the parts.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct NumberKey {
    hash: u64,
    parts: KeyParts,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct KeyParts {
    kind: mem::Discriminant<DeclKind>,
    name: Option<ast::Ident>,
    allow_alias: bool,
    members: Vec<(DeclId, Option<ast::Ident>, Option<ast::Int>, Option<ast::Span>)>,
    ranges: Vec<(DeclId, mem::Discriminant<DeclKind>, NumberRange, Option<ast::Span>)>,
}

impl Interval {
    /// Returns `true` if `number` lies within this range.
    pub fn contains(&self, number: i64) -> bool {
        self.start <= number && number <= self.end
    }

    /// Returns `true` if the two ranges share at least one number.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl NumberSpace {
    /// The kind of container.
    pub fn kind(&self) -> SpaceKind {
        self.kind
    }

    /// Each number in use, with the declaration using it, in declaration order.
    pub fn occupied(&self) -> &[(i64, DeclId)] {
        &self.occupied
    }

    /// The reserved ranges, in declaration order.
    pub fn reserved(&self) -> &[Interval] {
        &self.reserved
    }

    /// The extension ranges, in declaration order. Always empty for enums.
    pub fn extensions(&self) -> &[Interval] {
        &self.extensions
    }

    /// The smallest valid number in this space.
    pub fn min(&self) -> i64 {
        match self.kind {
            SpaceKind::Message | SpaceKind::Extend => 1,
            SpaceKind::Enum => i64::from(i32::MIN),
        }
    }

    /// The largest valid number in this space, which is also the value of `max` in ranges.
    pub fn max(&self) -> i64 {
        space_max(self.kind)
    }

    /// Returns `true` if `number` is valid, unused, not reserved and not in an extension range.
    pub fn is_free(&self, number: i64) -> bool {
        (self.min()..=self.max()).contains(&number)
            && !(self.kind != SpaceKind::Enum && IMPLEMENTATION_RESERVED_NUMBERS.contains(&number))
            && !self.occupied.iter().any(|&(used, _)| used == number)
            && !self.reserved.iter().any(|range| range.contains(number))
            && !self.extensions.iter().any(|range| range.contains(number))
    }

    /// The smallest free number, starting from 1 for messages and 0 for enums.
    pub fn next_free(&self) -> Option<i64> {
        let mut taken: Vec<(i64, i64)> = self
            .occupied
            .iter()
            .map(|&(number, _)| (number, number))
            .chain(self.reserved.iter().map(|range| (range.start, range.end)))
            .chain(self.extensions.iter().map(|range| (range.start, range.end)))
            .collect();
        if self.kind != SpaceKind::Enum {
            taken.push((
                *IMPLEMENTATION_RESERVED_NUMBERS.start(),
                *IMPLEMENTATION_RESERVED_NUMBERS.end(),
            ));
        }
        taken.sort_unstable();

        let mut candidate = match self.kind {
            SpaceKind::Enum => 0,
            SpaceKind::Message | SpaceKind::Extend => 1,
        };
        for (start, end) in taken {
            if start > candidate {
                break;
            }
            if end >= candidate {
                candidate = end.saturating_add(1);
            }
        }
        (candidate <= self.max()).then_some(candidate)
    }
}

fn space_max(kind: SpaceKind) -> i64 {
    match kind {
        SpaceKind::Message | SpaceKind::Extend => MAX_MESSAGE_FIELD_NUMBER,
        SpaceKind::Enum => MAX_ENUM_NUMBER,
    }
}

pub(crate) fn space_kind(kind: &DeclKind) -> Option<SpaceKind> {
    match kind {
        DeclKind::Message | DeclKind::Group(_) => Some(SpaceKind::Message),
        DeclKind::Enum => Some(SpaceKind::Enum),
        DeclKind::Extend(_) => Some(SpaceKind::Extend),
        _ => None,
    }
}

fn allows_alias(decl: &ast::Decl) -> bool {
    decl.option("allow_alias")
        .and_then(|option| option.value.kind.as_bool())
        .unwrap_or(false)
}

/// Captures the parts of `container` that [`collect`] reads.
pub(crate) fn key(file: &ast::File, container: DeclId) -> NumberKey {
    let decl = file.decl(container);
    let members = numbered_members(file, container)
        .into_iter()
        .map(|member| {
            let member_decl = file.decl(member);
            (
                member,
                member_decl.name.clone(),
                member_decl.number().cloned(),
                member_decl.span.clone(),
            )
        })
        .collect();
    let ranges = decl
        .children
        .iter()
        .filter_map(|&child| {
            let child_decl = file.decl(child);
            match &child_decl.kind {
                DeclKind::ReservedRange(range) | DeclKind::ExtensionRange(range) => Some((
                    child,
                    mem::discriminant(&child_decl.kind),
                    range.clone(),
                    child_decl.span.clone(),
                )),
                _ => None,
            }
        })
        .collect();

    let parts = KeyParts {
        kind: mem::discriminant(&decl.kind),
        name: decl.name.clone(),
        allow_alias: allows_alias(decl),
        members,
        ranges,
    };
    let mut hasher = FxHasher::default();
    parts.hash(&mut hasher);
    NumberKey {
        hash: hasher.finish(),
        parts,
    }
}

#[cfg(test)]
impl NumberKey {
    /// Keeps these parts but takes the hash of `other`.
    pub(crate) fn colliding_with(self, other: &NumberKey) -> Self {
        NumberKey {
            hash: other.hash,
            ..self
        }
    }
}

/// Builds the number space of `container` and runs the checks that only depend on it.
pub(crate) fn collect(file: &ast::File, container: DeclId) -> Option<NumberCheck> {
    let decl = file.decl(container);
    let kind = space_kind(&decl.kind)?;
    let max = space_max(kind);
    let (member_kind, min) = match kind {
        SpaceKind::Message | SpaceKind::Extend => ("field", 1),
        SpaceKind::Enum => ("enum value", i64::from(i32::MIN)),
    };

    let mut space = NumberSpace {
        kind,
        occupied: Vec::new(),
        reserved: Vec::new(),
        extensions: Vec::new(),
    };
    let mut errors = Vec::new();

    for member in numbered_members(file, container) {
        let member_decl = file.decl(member);
        let Some(number) = member_decl.number() else {
            continue;
        };
        let span = number.span.clone().or_else(|| member_decl.span.clone());
        match number.to_i64() {
            Some(value) if (min..=max).contains(&value) => {
                if kind != SpaceKind::Enum && IMPLEMENTATION_RESERVED_NUMBERS.contains(&value) {
                    errors.push(CheckError::ImplementationReservedNumber {
                        number: value,
                        span: source_span(span),
                    });
                }
                space.occupied.push((value, member));
            }
            value => {
                errors.push(CheckError::InvalidNumber {
                    kind: member_kind,
                    number: number.to_string(),
                    min,
                    max,
                    span: source_span(span),
                });
                if let Some(value) = value {
                    space.occupied.push((value, member));
                }
            }
        }
    }

    for &child in &decl.children {
        let child_decl = file.decl(child);
        let (range, what, intervals) = match &child_decl.kind {
            DeclKind::ReservedRange(range) => (range, "reserved range", &mut space.reserved),
            DeclKind::ExtensionRange(range) => (range, "extension range", &mut space.extensions),
            _ => continue,
        };
        if let Some(interval) = range_interval(range, child, what, child_decl, max, &mut errors) {
            intervals.push(interval);
        }
    }

    check_space(file, &space, allows_alias(decl), &mut errors);

    Some(NumberCheck {
        space: Arc::new(space),
        errors,
    })
}

fn range_interval(
    range: &NumberRange,
    id: DeclId,
    what: &'static str,
    decl: &ast::Decl,
    max: i64,
    errors: &mut Vec<CheckError>,
) -> Option<Interval> {
    match range.interval(max) {
        None => {
            tracing::warn!(bounds = range.bounds.len(), max = range.max, "malformed {}", what);
            errors.push(CheckError::UnexpectedShape {
                what,
                bounds: range.bounds.len(),
                span: source_span(decl.span.clone()),
            });
            None
        }
        Some((start, end)) if start > end => {
            errors.push(CheckError::InvalidRange {
                span: source_span(decl.span.clone()),
            });
            None
        }
        Some((start, end)) => Some(Interval {
            start,
            end,
            decl: id,
        }),
    }
}

fn check_space(
    file: &ast::File,
    space: &NumberSpace,
    allow_alias: bool,
    errors: &mut Vec<CheckError>,
) {
    let member_kind = match space.kind {
        SpaceKind::Message | SpaceKind::Extend => "field",
        SpaceKind::Enum => "enum value",
    };
    let name = |id: DeclId| file.decl(id).name().unwrap_or_default().to_owned();
    let number_span = |id: DeclId| {
        let decl = file.decl(id);
        source_span(
            decl.number()
                .and_then(|number| number.span.clone())
                .or_else(|| decl.span.clone()),
        )
    };
    let range_span = |interval: &Interval| source_span(file.decl(interval.decl).span.clone());

    if !(space.kind == SpaceKind::Enum && allow_alias) {
        let mut sorted: Vec<usize> = (0..space.occupied.len()).collect();
        sorted.sort_by_key(|&index| (space.occupied[index].0, index));
        let mut first = 0;
        for position in 1..sorted.len() {
            let (number, earlier) = space.occupied[sorted[first]];
            let (later_number, later) = space.occupied[sorted[position]];
            if later_number == number {
                errors.push(CheckError::DuplicateNumber {
                    kind: member_kind,
                    number,
                    first_name: name(earlier),
                    first: number_span(earlier),
                    second: number_span(later),
                });
            } else {
                first = position;
            }
        }
    }

    let reserved = InversionList::new(space.reserved.iter().map(|range| (range.start, range.end)));
    let extensions =
        InversionList::new(space.extensions.iter().map(|range| (range.start, range.end)));
    for &(number, id) in &space.occupied {
        if !reserved.is_empty() && reserved.contains(number) {
            errors.push(CheckError::ReservedNumber {
                kind: member_kind,
                name: name(id),
                number,
                span: number_span(id),
            });
        }
        if space.kind == SpaceKind::Message
            && !extensions.is_empty()
            && extensions.contains(number)
        {
            errors.push(CheckError::NumberInExtensionRange {
                name: name(id),
                number,
                span: number_span(id),
            });
        }
    }

    for (first, second) in overlapping_pairs(&space.reserved) {
        let (first, second) = (&space.reserved[first], &space.reserved[second]);
        errors.push(CheckError::OverlappingReservedRange {
            first_range: fmt_interval(first),
            first: range_span(first),
            second_range: fmt_interval(second),
            second: range_span(second),
        });
    }

    if !space.extensions.is_empty() {
        let ranges: Vec<(Interval, &'static str)> = space
            .reserved
            .iter()
            .map(|&range| (range, "reserved"))
            .chain(space.extensions.iter().map(|&range| (range, "extension")))
            .collect();
        let intervals: Vec<Interval> = ranges.iter().map(|&(range, _)| range).collect();
        for (first, second) in overlapping_pairs(&intervals) {
            let (first, first_kind) = ranges[first];
            let (second, second_kind) = ranges[second];
            if first_kind == "reserved" && second_kind == "reserved" {
                continue;
            }
            let ((first, first_kind), (second, second_kind)) = if first.decl <= second.decl {
                ((first, first_kind), (second, second_kind))
            } else {
                ((second, second_kind), (first, first_kind))
            };
            errors.push(CheckError::OverlappingExtensionRange {
                first_kind,
                first_range: fmt_interval(&first),
                first: range_span(&first),
                second_kind,
                second_range: fmt_interval(&second),
                second: range_span(&second),
            });
        }
    }
}

/// Finds every pair of overlapping intervals by sorting on the start and sweeping. Pairs are
/// returned as `(i, j)` with `i < j`, sorted.
pub(crate) fn overlapping_pairs(intervals: &[Interval]) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (0..intervals.len()).collect();
    order.sort_by_key(|&index| (intervals[index].start, index));

    let mut pairs = Vec::new();
    for (position, &index) in order.iter().enumerate() {
        let end = intervals[index].end;
        for &other in &order[position + 1..] {
            if intervals[other].start > end {
                break;
            }
            pairs.push((index.min(other), index.max(other)));
        }
    }
    pairs.sort_unstable();
    pairs
}

fn fmt_interval(interval: &Interval) -> String {
    if interval.start == interval.end {
        interval.start.to_string()
    } else {
        format!("{} to {}", interval.start, interval.end)
    }
}

impl<'a> Context<'a> {
    /// Reports numbering problems in every message, enum and extend block of the file.
    pub(super) fn check_numbers(&mut self) {
        let file = self.ast();
        for id in file.walk() {
            let Some(kind) = space_kind(&file.decl(id).kind) else {
                continue;
            };
            if let Some(check) = self.analyzer.number_check(self.id, id) {
                self.errors.extend(check.errors.iter().cloned());
            }
            if kind == SpaceKind::Extend {
                self.check_extension_numbers(id);
            }
        }
    }

    /// Checks that every field of an extend block uses a number the extendee declares as an
    /// extension number.
    fn check_extension_numbers(&mut self, id: DeclId) {
        let file = self.ast();
        let DeclKind::Extend(extend) = &file.decl(id).kind else {
            return;
        };
        let Some(target) = self
            .analyzer
            .resolve_type(self.id, file.parent(id), &extend.extendee)
        else {
            return;
        };
        if !self
            .analyzer
            .decl(target)
            .map_or(false, |decl| decl.kind.is_message())
        {
            return;
        }
        let Some(check) = self.analyzer.number_check(target.file, target.decl) else {
            return;
        };

        let ranges = InversionList::new(
            check
                .space
                .extensions()
                .iter()
                .map(|range| (range.start, range.end)),
        );
        let message_name = self.analyzer.full_name(target);
        for member in numbered_members(file, id) {
            let member_decl = file.decl(member);
            let Some(number) = member_decl.number() else {
                continue;
            };
            let Some(value) = number.to_i64() else {
                continue;
            };
            if (1..=MAX_MESSAGE_FIELD_NUMBER).contains(&value) && !ranges.contains(value) {
                self.add_error(CheckError::ExtensionNumberNotDeclared {
                    number: value,
                    message_name: message_name.clone(),
                    span: source_span(number.span.clone().or_else(|| member_decl.span.clone())),
                });
            }
        }
    }
}
