/// The default JSON name of a field, as used by the proto3 JSON mapping: each character
/// following an underscore is uppercased and the underscores are dropped.
pub(crate) fn to_json_name(name: &str) -> String {
    let mut parts = name.split('_');
    let mut result = parts.next().unwrap_or_default().to_owned();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            result.push(first.to_ascii_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}

/// The key under which two field names are considered to conflict in JSON.
pub(crate) fn to_lower_without_underscores(name: &str) -> String {
    name.chars()
        .filter(|&ch| ch != '_')
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// The implicit field name of a group, such as `result` for `group Result = 1 { ... }`.
pub(crate) fn group_field_name(type_name: &str) -> String {
    type_name.to_ascii_lowercase()
}

#[test]
fn json_names() {
    assert_eq!(to_json_name("foo_bar"), "fooBar");
    assert_eq!(to_json_name("foo__bar_"), "fooBar");
    assert_eq!(to_json_name("_foo"), "Foo");
    assert_eq!(to_json_name("FooBar"), "FooBar");
    assert_eq!(to_lower_without_underscores("Foo_Bar"), "foobar");
    assert_eq!(
        to_lower_without_underscores("foo_bar"),
        to_lower_without_underscores("fooBar")
    );
    assert_eq!(group_field_name("SearchResult"), "searchresult");
}
