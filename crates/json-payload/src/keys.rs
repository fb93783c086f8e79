//! Payload key resolution.
//!
//! Record fields are declared in snake_case. Payloads produced by
//! camelCase/PascalCase-emitting callers are accepted by matching keys
//! case-insensitively against the PascalCase rendering of the field name.

use serde_json::{Map, Value};

/// Render a snake_case name in PascalCase.
///
/// ```
/// assert_eq!(json_payload::to_pascal_case("my_other_variable"), "MyOtherVariable");
/// ```
pub fn to_pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in name.split('_').filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Render a camelCase or PascalCase name in snake_case.
///
/// Runs of capitals are kept together: `HTTPCode` becomes `http_code`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                Some(_) => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether a payload key addresses the given field.
///
/// Exact match, or a case-insensitive match against the PascalCase form.
pub fn key_matches_field(key: &str, field: &str) -> bool {
    key == field || key.eq_ignore_ascii_case(&to_pascal_case(field))
}

/// Look up the payload entry for a field. An exact key wins over a
/// case-insensitive PascalCase one.
pub fn find_key<'m>(map: &'m Map<String, Value>, field: &str) -> Option<(&'m String, &'m Value)> {
    if let Some(entry) = map.get_key_value(field) {
        return Some(entry);
    }
    let pascal = to_pascal_case(field);
    map.iter().find(|(key, _)| key.eq_ignore_ascii_case(&pascal))
}
