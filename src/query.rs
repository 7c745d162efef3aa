//! Read accessors for generator collaborators.
//!
//! Everything downstream of the parser recovers per-route metadata through
//! this surface; absence is always a `None`/`false` result, never an error.
//! Callers decide whether a missing value is fatal.

use crate::model::{Annotation, ApiSpec, Method, Route, Type};
use std::collections::BTreeSet;

/// Value of `property` in the first annotation block named `block`.
///
/// A flag property yields `Some("")`: present, no value. A missing block
/// or property yields `None`.
pub fn annotation_value<'a>(
    annotations: &'a [Annotation],
    block: &str,
    property: &str,
) -> Option<&'a str> {
    let annotation = annotations.iter().find(|a| a.name == block)?;
    annotation.properties.get(property).map(|v| v.trim())
}

/// Look up `key` in a backtick tag such as `json:"name,optional" path:"id"`.
///
/// Returns the raw quoted value (`name,optional`). Escapes inside the
/// quotes are not interpreted.
pub fn tag_lookup<'a>(tag: &'a str, key: &str) -> Option<&'a str> {
    let mut rest = tag.trim();
    while !rest.is_empty() {
        let colon = rest.find(':')?;
        let k = rest[..colon].trim();
        let after = rest[colon + 1..].strip_prefix('"')?;
        let end = after.find('"')?;
        if k == key {
            return Some(&after[..end]);
        }
        rest = after[end + 1..].trim_start();
    }
    None
}

/// Wire field name for `key`: the first comma-field of the tag value.
pub fn wire_name<'a>(tag: &'a str, key: &str) -> Option<&'a str> {
    tag_lookup(tag, key).and_then(|v| v.split(',').next())
}

/// True when the tag value for `key` carries an `optional` flag after the
/// wire name.
pub fn is_optional(tag: &str, key: &str) -> bool {
    match tag_lookup(tag, key) {
        Some(v) => v.split(',').skip(1).any(|f| f.trim().starts_with("optional")),
        None => false,
    }
}

/// Transitive closure of the request and response types of a route,
/// following member references, each declared type once, discovery order.
pub fn route_types<'a>(spec: &'a ApiSpec, route: &Route) -> (Vec<&'a Type>, Vec<&'a Type>) {
    (
        type_closure(spec, &route.request_type),
        type_closure(spec, &route.response_type),
    )
}

/// Breadth-first closure from one root type name. Unknown names are
/// skipped (the validator has already rejected dangling roots; member-level
/// danglers only warn). Cycles terminate.
pub fn type_closure<'a>(spec: &'a ApiSpec, root: &str) -> Vec<&'a Type> {
    let mut out = Vec::new();
    if root.is_empty() {
        return out;
    }
    let mut queue = vec![root];
    let mut seen = vec![root];
    let mut at = 0;
    while at < queue.len() {
        let name = queue[at];
        at += 1;
        let Some(t) = spec.find_type(name) else {
            continue;
        };
        out.push(t);
        for member in &t.members {
            for reference in member.ty.named_refs() {
                if !seen.contains(&reference) {
                    seen.push(reference);
                    queue.push(reference);
                }
            }
        }
    }
    out
}

/// Deterministic per-route symbol shared by file-naming schemes:
/// `get /users/:id` becomes `getUsersWithId`.
pub fn route_func_name(method: Method, path: &str) -> String {
    let path = path.replace('/', "_").replace('-', "_").replace(':', "With_");
    format!("{}{}", method.keyword(), camel(&path))
}

fn camel(s: &str) -> String {
    let mut out = String::new();
    for part in s.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Distinct auth configuration names across all groups (`server.jwt` and
/// `server.signature`), sorted.
pub fn auth_names(spec: &ApiSpec) -> Vec<String> {
    let mut names = BTreeSet::new();
    for group in &spec.service.groups {
        for property in ["jwt", "signature"] {
            if let Some(v) = annotation_value(&group.annotations, "server", property) {
                if !v.is_empty() {
                    names.insert(v.to_string());
                }
            }
        }
    }
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn annotation_value_round_trips() {
        let spec = parse_str(
            "service Demo {\n\t@doc(summary: \"List users\")\n\t@server(handler: listHandler, folder: \"admin\")\n\tget /users\n}\n",
        )
        .unwrap();
        let route = spec.service.routes().next().unwrap();
        assert_eq!(
            annotation_value(&route.annotations, "doc", "summary"),
            Some("List users")
        );
        assert_eq!(
            annotation_value(&route.annotations, "server", "folder"),
            Some("admin")
        );
        assert_eq!(annotation_value(&route.annotations, "server", "missing"), None);
        assert_eq!(annotation_value(&route.annotations, "nope", "x"), None);
    }

    #[test]
    fn tag_lookup_finds_each_key() {
        let tag = r#"json:"name,optional" path:"id""#;
        assert_eq!(tag_lookup(tag, "json"), Some("name,optional"));
        assert_eq!(tag_lookup(tag, "path"), Some("id"));
        assert_eq!(tag_lookup(tag, "form"), None);
    }

    #[test]
    fn wire_name_and_optional_flag() {
        let tag = r#"json:"name,optional""#;
        assert_eq!(wire_name(tag, "json"), Some("name"));
        assert!(is_optional(tag, "json"));
        assert!(!is_optional(r#"json:"name""#, "json"));
    }

    #[test]
    fn closure_follows_nested_references() {
        let src = "type Inner struct {\n}\ntype Outer struct {\n\tItems []Inner `json:\"items\"`\n}\nservice Demo {\n\tget /outer returns (Outer)\n}\n";
        let spec = parse_str(src).unwrap();
        let route = spec.service.routes().next().unwrap();
        let (req, resp) = route_types(&spec, route);
        assert!(req.is_empty());
        let names: Vec<_> = resp.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Outer", "Inner"]);
    }

    #[test]
    fn closure_terminates_on_cycles() {
        let src = "type A struct {\n\tNext *B `json:\"next\"`\n}\ntype B struct {\n\tBack *A `json:\"back\"`\n}\nservice Demo {\n\tget /a returns (A)\n}\n";
        let spec = parse_str(src).unwrap();
        let names: Vec<_> = type_closure(&spec, "A").iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn func_names_are_deterministic() {
        assert_eq!(route_func_name(Method::Get, "/users/:id"), "getUsersWithId");
        assert_eq!(route_func_name(Method::Post, "/sign-in"), "postSignIn");
        assert_eq!(route_func_name(Method::Get, "/"), "get");
    }

    #[test]
    fn auth_names_collects_distinct_sorted() {
        let src = "service Demo {\n\t@server(jwt: Zeta)\n\tgroup {\n\t\tget /a\n\t}\n\t@server(jwt: Alpha, signature: Zeta)\n\tgroup {\n\t\tget /b\n\t}\n}\n";
        let spec = parse_str(src).unwrap();
        assert_eq!(auth_names(&spec), vec!["Alpha", "Zeta"]);
    }
}
