//! Post-parse consistency checks and annotation enrichment.
//!
//! Validation runs once over the fully assembled specification; enrichment
//! copies the well-known `doc`/`server` annotation values onto routes and
//! groups only after every check has passed.

use crate::error::{Error, Result, Warning};
use crate::model::ApiSpec;
use crate::query;
use std::collections::HashMap;
use std::path::PathBuf;

/// Validate, then enrich. Called by every parse entry point.
pub fn finalize(spec: &mut ApiSpec) -> Result<()> {
    validate(spec)?;
    enrich(spec);
    Ok(())
}

/// The fatal checks: duplicate type names, duplicate route paths, dangling
/// request/response type references.
pub fn validate(spec: &ApiSpec) -> Result<()> {
    let mut seen_types: HashMap<&str, usize> = HashMap::new();
    for t in &spec.types {
        if let Some(first) = seen_types.insert(&t.name, t.line) {
            return Err(Error::DuplicateType {
                name: t.name.clone(),
                first,
                second: t.line,
            });
        }
    }

    // The collision key is the path alone; generated file names derive
    // from the path, so two methods on one path still collide.
    let mut seen_paths: HashMap<&str, usize> = HashMap::new();
    for route in spec.service.routes() {
        if let Some(first) = seen_paths.insert(&route.path, route.line) {
            return Err(Error::DuplicateRoute {
                path: route.path.clone(),
                first,
                second: route.line,
            });
        }
    }

    for route in spec.service.routes() {
        for name in [&route.request_type, &route.response_type] {
            if !name.is_empty() && spec.find_type(name).is_none() {
                return Err(Error::UnknownTypeRef {
                    method: route.method.keyword().to_string(),
                    path: route.path.clone(),
                    type_name: name.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Non-fatal findings: authoring mistakes that do not block generation.
pub fn warnings(spec: &ApiSpec) -> Vec<Warning> {
    let mut out = Vec::new();

    for (i, group) in spec.service.groups.iter().enumerate() {
        for name in duplicate_names(group.annotations.iter().map(|a| a.name.as_str())) {
            out.push(Warning::new(format!(
                "group {}: duplicate @{name} annotation, only the first is used",
                i + 1
            )));
        }
        for route in &group.routes {
            for name in duplicate_names(route.annotations.iter().map(|a| a.name.as_str())) {
                out.push(Warning::new(format!(
                    "route `{} {}`: duplicate @{name} annotation, only the first is used",
                    route.method, route.path
                )));
            }
        }
    }

    for t in &spec.types {
        for member in &t.members {
            for name in member.ty.named_refs() {
                if spec.find_type(name).is_none() {
                    out.push(Warning::new(format!(
                        "type {}: member {} references undeclared type {name:?}",
                        t.name, member.name
                    )));
                }
            }
        }
    }

    out
}

fn duplicate_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    let mut dups = Vec::new();
    for name in names {
        if seen.contains(&name) {
            if !dups.contains(&name) {
                dups.push(name);
            }
        } else {
            seen.push(name);
        }
    }
    dups
}

/// Copy `doc.summary`/`doc.desc` onto each route and `server.desc`/
/// `server.jwt` onto each group. The flattened route view is a projection
/// over the groups, so one pass covers both views.
pub fn enrich(spec: &mut ApiSpec) {
    for group in &mut spec.service.groups {
        if let Some(desc) = query::annotation_value(&group.annotations, "server", "desc") {
            group.desc = desc.to_string();
        }
        if let Some(jwt) = query::annotation_value(&group.annotations, "server", "jwt") {
            group.jwt = Some(jwt.to_string());
        }
        for route in &mut group.routes {
            if let Some(summary) = query::annotation_value(&route.annotations, "doc", "summary") {
                route.summary = summary.to_string();
            }
            if let Some(desc) = query::annotation_value(&route.annotations, "doc", "desc") {
                route.desc = desc.to_string();
            }
        }
    }
}

/// Directory-mode aggregate pass: the same type name or route path in two
/// different files is fatal and names both files.
pub fn validate_aggregate(files: &[(PathBuf, ApiSpec)]) -> Result<()> {
    let mut seen_types: HashMap<&str, &PathBuf> = HashMap::new();
    let mut seen_paths: HashMap<&str, &PathBuf> = HashMap::new();

    for (path, spec) in files {
        for t in &spec.types {
            if let Some(first) = seen_types.insert(&t.name, path) {
                return Err(Error::CrossFileDuplicateType {
                    name: t.name.clone(),
                    first: first.display().to_string(),
                    second: path.display().to_string(),
                });
            }
        }
        for route in spec.service.routes() {
            if let Some(first) = seen_paths.insert(&route.path, path) {
                return Err(Error::CrossFileDuplicateRoute {
                    path: route.path.clone(),
                    first: first.display().to_string(),
                    second: path.display().to_string(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn duplicate_type_reports_both_lines() {
        let src = "type User struct {\n}\ntype User struct {\n}\n";
        let err = parse_str(src).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("lines 1 and 3"), "{msg}");
    }

    #[test]
    fn single_declaration_passes() {
        let src = "type User struct {\n}\n";
        assert!(parse_str(src).is_ok());
    }

    #[test]
    fn duplicate_path_ignores_method() {
        let src = "service Demo {\n\tget /users\n\tpost /users\n}\n";
        let err = parse_str(src).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateRoute { ref path, first: 2, second: 3 } if path == "/users"
        ));
    }

    #[test]
    fn dangling_reference_is_fatal_empty_is_not() {
        let ok = "type User struct {\n}\nservice Demo {\n\tget /users returns (User)\n\tget /ping\n}\n";
        assert!(parse_str(ok).is_ok());

        let bad = "service Demo {\n\tget /users (Ghost)\n}\n";
        let err = parse_str(bad).unwrap_err();
        assert!(matches!(err, Error::UnknownTypeRef { ref type_name, .. } if type_name == "Ghost"));
    }

    #[test]
    fn enrichment_fills_both_views() {
        let src = "service Demo {\n\t@doc(summary: \"List users\", desc: \"Everything\")\n\tget /users\n\t@server(desc: \"admin\", jwt: Auth)\n\tgroup {\n\t\tget /admin\n\t}\n}\n";
        let spec = parse_str(src).unwrap();

        let flat: Vec<_> = spec.service.routes().collect();
        assert_eq!(flat[0].summary, "List users");
        assert_eq!(flat[0].desc, "Everything");
        assert_eq!(spec.service.groups[0].routes[0].summary, "List users");

        let admin = &spec.service.groups[1];
        assert_eq!(admin.desc, "admin");
        assert_eq!(admin.jwt.as_deref(), Some("Auth"));
    }

    #[test]
    fn jwt_flag_without_value_still_switches_auth_on() {
        let src = "service Demo {\n\t@server(jwt)\n\tgroup {\n\t\tget /admin\n\t}\n}\n";
        let spec = parse_str(src).unwrap();
        assert_eq!(spec.service.groups[0].jwt.as_deref(), Some(""));
    }

    #[test]
    fn duplicate_annotation_warns() {
        let src = "service Demo {\n\t@doc(summary: a)\n\t@doc(summary: b)\n\tget /users\n}\n";
        let spec = parse_str(src).unwrap();
        let w = warnings(&spec);
        assert_eq!(w.len(), 1);
        assert!(w[0].message.contains("duplicate @doc"), "{}", w[0]);
        // First block wins at the accessor.
        assert_eq!(spec.service.routes().next().unwrap().summary, "a");
    }

    #[test]
    fn unresolved_member_reference_warns_but_parses() {
        let src = "type T struct {\n\tOther *Missing\n}\n";
        let spec = parse_str(src).unwrap();
        let w = warnings(&spec);
        assert_eq!(w.len(), 1);
        assert!(w[0].message.contains("Missing"), "{}", w[0]);
    }

    #[test]
    fn aggregate_allows_disjoint_files() {
        let a = parse_str("type A struct {\n}\nservice S1 {\n\tget /a\n}\n").unwrap();
        let b = parse_str("type B struct {\n}\nservice S2 {\n\tget /b\n}\n").unwrap();
        let files = vec![(PathBuf::from("a.api"), a), (PathBuf::from("b.api"), b)];
        assert!(validate_aggregate(&files).is_ok());
    }

    #[test]
    fn aggregate_rejects_cross_file_route_collision() {
        let a = parse_str("service S1 {\n\tget /shared\n}\n").unwrap();
        let b = parse_str("service S2 {\n\tpost /shared\n}\n").unwrap();
        let files = vec![(PathBuf::from("a.api"), a), (PathBuf::from("b.api"), b)];
        let err = validate_aggregate(&files).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("a.api") && msg.contains("b.api"), "{msg}");
    }
}
