//! State-machine driver — consumes the root line stream and assembles the
//! info block and service definition of the specification.
//!
//! The states are a closed enum dispatched exhaustively by one loop, so a
//! missing transition is a compile error rather than a runtime surprise.
//! Every state consumes its own closing delimiter; end-of-input is only
//! legal in `Root`.

use crate::error::{Error, Result};
use crate::lexer::{Line, LineReader};
use crate::model::{Annotation, ApiSpec, Group, Method, Route, Type};
use crate::parser::annotation::{self, Dialect};
use regex::Regex;
use std::sync::LazyLock;

static RE_INFO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^info\s*\{(.*)$").unwrap());

static RE_SERVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^service\s+([A-Za-z_][A-Za-z0-9_-]*)\s*\{$").unwrap());

static RE_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^group\s*\{$").unwrap());

static RE_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(get|head|post|put|patch|delete|connect|options|trace)",
        r"\s+(/[A-Za-z0-9_/:.\-]*)",
        r"\s*(?:\(\s*([A-Za-z_]\w*)\s*\))?",
        r"\s*(?:returns\s*\(\s*([A-Za-z_]\w*)\s*\))?$"
    ))
    .unwrap()
});

static RE_INFO_KV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*:\s*(.*)$").unwrap());

/// Parser states. `Route` is entered with the route line still unconsumed
/// and hands control back to its enclosing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Root,
    Info,
    ServiceBody,
    GroupBody,
    Route { in_group: bool },
    Done,
}

/// Drive the state machine over the root stream, starting from the
/// pre-parsed types table.
pub(crate) fn assemble(root: Vec<Line>, types: Vec<Type>, dialect: &Dialect) -> Result<ApiSpec> {
    let mut asm = Assembler {
        reader: LineReader::new(root),
        dialect,
        spec: ApiSpec {
            types,
            ..ApiSpec::default()
        },
        pending: Vec::new(),
        open_group: None,
        run: None,
        has_info: false,
        has_service: false,
    };

    let mut state = State::Root;
    loop {
        state = match state {
            State::Root => asm.root()?,
            State::Info => asm.info()?,
            State::ServiceBody => asm.service_body()?,
            State::GroupBody => asm.group_body()?,
            State::Route { in_group } => asm.route(in_group)?,
            State::Done => break,
        };
    }
    Ok(asm.spec)
}

struct Assembler<'a> {
    reader: LineReader,
    dialect: &'a Dialect,
    spec: ApiSpec,
    /// Annotations awaiting the next route or group opener.
    pending: Vec<Annotation>,
    /// Explicit `group { ... }` being built.
    open_group: Option<Group>,
    /// Anonymous group collecting the current run of ungrouped routes.
    run: Option<Group>,
    has_info: bool,
    has_service: bool,
}

impl Assembler<'_> {
    fn root(&mut self) -> Result<State> {
        loop {
            let Some(line) = self.reader.next() else {
                return Ok(State::Done);
            };
            let trimmed = line.text.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }

            if let Some(caps) = RE_INFO.captures(trimmed) {
                if self.has_info {
                    return Err(Error::syntax(line.no, "duplicate info block"));
                }
                self.has_info = true;
                let rest = caps[1].trim().to_string();
                if let Some(body) = rest.strip_suffix('}') {
                    // Single-line form: `info{title:"demo"}`.
                    self.info_pair(body.trim(), line.no)?;
                    continue;
                }
                self.info_pair(&rest, line.no)?;
                return Ok(State::Info);
            }

            if let Some(caps) = RE_SERVICE.captures(trimmed) {
                if self.has_service {
                    return Err(Error::syntax(line.no, "duplicate service block"));
                }
                self.has_service = true;
                self.spec.service.name = caps[1].to_string();
                return Ok(State::ServiceBody);
            }

            if trimmed.starts_with("info") {
                return Err(Error::syntax(line.no, "malformed info block, expected `info {`"));
            }
            if trimmed.starts_with("service") {
                return Err(Error::syntax(
                    line.no,
                    "malformed service declaration, expected `service Name {`",
                ));
            }
            return Err(Error::syntax(
                line.no,
                format!("expected `info` or `service`, found {trimmed:?}"),
            ));
        }
    }

    fn info(&mut self) -> Result<State> {
        loop {
            let Some(line) = self.reader.next() else {
                return Err(Error::syntax(
                    self.reader.last_no(),
                    "unexpected end of input in info block",
                ));
            };
            let trimmed = line.text.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }
            if trimmed == "}" {
                return Ok(State::Root);
            }
            self.info_pair(trimmed, line.no)?;
        }
    }

    fn info_pair(&mut self, s: &str, no: usize) -> Result<()> {
        if s.is_empty() {
            return Ok(());
        }
        let caps = RE_INFO_KV
            .captures(s)
            .ok_or_else(|| Error::syntax(no, format!("malformed info property {s:?}")))?;
        let key = caps[1].to_string();
        let value = strip_quotes(caps[2].trim()).to_string();

        let info = &mut self.spec.info;
        match key.as_str() {
            "title" => info.title = value.clone(),
            "desc" => info.desc = value.clone(),
            "author" => info.author = value.clone(),
            "email" => info.email = value.clone(),
            _ => {}
        }
        if info.properties.insert(key.clone(), value).is_some() {
            return Err(Error::syntax(no, format!("duplicate info property {key:?}")));
        }
        Ok(())
    }

    fn service_body(&mut self) -> Result<State> {
        loop {
            let Some(line) = self.reader.peek().cloned() else {
                return Err(Error::syntax(
                    self.reader.last_no(),
                    "unexpected end of input in service block",
                ));
            };
            let trimmed = line.text.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                self.reader.next();
                continue;
            }

            if trimmed == "}" {
                self.reader.next();
                if !self.pending.is_empty() {
                    return Err(Error::syntax(
                        line.no,
                        "annotations not attached to a route or group",
                    ));
                }
                self.flush_run();
                return Ok(State::Root);
            }

            if annotation::is_annotation(trimmed) {
                self.reader.next();
                let parsed = annotation::parse(&line, &mut self.reader, self.dialect)?;
                self.pending.push(parsed);
                continue;
            }

            if RE_GROUP.is_match(trimmed) {
                self.reader.next();
                self.flush_run();
                self.open_group = Some(Group {
                    annotations: std::mem::take(&mut self.pending),
                    ..Group::default()
                });
                return Ok(State::GroupBody);
            }

            if is_route_line(trimmed) {
                return Ok(State::Route { in_group: false });
            }

            return Err(Error::syntax(
                line.no,
                format!("unexpected {trimmed:?} in service block"),
            ));
        }
    }

    fn group_body(&mut self) -> Result<State> {
        loop {
            let Some(line) = self.reader.peek().cloned() else {
                return Err(Error::syntax(
                    self.reader.last_no(),
                    "unexpected end of input in group block",
                ));
            };
            let trimmed = line.text.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                self.reader.next();
                continue;
            }

            if trimmed == "}" {
                self.reader.next();
                if !self.pending.is_empty() {
                    return Err(Error::syntax(
                        line.no,
                        "annotations not attached to a route",
                    ));
                }
                if let Some(group) = self.open_group.take() {
                    self.spec.service.groups.push(group);
                }
                return Ok(State::ServiceBody);
            }

            if annotation::is_annotation(trimmed) {
                self.reader.next();
                let parsed = annotation::parse(&line, &mut self.reader, self.dialect)?;
                self.pending.push(parsed);
                continue;
            }

            if RE_GROUP.is_match(trimmed) {
                return Err(Error::syntax(line.no, "groups cannot nest"));
            }

            if is_route_line(trimmed) {
                return Ok(State::Route { in_group: true });
            }

            return Err(Error::syntax(
                line.no,
                format!("unexpected {trimmed:?} in group block"),
            ));
        }
    }

    fn route(&mut self, in_group: bool) -> Result<State> {
        let Some(line) = self.reader.next() else {
            return Err(Error::syntax(
                self.reader.last_no(),
                "unexpected end of input in route declaration",
            ));
        };
        let trimmed = line.text.trim();
        let caps = RE_ROUTE
            .captures(trimmed)
            .ok_or_else(|| Error::syntax(line.no, format!("malformed route {trimmed:?}")))?;
        let method = Method::from_keyword(&caps[1])
            .ok_or_else(|| Error::syntax(line.no, format!("unknown method {:?}", &caps[1])))?;

        let route = Route {
            method,
            path: caps[2].to_string(),
            request_type: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
            response_type: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
            annotations: std::mem::take(&mut self.pending),
            summary: String::new(),
            desc: String::new(),
            line: line.no,
        };

        if in_group {
            if let Some(group) = self.open_group.as_mut() {
                group.routes.push(route);
            }
            Ok(State::GroupBody)
        } else {
            self.run.get_or_insert_with(Group::default).routes.push(route);
            Ok(State::ServiceBody)
        }
    }

    /// Close the current run of ungrouped routes into an anonymous group.
    fn flush_run(&mut self) {
        if let Some(group) = self.run.take() {
            self.spec.service.groups.push(group);
        }
    }
}

/// A line is a route when its first token is a method keyword.
fn is_route_line(trimmed: &str) -> bool {
    let token = trimmed
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("");
    Method::from_keyword(token).is_some()
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble_src(src: &str) -> Result<ApiSpec> {
        let mut lines = Vec::new();
        for (i, text) in src.lines().enumerate() {
            lines.push(Line::new(i + 1, text));
        }
        assemble(lines, Vec::new(), &Dialect::default())
    }

    #[test]
    fn info_block_multi_line() {
        let spec = assemble_src("info {\n\ttitle: \"demo\"\n\tauthor: keen\n}\n").unwrap();
        assert_eq!(spec.info.title, "demo");
        assert_eq!(spec.info.author, "keen");
        assert_eq!(spec.info.properties["title"], "demo");
    }

    #[test]
    fn info_block_single_line() {
        let spec = assemble_src("info{title:\"demo\"}\n").unwrap();
        assert_eq!(spec.info.title, "demo");
    }

    #[test]
    fn free_form_info_keys_are_kept() {
        let spec = assemble_src("info {\n\tversion: \"1.0\"\n}\n").unwrap();
        assert_eq!(spec.info.properties["version"], "1.0");
        assert!(spec.info.title.is_empty());
    }

    #[test]
    fn ungrouped_routes_land_in_anonymous_group() {
        let spec = assemble_src("service Demo {\n\tget /ping\n\tpost /pong\n}\n").unwrap();
        assert_eq!(spec.service.name, "Demo");
        assert_eq!(spec.service.groups.len(), 1);
        assert!(spec.service.groups[0].annotations.is_empty());
        assert_eq!(spec.service.route_count(), 2);
    }

    #[test]
    fn route_line_shapes() {
        let spec = assemble_src(
            "service Demo {\n\tget /users returns (UserList)\n\tpost /users/:id/rename(RenameReq)\n\tget /ping\n}\n",
        )
        .unwrap();
        let routes: Vec<_> = spec.service.routes().collect();
        assert_eq!(routes[0].method, Method::Get);
        assert_eq!(routes[0].path, "/users");
        assert_eq!(routes[0].request_type, "");
        assert_eq!(routes[0].response_type, "UserList");
        assert_eq!(routes[1].path, "/users/:id/rename");
        assert_eq!(routes[1].request_type, "RenameReq");
        assert_eq!(routes[1].response_type, "");
        assert_eq!(routes[2].request_type, "");
        assert_eq!(routes[2].response_type, "");
    }

    #[test]
    fn annotated_group_collects_routes() {
        let spec = assemble_src(
            "service Demo {\n\t@server(desc: \"admin\", jwt: Auth)\n\tgroup {\n\t\t@doc(summary: \"List users\")\n\t\tget /users\n\t}\n}\n",
        )
        .unwrap();
        assert_eq!(spec.service.groups.len(), 1);
        let group = &spec.service.groups[0];
        assert_eq!(group.annotations.len(), 1);
        assert_eq!(group.annotations[0].properties["jwt"], "Auth");
        assert_eq!(group.routes.len(), 1);
        assert_eq!(group.routes[0].annotations[0].properties["summary"], "List users");
    }

    #[test]
    fn run_flushes_before_explicit_group() {
        let spec = assemble_src(
            "service Demo {\n\tget /ping\n\t@server(desc: x)\n\tgroup {\n\t\tget /users\n\t}\n\tget /pong\n}\n",
        )
        .unwrap();
        assert_eq!(spec.service.groups.len(), 3);
        let paths: Vec<_> = spec.service.routes().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/ping", "/users", "/pong"]);
    }

    #[test]
    fn eof_inside_service_is_fatal() {
        let err = assemble_src("service Demo {\n\tget /ping\n").unwrap_err();
        assert!(err.to_string().contains("unexpected end of input"), "{err}");
    }

    #[test]
    fn eof_inside_info_is_fatal() {
        let err = assemble_src("info {\n\ttitle: \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("unexpected end of input"), "{err}");
    }

    #[test]
    fn dangling_annotation_is_fatal() {
        let err = assemble_src("service Demo {\n\t@doc(summary: x)\n}\n").unwrap_err();
        assert!(err.to_string().contains("not attached"), "{err}");
    }

    #[test]
    fn nested_group_is_fatal() {
        let err =
            assemble_src("service Demo {\n\tgroup {\n\t\tgroup {\n\t\t}\n\t}\n}\n").unwrap_err();
        assert!(err.to_string().contains("cannot nest"), "{err}");
    }

    #[test]
    fn second_service_is_fatal() {
        let err = assemble_src("service A {\n}\nservice B {\n}\n").unwrap_err();
        assert!(err.to_string().contains("duplicate service"), "{err}");
    }

    #[test]
    fn malformed_route_reports_line() {
        let err = assemble_src("service Demo {\n\tget users\n}\n").unwrap_err();
        assert!(err.to_string().contains("near line 2"), "{err}");
    }

    #[test]
    fn duplicate_info_property_is_fatal() {
        let err = assemble_src("info {\n\ttitle: a\n\ttitle: b\n}\n").unwrap_err();
        assert!(err.to_string().contains("duplicate info property"), "{err}");
    }
}
