//! Dotted path addressing into JSON form values.
//!
//! Paths are dot-separated keys; array positions may be written either as a numeric
//! segment (`contacts.0.name`) or in brackets (`contacts[0].name`).

use std::fmt;

use serde_json::{Map, Value};

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Object member.
    Key(String),
    /// Array position.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Split `path` into segments. Empty input addresses the root.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut out = Vec::new();
    for part in path.split('.').filter(|p| !p.is_empty()) {
        let (head, mut rest) = match part.find('[') {
            Some(i) => (&part[..i], &part[i..]),
            None => (part, ""),
        };
        if !head.is_empty() {
            out.push(match head.parse::<usize>() {
                Ok(i) => PathSegment::Index(i),
                Err(_) => PathSegment::Key(head.to_string()),
            });
        }
        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(close) = stripped.find(']') else {
                out.push(PathSegment::Key(rest.to_string()));
                break;
            };
            let inner = &stripped[..close];
            out.push(match inner.parse::<usize>() {
                Ok(i) => PathSegment::Index(i),
                Err(_) => PathSegment::Key(inner.trim_matches(['"', '\'']).to_string()),
            });
            rest = &stripped[close + 1..];
        }
    }
    out
}

/// Render segments back into canonical dotted form.
pub fn join_path(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Join a parent path and a child key.
pub fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Look up `path` in `root`. Missing members and out-of-range indexes yield `None`.
pub fn value_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    parse_path(path)
        .iter()
        .try_fold(root, |cur, seg| match (seg, cur) {
            (PathSegment::Key(k), Value::Object(m)) => m.get(k),
            (PathSegment::Index(i), Value::Array(a)) => a.get(*i),
            (PathSegment::Index(i), Value::Object(m)) => m.get(&i.to_string()),
            _ => None,
        })
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Returns false when the path crosses a scalar or indexes past the end of an array;
/// an index equal to the array length appends.
pub fn set_at(root: &mut Value, path: &str, value: Value) -> bool {
    let segments = parse_path(path);
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return true;
    };
    let mut cur = root;
    for seg in parents {
        let Some(next) = descend_mut(cur, seg) else {
            return false;
        };
        cur = next;
    }
    if cur.is_null() && matches!(last, PathSegment::Key(_)) {
        *cur = Value::Object(Map::new());
    }
    match (last, cur) {
        (PathSegment::Key(k), Value::Object(m)) => {
            m.insert(k.clone(), value);
            true
        }
        (PathSegment::Index(i), Value::Array(a)) if *i < a.len() => {
            a[*i] = value;
            true
        }
        (PathSegment::Index(i), Value::Array(a)) if *i == a.len() => {
            a.push(value);
            true
        }
        _ => false,
    }
}

/// Step into `cur` for writing, materialising missing objects.
fn descend_mut<'a>(cur: &'a mut Value, seg: &PathSegment) -> Option<&'a mut Value> {
    if cur.is_null() && matches!(seg, PathSegment::Key(_)) {
        *cur = Value::Object(Map::new());
    }
    match (seg, cur) {
        (PathSegment::Key(k), Value::Object(m)) => Some(m.entry(k.clone()).or_insert(Value::Null)),
        (PathSegment::Index(i), Value::Array(a)) => a.get_mut(*i),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_dotted_and_bracketed_segments() {
        assert_eq!(
            parse_path("contacts[1].name"),
            vec![
                PathSegment::Key("contacts".into()),
                PathSegment::Index(1),
                PathSegment::Key("name".into())
            ]
        );
        assert_eq!(parse_path("contacts.1.name"), parse_path("contacts[1].name"));
        assert_eq!(parse_path("grid[0][2]").len(), 3);
        assert!(parse_path("").is_empty());
        assert_eq!(join_path(&parse_path("a[3].b")), "a.3.b");
    }

    #[test]
    fn lookups_tolerate_missing_segments() {
        let v = json!({ "a": { "b": [ { "c": 1 } ] } });
        assert_eq!(value_at(&v, "a.b[0].c"), Some(&json!(1)));
        assert_eq!(value_at(&v, "a.b.0.c"), Some(&json!(1)));
        assert_eq!(value_at(&v, "a.b[1].c"), None);
        assert_eq!(value_at(&v, "a.x.y"), None);
        assert_eq!(value_at(&v, "a.b.0.c.d"), None);
        assert_eq!(value_at(&v, ""), Some(&v));
    }

    #[test]
    fn writes_create_objects_and_append() {
        let mut v = json!({ "list": [1, 2] });
        assert!(set_at(&mut v, "address.city", json!("Wellington")));
        assert!(set_at(&mut v, "list[2]", json!(3)));
        assert!(set_at(&mut v, "list.0", json!(0)));
        assert!(!set_at(&mut v, "list[9]", json!(9)));
        assert!(!set_at(&mut v, "list.0.deeper", json!(1)));
        assert_eq!(
            v,
            json!({ "list": [0, 2, 3], "address": { "city": "Wellington" } })
        );
    }
}
