use serde_json::{Map, Value};

use super::StoreError;

/// Split a path into its segments. Surrounding slashes are ignored; the
/// empty path addresses the root.
pub(crate) fn segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let segs: Vec<&str> = trimmed.split('/').collect();
    if segs.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segs)
}

/// Join a child key onto a parent path
pub fn child_path(parent: &str, key: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", parent, key.trim_start_matches('/'))
    }
}

pub(crate) fn get<'a>(node: &'a Value, segs: &[&str]) -> Option<&'a Value> {
    let found = segs.iter().try_fold(node, |cur, seg| cur.get(*seg))?;
    match found {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        v => Some(v),
    }
}

/// Write `value` at `segs`, creating parents. Null and empty objects are
/// removed and the parents they leave empty are pruned.
pub(crate) fn set(node: &mut Value, segs: &[&str], value: Value) {
    let Some((head, rest)) = segs.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        set(child, rest, value);
        if is_vacant(child) {
            map.remove(*head);
        }
    }
}

fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn segments_trim_slashes() {
        assert_eq!(segments("/rooms/abc/").unwrap(), vec!["rooms", "abc"]);
        assert!(segments("").unwrap().is_empty());
        assert!(segments("/").unwrap().is_empty());
    }

    #[test]
    fn segments_reject_empty_interior() {
        assert!(matches!(segments("rooms//abc"), Err(StoreError::InvalidPath(_))));
    }

    #[test]
    fn child_path_joins() {
        assert_eq!(child_path("rooms", "abc"), "rooms/abc");
        assert_eq!(child_path("rooms/", "/abc"), "rooms/abc");
        assert_eq!(child_path("", "rooms"), "rooms");
    }

    #[test]
    fn set_creates_parents() {
        let mut root = json!({});
        set(&mut root, &["rooms", "abc", "full"], json!(false));
        assert_eq!(root, json!({"rooms": {"abc": {"full": false}}}));
        assert_eq!(get(&root, &["rooms", "abc", "full"]), Some(&json!(false)));
    }

    #[test]
    fn get_returns_subtree() {
        let root = json!({"rooms": {"a": {"red": "u1"}, "b": {"red": "u2"}}});
        let rooms = get(&root, &["rooms"]).unwrap();
        assert_eq!(rooms.as_object().unwrap().len(), 2);
        assert_eq!(get(&root, &["rooms", "c"]), None);
        assert_eq!(get(&root, &["rooms", "a", "red", "deeper"]), None);
    }

    #[test]
    fn set_null_deletes_and_prunes() {
        let mut root = json!({"rooms": {"a": {"red": "u1"}}});
        set(&mut root, &["rooms", "a", "red"], Value::Null);
        assert_eq!(root, json!({}));
        assert_eq!(get(&root, &["rooms"]), None);
    }

    #[test]
    fn set_replaces_scalar_with_object() {
        let mut root = json!({"rooms": 5});
        set(&mut root, &["rooms", "a"], json!("x"));
        assert_eq!(root, json!({"rooms": {"a": "x"}}));
    }
}
