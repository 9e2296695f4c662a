use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A reference-counted, immutable display name.
///
/// Component names, prop keys, and value fingerprints are cloned into every
/// render event, so `.clone()` must be a refcount bump rather than a heap
/// allocation. Wraps `Arc<str>` and compares by content with a pointer-equal
/// fast path.
#[derive(Debug, Clone, Eq)]
pub struct Name(Arc<str>);

impl Name {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The empty name. Used where the underlying runtime leaves a slot
    /// unnamed and no recovery heuristic applies.
    pub fn empty() -> Self {
        Name(Arc::from(""))
    }

    /// Positional fallback name for an unnamed state cell: `{0}`, `{1}`, …
    pub fn positional(index: usize) -> Self {
        Name(Arc::from(format!("{{{index}}}").as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Name {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl PartialEq<str> for Name {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Name {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (*self.0).hash(state);
    }
}

impl std::ops::Deref for Name {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Name {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Name {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    #[inline]
    fn from(s: &str) -> Self {
        Name(Arc::from(s))
    }
}

impl From<String> for Name {
    #[inline]
    fn from(s: String) -> Self {
        Name(Arc::from(s.as_str()))
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Name(Arc::from(s.as_str())))
    }
}

/// Recover state-cell names from a component's printed source text.
///
/// Scans for destructuring patterns of the form `[name, setName]`, the
/// convention the host runtime's state hook produces. This is a best-effort
/// heuristic: minified or unavailable source yields an empty list and callers
/// fall back to positional `{index}` names.
pub fn state_names_from_source(source: &str) -> Vec<Name> {
    let mut names = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        let Some((name, rest)) = take_ident(&source[i + 1..]) else {
            i += 1;
            continue;
        };
        let rest = rest.trim_start();
        let Some(rest) = rest.strip_prefix(',') else {
            i += 1;
            continue;
        };
        let rest = rest.trim_start();
        let Some(rest) = rest.strip_prefix("set") else {
            i += 1;
            continue;
        };
        if let Some((setter, rest)) = take_ident(rest)
            && !setter.is_empty()
            && rest.trim_start().starts_with(']')
        {
            names.push(Name::from(name));
        }
        i += 1;
    }
    names
}

/// Recover the declaration order of destructured props from a component's
/// parameter list: `({ a, b = 1, c: renamed })` yields `[a, b, c]`.
///
/// Best-effort, same degraded mode as [`state_names_from_source`].
pub fn props_order_from_source(source: &str) -> Vec<Name> {
    let Some(open_paren) = source.find('(') else {
        return Vec::new();
    };
    let after = source[open_paren + 1..].trim_start();
    let Some(after) = after.strip_prefix('{') else {
        return Vec::new();
    };
    let Some(close) = after.find('}') else {
        return Vec::new();
    };
    after[..close]
        .split(',')
        .filter_map(|part| {
            let prop = part.trim();
            let prop = prop.split(':').next().unwrap_or(prop);
            let prop = prop.split('=').next().unwrap_or(prop).trim();
            if prop.is_empty() || !prop.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
            {
                None
            } else {
                Some(Name::from(prop))
            }
        })
        .collect()
}

/// Leading identifier of `s`, plus the remainder after it.
fn take_ident(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_alphanumeric() && *c != '_' && *c != '$')
        .map_or(s.len(), |(i, _)| i);
    if end == 0 {
        return None;
    }
    Some((&s[..end], &s[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_shared() {
        let a = Name::from("Counter");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a, "Counter");
    }

    #[test]
    fn positional_names() {
        assert_eq!(Name::positional(0), "{0}");
        assert_eq!(Name::positional(12), "{12}");
    }

    #[test]
    fn hashmap_lookup_by_str() {
        let mut map = std::collections::HashMap::new();
        map.insert(Name::from("key"), 1);
        assert_eq!(map.get("key"), Some(&1));
    }

    #[test]
    fn serde_roundtrip_with_escapes() {
        let name = Name::from("a\"b");
        let json = serde_json::to_string(&name).unwrap();
        let back: Name = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn recovers_state_names() {
        let source = r"function Counter() {
            const [count, setCount] = useState(0);
            const [label, setLabel] = useState('');
            return null;
        }";
        let names = state_names_from_source(source);
        assert_eq!(names, vec![Name::from("count"), Name::from("label")]);
    }

    #[test]
    fn minified_source_recovers_nothing() {
        // Minifiers rename the setter, breaking the `set` prefix convention.
        let names = state_names_from_source("function a(){const[b,c]=d(0);return null}");
        assert!(names.is_empty());
    }

    #[test]
    fn state_name_requires_matching_bracket() {
        assert!(state_names_from_source("[count, setCount").is_empty());
        assert_eq!(
            state_names_from_source("[count , setCount ]"),
            vec![Name::from("count")]
        );
    }

    #[test]
    fn recovers_props_order() {
        let source = "function Row({ id, label = 'x', onClick: handler }) { return null; }";
        let order = props_order_from_source(source);
        assert_eq!(
            order,
            vec![Name::from("id"), Name::from("label"), Name::from("onClick")]
        );
    }

    #[test]
    fn props_order_without_destructuring_is_empty() {
        assert!(props_order_from_source("function Row(props) {}").is_empty());
        assert!(props_order_from_source("").is_empty());
    }
}
