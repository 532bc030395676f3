//! Attribute maps and attribute-producing children.

use crate::context::Context;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use trellis_dom::Value;

pub type Attrs = BTreeMap<String, Value>;

/// Single-entry attribute map, e.g. `attr("role", "button")`.
pub fn attr(key: impl Into<String>, value: impl Into<Value>) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert(key.into(), value.into());
    attrs
}

pub fn attrs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Attrs
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// A child that contributes attributes once the rendering context is known.
pub trait AttrSource: Send + Sync {
    fn resolve(&self, context: &Context) -> Attrs;
}

/// Turns style declarations into a class name, typically by injecting a rule.
pub trait StyleCache: Send + Sync {
    fn class_name(&self, style: &Style) -> String;
}

/// Context entry carrying the style cache for a subtree.
#[derive(Clone)]
pub struct SharedStyleCache(pub Arc<dyn StyleCache>);

impl fmt::Debug for SharedStyleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedStyleCache")
    }
}

pub fn provide_style_cache(context: &Context, cache: Arc<dyn StyleCache>) -> Context {
    context.with(SharedStyleCache(cache))
}

/// Style declarations keyed by camelCase property name.
///
/// A `Value::Map` entry is a nested rule (`":hover"`, media queries, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    declarations: BTreeMap<String, Value>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.declarations.insert(property.into(), value.into());
        self
    }

    /// Merges `other` into `self`; nested rules merge recursively.
    pub fn merge(mut self, other: Style) -> Self {
        merge_declarations(&mut self.declarations, other.declarations);
        self
    }

    pub fn declarations(&self) -> &BTreeMap<String, Value> {
        &self.declarations
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Serialized declaration block, e.g. `background-color:red;`.
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        write_declarations(&self.declarations, &mut out);
        out
    }
}

impl AttrSource for Style {
    fn resolve(&self, context: &Context) -> Attrs {
        if self.is_empty() {
            return Attrs::new();
        }
        match context.get::<SharedStyleCache>() {
            Some(cache) => attr("class", cache.0.class_name(self)),
            None => attr("style", self.to_css()),
        }
    }
}

fn merge_declarations(target: &mut BTreeMap<String, Value>, source: BTreeMap<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Map(nested) => {
                if let Some(Value::Map(existing)) = target.get_mut(&key) {
                    merge_declarations(existing, nested);
                    continue;
                }
                target.insert(key, Value::Map(nested));
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}

fn write_declarations(declarations: &BTreeMap<String, Value>, out: &mut String) {
    for (property, value) in declarations {
        out.push_str(&kebab_case(property));
        match value {
            Value::Map(nested) => {
                out.push('{');
                write_declarations(nested, out);
                out.push('}');
            }
            value => {
                out.push(':');
                out.push_str(&value.to_attribute_string());
                out.push(';');
            }
        }
    }
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    struct HashingCache;

    impl StyleCache for HashingCache {
        fn class_name(&self, style: &Style) -> String {
            let mut hasher = DefaultHasher::new();
            style.to_css().hash(&mut hasher);
            format!("s{:x}", hasher.finish() & 0xffff)
        }
    }

    #[test]
    fn test_inline_style_without_cache() {
        let style = Style::new()
            .set("backgroundColor", "red")
            .set("color", "blue");
        assert_eq!(
            style.resolve(&Context::new()),
            attr("style", "background-color:red;color:blue;")
        );
    }

    #[test]
    fn test_nested_rules_and_merge() {
        let hover = Style::new().set("color", "red");
        let style = Style::new()
            .set(":hover", Value::Map(hover.declarations().clone()))
            .merge(Style::new().set(":hover", Value::Map(attr("fontSize", 12))));
        assert_eq!(style.to_css(), ":hover{color:red;font-size:12;}");
    }

    #[test]
    fn test_class_from_cache() {
        let context = provide_style_cache(&Context::new(), Arc::new(HashingCache));
        let style = Style::new().set("color", "red");
        let resolved = style.resolve(&context);
        assert_eq!(resolved.len(), 1);
        assert!(resolved["class"].as_str().unwrap().starts_with('s'));
        assert_eq!(resolved, style.resolve(&context));
    }

    #[test]
    fn test_empty_style_resolves_nothing() {
        assert!(Style::new().resolve(&Context::new()).is_empty());
    }
}
