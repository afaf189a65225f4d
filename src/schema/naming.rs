//! Table naming heuristics
//!
//! Names are picked by an ordered list of rules; the first rule returning a
//! name wins. The default lists recognise a handful of common document
//! shapes (posts with authors and comments, orders with customers and line
//! items). Callers can append or replace rules without touching inference.

use crate::tree::{Document, Node, NodeRef};
use crate::types::MeltConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]").unwrap());

/// Lower-case `raw` and fold every character outside `[a-z0-9_]` to `_`.
pub fn sanitize(raw: &str) -> String {
    NON_IDENT.replace_all(&raw.to_lowercase(), "_").into_owned()
}

/// What a rule can see about the object being named
pub struct NameContext<'a> {
    pub doc: &'a Document,
    pub node: NodeRef,
    /// Key the object sits under; `None` for the document root
    pub field: Option<&'a str>,
    /// Object holding `field`
    pub enclosing: Option<NodeRef>,
}

impl NameContext<'_> {
    pub fn field_is(&self, name: &str) -> bool {
        self.field == Some(name)
    }

    pub fn has(&self, key: &str) -> bool {
        self.doc.has_field(self.node, key)
    }

    pub fn has_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.has(key))
    }

    /// Like [`enclosing_has_any`](Self::enclosing_has_any), but only when
    /// the object sits directly under the enclosing object, not in an array.
    pub fn parent_has_any(&self, keys: &[&str]) -> bool {
        self.enclosing.is_some()
            && self.doc.parent(self.node) == self.enclosing
            && self.enclosing_has_any(keys)
    }

    pub fn enclosing_has_any(&self, keys: &[&str]) -> bool {
        self.enclosing
            .is_some_and(|obj| keys.iter().any(|key| self.doc.has_field(obj, key)))
    }

    /// String value stored under `key` on the object itself.
    pub fn string_field(&self, key: &str) -> Option<&str> {
        match self.doc.field(self.node, key).and_then(|v| self.doc.node(v)) {
            Some(Node::String(s)) => Some(s),
            _ => None,
        }
    }
}

type RuleFn = dyn Fn(&NameContext<'_>) -> Option<String> + Send + Sync;

/// One naming heuristic
pub struct NamingRule {
    pub label: &'static str,
    apply: Box<RuleFn>,
}

impl NamingRule {
    pub fn new(
        label: &'static str,
        apply: impl Fn(&NameContext<'_>) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        NamingRule {
            label,
            apply: Box::new(apply),
        }
    }

    /// Rule that yields `name` whenever `predicate` holds.
    pub fn fixed(
        label: &'static str,
        name: &'static str,
        predicate: impl Fn(&NameContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(label, move |ctx| predicate(ctx).then(|| name.to_string()))
    }

    pub fn apply(&self, ctx: &NameContext<'_>) -> Option<String> {
        (self.apply)(ctx)
    }
}

impl std::fmt::Debug for NamingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamingRule").field("label", &self.label).finish()
    }
}

/// Picks table names for newly seen object shapes
#[derive(Debug)]
pub struct TableNamer {
    pub root_rules: Vec<NamingRule>,
    pub nested_rules: Vec<NamingRule>,
    /// Names created at most once; later shapes resolving here are dropped
    pub singletons: Vec<String>,
    pub root_default: String,
}

impl TableNamer {
    pub fn new(config: &MeltConfig) -> Self {
        let mut nested_rules = default_nested_rules();
        if config.name_from_values {
            nested_rules.push(value_derived_rule());
        }
        TableNamer {
            root_rules: default_root_rules(),
            nested_rules,
            singletons: vec!["users".to_string()],
            root_default: config.root_table.clone(),
        }
    }

    /// Name for the document's root object.
    pub fn name_root(&self, doc: &Document, node: NodeRef) -> String {
        let ctx = NameContext {
            doc,
            node,
            field: None,
            enclosing: None,
        };
        self.first_match(&self.root_rules, &ctx)
            .unwrap_or_else(|| self.root_default.clone())
    }

    /// Name for an object nested below a table called `parent_table`.
    pub fn name_nested(&self, doc: &Document, node: NodeRef, parent_table: &str) -> String {
        let Some((field, enclosing)) = doc.nesting(node) else {
            return parent_table.to_string();
        };
        let ctx = NameContext {
            doc,
            node,
            field: Some(field),
            enclosing: Some(enclosing),
        };
        if let Some(name) = self.first_match(&self.nested_rules, &ctx) {
            return name;
        }
        match sanitize(field) {
            name if name == "author" => "users".to_string(),
            name if name.is_empty() => parent_table.to_string(),
            name => name,
        }
    }

    pub fn is_singleton(&self, name: &str) -> bool {
        self.singletons.iter().any(|s| s == name)
    }

    fn first_match(&self, rules: &[NamingRule], ctx: &NameContext<'_>) -> Option<String> {
        rules.iter().find_map(|rule| {
            let name = rule.apply(ctx)?;
            debug!(rule = rule.label, table = %name, "naming rule matched");
            Some(name)
        })
    }
}

const ORDER_IDS: &[&str] = &["orderId", "order_id"];

fn default_root_rules() -> Vec<NamingRule> {
    vec![
        NamingRule::fixed("root-post", "posts", |ctx| ctx.has("postId")),
        NamingRule::fixed("root-order-id", "orders", |ctx| ctx.has_any(ORDER_IDS)),
        NamingRule::fixed("root-order-shape", "orders", |ctx| {
            ctx.has("items") && ctx.has_any(&["total", "customer"])
        }),
    ]
}

fn default_nested_rules() -> Vec<NamingRule> {
    vec![
        NamingRule::fixed("order-item-shape", "order_items", |ctx| {
            ctx.field_is("items") && ctx.has("sku") && ctx.has_any(&["qty", "quantity", "price"])
        }),
        NamingRule::fixed("user-reference", "users", |ctx| {
            (ctx.field_is("author") || ctx.field_is("comments")) && ctx.string_field("uid").is_some()
        }),
        NamingRule::fixed("post", "posts", |ctx| {
            ctx.field_is("posts") || ctx.parent_has_any(&["postId"])
        }),
        NamingRule::fixed("comment", "comments", |ctx| ctx.field_is("comments")),
        NamingRule::fixed("customer", "customers", |ctx| ctx.field_is("customer")),
        NamingRule::fixed("order-items", "order_items", |ctx| {
            ctx.field_is("items")
                && (ctx.enclosing_has_any(ORDER_IDS)
                    || (ctx.enclosing_has_any(&["total", "amount"])
                        && ctx.enclosing_has_any(&["date", "orderDate"])))
        }),
        NamingRule::fixed("embedded-post", "posts", |ctx| ctx.has("postId")),
    ]
}

fn value_derived_rule() -> NamingRule {
    NamingRule::new("value-derived", |ctx| {
        ["type", "kind", "name", "category", "class"]
            .iter()
            .filter_map(|key| ctx.string_field(key))
            .map(sanitize)
            .find(|name| !name.is_empty())
            .map(|name| if name.ends_with('s') { name } else { format!("{}s", name) })
    })
}
