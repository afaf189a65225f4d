//! Structural fingerprints for object nodes
//!
//! A signature lists an object's keys in byte order, each followed by a type
//! tag: `{}` object, `[]` array, `s` string, `i` integer, `n` float,
//! `b` boolean, `0` null. An array whose first element is an object is also
//! followed by that element's own signature. All tokens are comma-joined, so
//! `{"b": "x", "a": 1}` becomes `a,i,b,s`.
//!
//! Two objects share a table exactly when their signatures are equal.

use crate::tree::{Document, Node, NodeRef};

/// Compute the shape signature of `node`, or `None` if it is not an object.
pub fn signature(doc: &Document, node: NodeRef) -> Option<String> {
    let Node::Object(pairs) = doc.node(node)? else {
        return None;
    };

    let mut sorted: Vec<&(String, NodeRef)> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut tokens: Vec<String> = Vec::with_capacity(sorted.len() * 2);
    for (key, value) in sorted {
        tokens.push(key.clone());
        match doc.node(*value) {
            Some(Node::Object(_)) => tokens.push("{}".to_string()),
            Some(Node::Array(elements)) => {
                tokens.push("[]".to_string());
                if let Some(inner) = elements.first().and_then(|first| signature(doc, *first)) {
                    tokens.push(inner);
                }
            }
            Some(Node::String(_)) => tokens.push("s".to_string()),
            Some(Node::Integer(_)) => tokens.push("i".to_string()),
            Some(Node::Float(_)) => tokens.push("n".to_string()),
            Some(Node::Boolean(_)) => tokens.push("b".to_string()),
            Some(Node::Null) => tokens.push("0".to_string()),
            None => {}
        }
    }

    Some(tokens.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::IdGenerator;
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    fn sig_of(value: Value) -> Option<String> {
        let mut ids = IdGenerator::new();
        let doc = Document::from_json(&value, &mut ids).unwrap();
        signature(&doc, doc.root())
    }

    #[test]
    fn test_scalar_tags() {
        assert_eq!(
            sig_of(json!({"s": "x", "i": 1, "n": 1.5, "b": true, "z": null})),
            Some("b,b,i,i,n,n,s,s,z,0".to_string())
        );
    }

    #[test]
    fn test_key_order_is_irrelevant() {
        assert_eq!(sig_of(json!({"b": "x", "a": 1})), Some("a,i,b,s".to_string()));
        assert_eq!(sig_of(json!({"a": 2, "b": "y"})), Some("a,i,b,s".to_string()));
    }

    #[test]
    fn test_array_of_objects_embeds_first_element() {
        assert_eq!(
            sig_of(json!({"items": [{"x": 1}, {"y": "z"}], "tags": ["a"]})),
            Some("items,[],x,i,tags,[]".to_string())
        );
    }

    #[test]
    fn test_nested_object_is_opaque() {
        assert_eq!(
            sig_of(json!({"a": {"b": 1}})),
            sig_of(json!({"a": {"c": "different"}}))
        );
    }

    #[test]
    fn test_empty_object_has_empty_signature() {
        assert_eq!(sig_of(json!({})), Some(String::new()));
    }

    #[test]
    fn test_non_objects_have_no_signature() {
        assert_eq!(sig_of(json!([1, 2])), None);
        assert_eq!(sig_of(json!("x")), None);
        assert_eq!(sig_of(json!(null)), None);
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            Just(Value::Null),
        ]
    }

    proptest! {
        #[test]
        fn prop_signature_ignores_key_order(
            fields in proptest::collection::btree_map("[a-z]{1,8}", scalar(), 0..12)
        ) {
            let forward: Map<String, Value> = fields.clone().into_iter().collect();
            let backward: Map<String, Value> = fields.into_iter().rev().collect();

            prop_assert_eq!(
                sig_of(Value::Object(forward)),
                sig_of(Value::Object(backward))
            );
        }
    }
}
