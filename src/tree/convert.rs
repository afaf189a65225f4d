use super::{Document, IdGenerator, NodeRef, TreeBuilder};
use crate::error::Result;
use serde_json::Value;
use tracing::debug;

/// Parse raw JSON bytes into a [`Document`].
///
/// SIMD parsing is tried first; on failure the input is re-parsed with
/// `serde_json`, which also produces the error reported to the caller.
pub fn parse_document(input: &[u8], ids: &mut IdGenerator) -> Result<Document> {
    // simd-json parses in place, so it gets its own copy of the input
    let mut scratch = input.to_vec();
    let value: Value = match simd_json::serde::from_slice(&mut scratch) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "SIMD parse failed, falling back to serde_json");
            serde_json::from_slice(input)?
        }
    };
    Document::from_json(&value, ids)
}

impl Document {
    /// Build a document from an already-parsed JSON value.
    pub fn from_json(value: &Value, ids: &mut IdGenerator) -> Result<Document> {
        let mut builder = TreeBuilder::new(ids);
        let root = build(&mut builder, value)?;
        builder.finish(root)
    }
}

fn build(builder: &mut TreeBuilder<'_>, value: &Value) -> Result<NodeRef> {
    match value {
        Value::Null => Ok(builder.null()),
        Value::Bool(b) => Ok(builder.boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(builder.integer(i)),
            // u64 values past i64::MAX and all non-integers
            None => Ok(builder.float(n.as_f64().unwrap_or_default())),
        },
        Value::String(s) => Ok(builder.string(s.as_str())),
        Value::Array(arr) => {
            let elements = arr
                .iter()
                .map(|item| build(builder, item))
                .collect::<Result<Vec<_>>>()?;
            builder.array(elements)
        }
        Value::Object(obj) => {
            let pairs = obj
                .iter()
                .map(|(key, item)| Ok((key.clone(), build(builder, item)?)))
                .collect::<Result<Vec<_>>>()?;
            builder.object(pairs)
        }
    }
}
