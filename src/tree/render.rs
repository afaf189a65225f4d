use super::{Document, Node, NodeRef};
use std::fmt::{self, Write};

impl Document {
    /// Indented tree view of the whole document, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.render_node(&mut out, self.root, "");
        out
    }

    fn render_node(&self, out: &mut String, node: NodeRef, indent: &str) -> fmt::Result {
        let Some(data) = self.get(node) else {
            return writeln!(out, "<missing #{}>", node.index());
        };
        match &data.node {
            Node::Object(pairs) => {
                writeln!(out, "Object (id={}) {{", data.id)?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    let last = i + 1 == pairs.len();
                    write!(out, "{}{}\"{}\": ", indent, branch(last), key)?;
                    self.render_node(out, *value, &format!("{}{}", indent, stem(last)))?;
                }
                writeln!(out, "{}}}", indent)
            }
            Node::Array(elements) => {
                writeln!(out, "Array (id={}) [", data.id)?;
                for (i, value) in elements.iter().enumerate() {
                    let last = i + 1 == elements.len();
                    write!(out, "{}{}[{}]: ", indent, branch(last), i)?;
                    self.render_node(out, *value, &format!("{}{}", indent, stem(last)))?;
                }
                writeln!(out, "{}]", indent)
            }
            Node::String(s) => writeln!(out, "\"{}\"", s),
            Node::Integer(i) => writeln!(out, "{}", i),
            Node::Float(f) => writeln!(out, "{}", f),
            Node::Boolean(b) => writeln!(out, "{}", b),
            Node::Null => writeln!(out, "null"),
        }
    }
}

fn branch(last: bool) -> &'static str {
    if last {
        "└── "
    } else {
        "├── "
    }
}

fn stem(last: bool) -> &'static str {
    if last {
        "    "
    } else {
        "│   "
    }
}
