// Taxonomy nodes as exchanged with the catalog.
//
// Two shapes meet here. `Taxonomy::from_path` only ever builds a
// single-child chain (one node per path segment), which is what the
// catalog accepts when a branch is added. Trees fetched from the server
// may branch freely, and `Taxonomy::render` walks every child, emitting
// one line per node. The two are not reconciled: adding `a/b` and `a/c`
// posts two chains, and only the server merges them.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::api::null_as_default;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(rename = "node_name", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(
        rename = "child_nodes",
        default,
        deserialize_with = "null_as_default"
    )]
    pub children: Vec<Taxonomy>,
}

impl Taxonomy {
    pub fn new(name: impl Into<String>) -> Self {
        Taxonomy {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Build a chain from a slash separated path. Empty segments are
    /// dropped, so `"/a//b/"` and `"a/b"` give the same chain, and a path
    /// with no segments at all gives an empty node (no name, no children).
    pub fn from_path(path: &str) -> Self {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).rev();
        let Some(leaf) = segments.next() else {
            return Taxonomy::default();
        };
        segments.fold(Taxonomy::new(leaf), |child, name| Taxonomy {
            name: name.to_string(),
            children: vec![child],
        })
    }

    /// True for the node produced from a path without segments.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.children.is_empty()
    }

    /// One `prefix/name` line for this node, then the lines of every child
    /// with the extended prefix, depth first in server order.
    pub fn render(&self, prefix: &str) -> Vec<String> {
        let mut lines = Vec::new();
        self.render_into(prefix, &mut lines);
        lines
    }

    fn render_into(&self, prefix: &str, lines: &mut Vec<String>) {
        let path = format!("{}/{}", prefix, self.name);
        lines.push(path.clone());
        for child in &self.children {
            child.render_into(&path, lines);
        }
    }

    pub fn print<W: Write>(&self, out: &mut W, prefix: &str) -> io::Result<()> {
        for line in self.render(prefix) {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

/// Render a whole forest as returned by the taxonomy endpoint.
pub fn render_forest(forest: &[Taxonomy]) -> Vec<String> {
    forest.iter().flat_map(|root| root.render("")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_segments(node: &Taxonomy) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            out.push(n.name.clone());
            assert!(n.children.len() <= 1, "path parsing must build a chain");
            current = n.children.first();
        }
        out
    }

    #[test]
    fn path_builds_single_child_chain() {
        let t = Taxonomy::from_path("Analytics/Forecasting/Demand");
        assert_eq!(chain_segments(&t), vec!["Analytics", "Forecasting", "Demand"]);
        let leaf = &t.children[0].children[0];
        assert!(leaf.children.is_empty());
    }

    #[test]
    fn empty_segments_are_ignored() {
        assert_eq!(Taxonomy::from_path("/a//b/"), Taxonomy::from_path("a/b"));
    }

    #[test]
    fn empty_and_root_paths_give_empty_node() {
        for path in ["", "/", "///"] {
            let t = Taxonomy::from_path(path);
            assert!(t.is_empty(), "{path:?} should give an empty node");
            assert_eq!(t, Taxonomy::default());
        }
    }

    #[test]
    fn chain_survives_wire_round_trip_and_renders_segments() {
        for path in ["a", "a/b", "Energy/Wind/Turbine/Blade"] {
            let chain = Taxonomy::from_path(path);
            let wire = serde_json::to_string(&chain).unwrap();
            let back: Taxonomy = serde_json::from_str(&wire).unwrap();
            assert_eq!(back, chain);

            let lines = back.render("");
            let last = lines.last().unwrap();
            let segments: Vec<&str> = last.trim_start_matches('/').split('/').collect();
            let expected: Vec<&str> = path.split('/').collect();
            assert_eq!(segments, expected);
            assert_eq!(lines.len(), expected.len());
        }
    }

    #[test]
    fn wire_names_and_null_children() {
        let json = r#"{"node_name":"root","child_nodes":[{"node_name":"leaf","child_nodes":null}]}"#;
        let t: Taxonomy = serde_json::from_str(json).unwrap();
        assert_eq!(t.name, "root");
        assert_eq!(t.children, vec![Taxonomy::new("leaf")]);

        let out = serde_json::to_value(Taxonomy::from_path("x/y")).unwrap();
        assert_eq!(
            out,
            serde_json::json!({
                "node_name": "x",
                "child_nodes": [{"node_name": "y", "child_nodes": []}]
            })
        );
    }

    #[test]
    fn null_name_decodes_as_empty() {
        let json = r#"{"node_name":null,"child_nodes":[{"node_name":"leaf"}]}"#;
        let t: Taxonomy = serde_json::from_str(json).unwrap();
        assert_eq!(t.name, "");
        assert_eq!(t.children, vec![Taxonomy::new("leaf")]);
    }

    #[test]
    fn branching_tree_renders_every_node() {
        // Server trees branch even though from_path never does.
        let tree = Taxonomy {
            name: "root".into(),
            children: vec![
                Taxonomy {
                    name: "a".into(),
                    children: vec![Taxonomy::new("a1"), Taxonomy::new("a2")],
                },
                Taxonomy::new("b"),
            ],
        };
        assert_eq!(
            tree.render(""),
            vec!["/root", "/root/a", "/root/a/a1", "/root/a/a2", "/root/b"]
        );
    }

    #[test]
    fn forest_and_print() {
        let forest = vec![Taxonomy::new("one"), Taxonomy::from_path("two/three")];
        assert_eq!(render_forest(&forest), vec!["/one", "/two", "/two/three"]);

        let mut buf = Vec::new();
        forest[1].print(&mut buf, "/base").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "/base/two\n/base/two/three\n");
    }
}
