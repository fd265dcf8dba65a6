use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One node of the key tree; any node may carry a value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, rename = "item", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, rename = "values")]
    pub children: IndexMap<String, Node>,
}

/// A hierarchical key-value store.
///
/// ```text
/// db set key1 val1
/// db set key1 key2 val2
/// db set key4 val4
///
/// * key1 -- val1
///   * key2 -- val2
/// * key4 -- val4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DbTree {
    root: Node,
}

impl DbTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, keys: &[String]) -> Option<&Node> {
        keys.iter()
            .try_fold(&self.root, |node, key| node.children.get(key))
    }

    fn node_mut(&mut self, keys: &[String]) -> Option<&mut Node> {
        keys.iter()
            .try_fold(&mut self.root, |node, key| node.children.get_mut(key))
    }

    /// The value at `keys`, or the empty string
    pub fn get(&self, keys: &[String]) -> String {
        self.node(keys)
            .and_then(|n| n.value.clone())
            .unwrap_or_default()
    }

    pub fn set(&mut self, keys: &[String], value: impl Into<String>) {
        let mut node = &mut self.root;
        for key in keys {
            node = node.children.entry(key.clone()).or_default();
        }
        node.value = Some(value.into());
    }

    /// Remove the value at `keys`, keeping its children
    pub fn unset(&mut self, keys: &[String]) {
        if let Some(node) = self.node_mut(keys) {
            node.value = None;
        }
    }

    pub fn has(&self, keys: &[String]) -> bool {
        self.node(keys).is_some_and(|n| n.value.is_some())
    }

    /// Child keys of `keys` in insertion order
    pub fn list(&self, keys: &[String]) -> Vec<String> {
        self.node(keys)
            .map(|n| n.children.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove the subtree at `keys`. Returns false for the empty path.
    pub fn prune(&mut self, keys: &[String]) -> bool {
        let Some((last, parent)) = keys.split_last() else {
            return false;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.shift_remove(last);
        }
        true
    }

    /// Render the subtree with values: `* key -- value`
    pub fn show(&self, keys: &[String]) -> String {
        let mut out = String::new();
        if let Some(node) = self.node(keys) {
            render(node, "", true, &mut out);
        }
        out
    }

    /// Render the subtree keys only; valued nodes are marked `*`
    pub fn show_keys(&self, keys: &[String]) -> String {
        match self.node(keys) {
            Some(node) => {
                let mut out = String::new();
                render(node, "", false, &mut out);
                out
            }
            None => "Subtree not found.".to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.value.is_none() && self.root.children.is_empty()
    }
}

fn render(node: &Node, indent: &str, with_values: bool, out: &mut String) {
    for (key, child) in &node.children {
        out.push_str(indent);
        out.push_str("* ");
        out.push_str(key);
        match (&child.value, with_values) {
            (Some(value), true) => {
                out.push_str(" -- ");
                out.push_str(value);
            }
            (Some(_), false) => out.push_str(" *"),
            (None, _) => {}
        }
        out.push('\n');
        render(child, &format!("{}  ", indent), with_values, out);
    }
}
