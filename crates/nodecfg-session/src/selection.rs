//! Ordered, unique-by-id selection

use indexmap::map::Entry;
use indexmap::IndexMap;

use nodecfg_nodes::SelectedNode;

#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    nodes: IndexMap<String, SelectedNode>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the id is already present; the existing entry is
    /// never overwritten
    pub fn insert(&mut self, node: SelectedNode) -> bool {
        match self.nodes.entry(node.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(node);
                true
            }
        }
    }

    /// Remove by id, keeping the order of the rest
    pub fn remove(&mut self, node_id: &str) -> Option<SelectedNode> {
        self.nodes.shift_remove(node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn get(&self, node_id: &str) -> Option<&SelectedNode> {
        self.nodes.get(node_id)
    }

    /// Empty the selection, returning how many entries were dropped
    pub fn clear(&mut self) -> usize {
        let count = self.nodes.len();
        self.nodes.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedNode> {
        self.nodes.values()
    }

    pub fn to_vec(&self) -> Vec<SelectedNode> {
        self.nodes.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, display_name: &str) -> SelectedNode {
        SelectedNode {
            id: id.to_string(),
            browse_name: display_name.to_string(),
            display_name: display_name.to_string(),
            data_type: "Double".to_string(),
            alias: None,
            namespace_index: 2,
        }
    }

    #[test]
    fn test_first_write_wins() {
        let mut set = SelectionSet::new();
        assert!(set.insert(node("ns=2;s=a", "first")));
        assert!(!set.insert(node("ns=2;s=a", "second")));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("ns=2;s=a").unwrap().display_name, "first");
    }

    #[test]
    fn test_insertion_order_survives_removal() {
        let mut set = SelectionSet::new();
        for id in ["ns=2;s=a", "ns=2;s=b", "ns=2;s=c", "ns=2;s=d"] {
            set.insert(node(id, id));
        }

        assert!(set.remove("ns=2;s=b").is_some());
        assert!(set.remove("ns=2;s=zz").is_none());

        let ids: Vec<&str> = set.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["ns=2;s=a", "ns=2;s=c", "ns=2;s=d"]);
    }

    #[test]
    fn test_clear_reports_count() {
        let mut set = SelectionSet::new();
        set.insert(node("ns=2;s=a", "a"));
        set.insert(node("ns=2;s=b", "b"));
        assert_eq!(set.clear(), 2);
        assert!(set.is_empty());
        assert_eq!(set.clear(), 0);
    }
}
