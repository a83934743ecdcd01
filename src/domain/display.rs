//! Human-readable rendering of trees via `termtree`.

use std::collections::HashMap;

use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::TreeArena;

pub trait TreeDisplay {
    /// Renders the tree, cutting branches below `max_depth` levels if given.
    fn to_display_tree(&self, max_depth: Option<usize>) -> Tree<String>;
}

impl TreeDisplay for TreeArena {
    #[instrument(level = "debug", skip(self))]
    fn to_display_tree(&self, max_depth: Option<usize>) -> Tree<String> {
        let Some(root_idx) = self.root() else {
            return Tree::new("Empty tree".to_string());
        };

        // pre-order list of the nodes within max_depth; the root is level 1
        let mut visible = Vec::new();
        let mut stack = vec![(root_idx, 1usize)];
        while let Some((idx, level)) = stack.pop() {
            let Some(node) = self.get_node(idx) else {
                continue;
            };
            visible.push(idx);
            if max_depth.is_some_and(|max| level >= max) {
                continue;
            }
            stack.extend(node.children().iter().rev().map(|&child| (child, level + 1)));
        }

        // children precede their parent in reverse pre-order
        let mut built: HashMap<_, Tree<String>> = HashMap::with_capacity(visible.len());
        for &idx in visible.iter().rev() {
            let Some(node) = self.get_node(idx) else {
                continue;
            };
            let mut tree = Tree::new(node.data.to_string());
            for child in node.children() {
                if let Some(child_tree) = built.remove(child) {
                    tree.push(child_tree);
                }
            }
            built.insert(idx, tree);
        }
        built
            .remove(&root_idx)
            .unwrap_or_else(|| Tree::new("Empty tree".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::tree_from_triples;

    fn sample() -> TreeArena {
        tree_from_triples(&[
            (1, "Life", None),
            (2, "Eukaryotes", Some(1)),
            (3, "Animals", Some(2)),
            (4, "Plants", Some(2)),
            (5, "Bacteria", Some(1)),
        ])
    }

    #[test]
    fn test_full_rendering_keeps_child_order() {
        let rendered = sample().to_display_tree(None).to_string();

        let positions: Vec<usize> = ["Life", "Eukaryotes", "Animals", "Plants", "Bacteria"]
            .iter()
            .map(|name| rendered.find(name).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{rendered}");
    }

    #[test]
    fn test_max_depth_cuts_deeper_levels() {
        let rendered = sample().to_display_tree(Some(2)).to_string();

        assert!(rendered.contains("2 'Eukaryotes'"));
        assert!(rendered.contains("5 'Bacteria'"));
        assert!(!rendered.contains("Animals"));
        assert!(!rendered.contains("Plants"));
    }

    #[test]
    fn test_empty_tree_renders_placeholder() {
        let rendered = TreeArena::new().to_display_tree(None).to_string();

        assert!(rendered.starts_with("Empty tree"));
    }

    #[test]
    fn test_deep_chain_is_built_without_recursion() {
        let n = 200_000;
        let mut tree = TreeArena::new();
        let mut prev = None;
        for id in 1..=n {
            let idx = tree
                .insert_node(crate::domain::NodeData::new(id, "n", false, 0))
                .unwrap();
            match prev {
                Some(parent) => tree.attach_child_unchecked(parent, idx),
                None => tree.set_root(idx),
            }
            prev = Some(idx);
        }

        let display = tree.to_display_tree(Some(3));

        assert_eq!(display.root, "1 'n'");
        assert_eq!(display.leaves.len(), 1);
        assert_eq!(display.leaves[0].leaves[0].leaves.len(), 0);
    }
}
