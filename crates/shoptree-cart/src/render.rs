//! Human-readable, indentation-based tree dump.

use std::fmt::{self, Write};

use crate::format::Significant;
use crate::node::{Node, NodeIndex};
use crate::tree::DecisionTreeClassifier;

impl DecisionTreeClassifier {
    /// Write the fitted tree as indented text.
    ///
    /// Each split prints its feature index, feature name, and threshold
    /// (six significant digits), followed by the `if (left)` and
    /// `else (right)` subtrees one level deeper; each leaf prints its class:
    ///
    /// ```text
    /// root: [X0 (PageValue) <= 5]
    ///   if (left): Predict: 0
    ///   else (right): Predict: 1
    /// ```
    ///
    /// Writes nothing for an untrained model.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying writer.
    pub fn write_tree<W: Write>(&self, out: &mut W) -> fmt::Result {
        let Some(nodes) = self.nodes.as_deref() else {
            return Ok(());
        };

        // (node, indent level, label) in pre-order.
        let mut stack = vec![(NodeIndex::ROOT, 0usize, "root")];
        while let Some((idx, indent, label)) = stack.pop() {
            write!(out, "{:width$}{label}: ", "", width = indent * 2)?;
            match &nodes[idx.index()] {
                Node::Leaf { prediction, .. } => writeln!(out, "Predict: {prediction}")?,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let name = self
                        .feature_names
                        .get(feature.index())
                        .map_or("?", String::as_str);
                    writeln!(out, "[{feature} ({name}) <= {}]", Significant(*threshold))?;
                    stack.push((*right, indent + 1, "else (right)"));
                    stack.push((*left, indent + 1, "if (left)"));
                }
            }
        }
        Ok(())
    }

    /// Render the fitted tree to a `String`; empty when untrained.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_tree(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::DecisionTreeClassifier;

    #[test]
    fn untrained_renders_empty() {
        let tree = DecisionTreeClassifier::new(2, vec!["x".to_string()]).unwrap();
        assert_eq!(tree.render(), "");
    }

    #[test]
    fn single_split_layout() {
        let mut tree = DecisionTreeClassifier::new(1, vec!["PageValue".to_string()]).unwrap();
        tree.fit(&[vec![1.0], vec![2.0], vec![8.0], vec![9.0]], &[0, 0, 1, 1])
            .unwrap();
        assert_eq!(
            tree.render(),
            "root: [X0 (PageValue) <= 5]\n  if (left): Predict: 0\n  else (right): Predict: 1\n"
        );
    }

    #[test]
    fn nested_subtree_is_indented_before_else_branch() {
        let names = vec!["a".to_string(), "b".to_string()];
        let x = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let mut tree = DecisionTreeClassifier::new(2, names).unwrap();
        tree.fit(&x, &[0, 1, 1, 0]).unwrap();
        let expected = "\
root: [X0 (a) <= 0.5]
  if (left): [X1 (b) <= 0.5]
    if (left): Predict: 0
    else (right): Predict: 1
  else (right): [X1 (b) <= 0.5]
    if (left): Predict: 1
    else (right): Predict: 0
";
        assert_eq!(tree.render(), expected);
    }

    #[test]
    fn threshold_printed_with_six_significant_digits() {
        let mut tree = DecisionTreeClassifier::new(1, vec!["rate".to_string()]).unwrap();
        tree.fit(&[vec![0.1], vec![0.2], vec![0.4]], &[0, 1, 1]).unwrap();
        // The midpoint of 0.1 and 0.2 is not exactly 0.15 in binary.
        assert_eq!(
            tree.render(),
            "root: [X0 (rate) <= 0.15]\n  if (left): Predict: 0\n  else (right): Predict: 1\n"
        );
    }

    #[test]
    fn pure_tree_is_single_leaf_line() {
        let mut tree = DecisionTreeClassifier::new(3, vec!["x".to_string()]).unwrap();
        tree.fit(&[vec![1.0], vec![2.0]], &[1, 1]).unwrap();
        assert_eq!(tree.render(), "root: Predict: 1\n");
    }
}
