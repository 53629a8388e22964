// ============================================================
// Layer 6 — Model Graph Export
// ============================================================
// Writes a Graphviz DOT description of a classifier: one input
// node per modality tensor, one node per active branch (with its
// parameter count), the concatenation and the head.
//
// Render with:  dot -Tpng model.dot -o model.png

use anyhow::{Context, Result};
use std::{fmt::Write as _, fs, path::Path};

use crate::domain::modality::Modality;
use crate::ml::model::BranchSummary;

fn input_label(branch: &str) -> &'static str {
    match branch {
        "ImageCnn"    => "image [B,3,56,56]",
        "TextEncoder" => "tokens [B,L]",
        "BertEncoder" => "bert ids+mask [B,16]",
        _             => "input",
    }
}

/// DOT text for the given branches. The last entry is the head.
pub fn render_dot(modality: Modality, branches: &[BranchSummary]) -> String {
    let mut dot = String::new();
    let _ = writeln!(dot, "digraph meme_classifier {{");
    let _ = writeln!(dot, "  rankdir=LR;");
    let _ = writeln!(dot, "  label=\"modality: {modality}\";");
    let _ = writeln!(dot, "  node [shape=box];");

    let Some((head, encoders)) = branches.split_last() else {
        let _ = writeln!(dot, "}}");
        return dot;
    };

    for (i, b) in encoders.iter().enumerate() {
        let _ = writeln!(dot, "  in{i} [label=\"{}\", shape=ellipse];", input_label(b.name));
        let _ = writeln!(
            dot,
            "  b{i} [label=\"{}\\n{} params\\n→ {} features\"];",
            b.name, b.params, b.features,
        );
        let _ = writeln!(dot, "  in{i} -> b{i};");
        let _ = writeln!(dot, "  b{i} -> concat;");
    }
    let _ = writeln!(dot, "  concat [label=\"concat\", shape=circle];");
    let _ = writeln!(dot, "  head [label=\"{}\\n{} params\"];", head.name, head.params);
    let _ = writeln!(dot, "  logits [label=\"logits [B,{}]\", shape=ellipse];", head.features);
    let _ = writeln!(dot, "  concat -> head;");
    let _ = writeln!(dot, "  head -> logits;");
    let _ = writeln!(dot, "}}");
    dot
}

pub fn write_dot(path: &Path, modality: Modality, branches: &[BranchSummary]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    fs::write(path, render_dot(modality, branches))
        .with_context(|| format!("Cannot write graph to '{}'", path.display()))?;
    tracing::info!("Model graph written to '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branches() -> Vec<BranchSummary> {
        vec![
            BranchSummary { name: "ImageCnn", params: 2_000_000, features: 64 },
            BranchSummary { name: "TextEncoder", params: 5_000, features: 64 },
            BranchSummary { name: "Head", params: 387, features: 3 },
        ]
    }

    #[test]
    fn test_dot_lists_every_branch() {
        let dot = render_dot(Modality::ImageText, &branches());
        assert!(dot.starts_with("digraph meme_classifier {"));
        assert!(dot.contains("b0 -> concat;"));
        assert!(dot.contains("b1 -> concat;"));
        assert!(dot.contains("TextEncoder\\n5000 params"));
        assert!(dot.contains("logits [B,3]"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_empty_branch_list_is_still_valid_dot() {
        let dot = render_dot(Modality::Image, &[]);
        assert!(dot.trim_end().ends_with('}'));
        assert!(!dot.contains("concat"));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphs").join("model.dot");
        write_dot(&path, Modality::ImageText, &branches()).unwrap();
        assert!(fs::read_to_string(path).unwrap().contains("image [B,3,56,56]"));
    }

    #[test]
    fn test_unusable_parent_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = write_dot(&blocker.join("model.dot"), Modality::Image, &[]).unwrap_err();
        assert!(format!("{err:#}").contains("Cannot create"));
    }
}
