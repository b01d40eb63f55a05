use serde::{Deserialize, Serialize};

use crate::types::{DiffOperation, OpKind};

/// Default number of additions and removals reported.
pub const DEFAULT_TOP_K: usize = 5;

/// Coarse risk rating attached by a narrative summarizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Largest additions and removals, plus optional narrative fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChangeSummary {
    pub major_additions: Vec<String>,
    pub major_removals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

/// Pick the `top_k` largest insert and delete blocks.
///
/// Blocks rank by key weight, then token count, then earliest position.
/// Each entry is the block's exact source text. Whitespace-only blocks are
/// skipped.
pub fn group_changes(ops: &[DiffOperation], top_k: usize) -> ChangeSummary {
    ChangeSummary {
        major_additions: top_blocks(ops, OpKind::Insert, top_k),
        major_removals: top_blocks(ops, OpKind::Delete, top_k),
        executive_summary: None,
        risk_level: None,
    }
}

fn top_blocks(ops: &[DiffOperation], kind: OpKind, top_k: usize) -> Vec<String> {
    let mut blocks: Vec<(usize, usize, usize, &DiffOperation)> = ops
        .iter()
        .filter(|op| op.kind == kind)
        .map(|op| match kind {
            OpKind::Insert => (op.b_weight(), op.b_content.len(), op.b_position, op),
            _ => (op.a_weight(), op.a_content.len(), op.position, op),
        })
        .filter(|(weight, ..)| *weight > 0)
        .collect();
    blocks.sort_by(|x, y| y.0.cmp(&x.0).then(y.1.cmp(&x.1)).then(x.2.cmp(&y.2)));

    blocks
        .into_iter()
        .take(top_k)
        .map(|(.., op)| match kind {
            OpKind::Insert => op.b_text(),
            _ => op.a_text(),
        })
        .collect()
}
