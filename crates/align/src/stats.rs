use serde::{Deserialize, Serialize};

use crate::types::{DiffOperation, OpKind};

/// Operation counts and character volumes of an edit script, measured in
/// key characters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffStatistics {
    pub equal_ops: usize,
    pub insert_ops: usize,
    pub delete_ops: usize,
    pub replace_ops: usize,
    pub added_chars: usize,
    pub deleted_chars: usize,
    pub replaced_chars_a: usize,
    pub replaced_chars_b: usize,
    /// Characters gained by B over A.
    pub net_change: i64,
}

impl DiffStatistics {
    pub fn from_operations(ops: &[DiffOperation]) -> Self {
        let mut stats = Self::default();
        for op in ops {
            match op.kind {
                OpKind::Equal => stats.equal_ops += 1,
                OpKind::Insert => {
                    stats.insert_ops += 1;
                    stats.added_chars += op.b_weight();
                }
                OpKind::Delete => {
                    stats.delete_ops += 1;
                    stats.deleted_chars += op.a_weight();
                }
                OpKind::Replace => {
                    stats.replace_ops += 1;
                    stats.replaced_chars_a += op.a_weight();
                    stats.replaced_chars_b += op.b_weight();
                }
            }
        }
        let gained = (stats.added_chars + stats.replaced_chars_b) as i64;
        let lost = (stats.deleted_chars + stats.replaced_chars_a) as i64;
        stats.net_change = gained - lost;
        stats
    }

    /// Number of insert, delete and replace operations.
    pub fn changes(&self) -> usize {
        self.insert_ops + self.delete_ops + self.replace_ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segment::{segment, Granularity};

    #[test]
    fn counts_and_volumes() {
        let w = |t: &str| segment(t, Granularity::Word);
        let ops = vec![
            DiffOperation::equal(0, 0, &w("same "), &w("same ")),
            DiffOperation::replace(1, 1, &w("old"), &w("newer")),
            DiffOperation::delete(2, 2, &w("gone ")),
            DiffOperation::insert(3, 2, &w("extra words")),
        ];
        let stats = DiffStatistics::from_operations(&ops);
        assert_eq!(
            stats,
            DiffStatistics {
                equal_ops: 1,
                insert_ops: 1,
                delete_ops: 1,
                replace_ops: 1,
                added_chars: 10,
                deleted_chars: 4,
                replaced_chars_a: 3,
                replaced_chars_b: 5,
                net_change: 8,
            }
        );
        assert_eq!(stats.changes(), 3);
    }
}
