use std::collections::HashMap;

use super::RetrievedDocument;

/// One backend's ranked output together with the weight it carries in the merge.
#[derive(Debug, Clone)]
pub struct RankedList {
    pub weight: f64,
    pub documents: Vec<RetrievedDocument>,
}

/// Merges several ranked lists into one ordering.
pub trait RankFusion {
    fn fuse(&self, lists: Vec<RankedList>) -> Vec<RetrievedDocument>;
}

/// Weighted reciprocal rank fusion.
///
/// Each occurrence of a document at 1-based rank `r` in a list of weight `w`
/// contributes `w / (k + r)`. Documents are identified by their text, so the
/// same passage returned by two backends collapses into one entry (the first
/// occurrence wins). Equal scores keep first-appearance order.
#[derive(Debug, Clone, Copy)]
pub struct WeightedRrf {
    pub k: f64,
}

impl Default for WeightedRrf {
    fn default() -> Self {
        Self { k: 60.0 }
    }
}

impl RankFusion for WeightedRrf {
    fn fuse(&self, lists: Vec<RankedList>) -> Vec<RetrievedDocument> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut scored: Vec<(RetrievedDocument, f64)> = Vec::new();

        for list in lists {
            for (rank, doc) in list.documents.into_iter().enumerate() {
                let contribution = list.weight / (self.k + rank as f64 + 1.0);
                match positions.get(&doc.text).copied() {
                    Some(i) => scored[i].1 += contribution,
                    None => {
                        positions.insert(doc.text.clone(), scored.len());
                        scored.push((doc, contribution));
                    }
                }
            }
        }

        // stable: ties stay in first-appearance order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.into_iter().map(|(doc, _)| doc).collect()
    }
}
