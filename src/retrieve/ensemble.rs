use tracing::debug;

use super::fusion::{RankFusion, RankedList, WeightedRrf};
use super::{RetrieveError, RetrievedDocument, Retriever};

const PRIMARY_WEIGHT: f64 = 0.7;
const SECONDARY_WEIGHT: f64 = 0.3;

/// Queries two backends concurrently and merges their rankings.
///
/// The primary backend (web search) is weighted 0.7 and the secondary
/// (encyclopedia) 0.3 unless overridden. If either backend fails the whole
/// retrieval fails.
pub struct EnsembleRetriever<P, S, F = WeightedRrf> {
    primary: P,
    secondary: S,
    weights: (f64, f64),
    fusion: F,
}

impl<P, S> EnsembleRetriever<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self {
            primary,
            secondary,
            weights: (PRIMARY_WEIGHT, SECONDARY_WEIGHT),
            fusion: WeightedRrf::default(),
        }
    }
}

impl<P, S, F> EnsembleRetriever<P, S, F> {
    pub fn with_weights(mut self, primary: f64, secondary: f64) -> Self {
        self.weights = (primary, secondary);
        self
    }

    #[cfg(test)]
    pub fn with_fusion<G: RankFusion>(self, fusion: G) -> EnsembleRetriever<P, S, G> {
        EnsembleRetriever {
            primary: self.primary,
            secondary: self.secondary,
            weights: self.weights,
            fusion,
        }
    }
}

impl<P: Retriever, S: Retriever, F: RankFusion> Retriever for EnsembleRetriever<P, S, F> {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, RetrieveError> {
        let (primary, secondary) = tokio::try_join!(
            self.primary.retrieve(query),
            self.secondary.retrieve(query)
        )?;

        debug!(
            primary = primary.len(),
            secondary = secondary.len(),
            "merging backend results"
        );

        Ok(self.fusion.fuse(vec![
            RankedList {
                weight: self.weights.0,
                documents: primary,
            },
            RankedList {
                weight: self.weights.1,
                documents: secondary,
            },
        ]))
    }
}
