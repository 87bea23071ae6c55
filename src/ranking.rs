//! Result ranking.
//!
//! The raw output tensor of a classification model is a flat vector of
//! per-class scores, but what those scores mean varies by model: a softmax
//! distribution, raw logits, or something else entirely. An
//! [`OutputInterpreter`] normalizes the raw tensor into comparable scores;
//! [`TopK`] then produces the ranked top-K list surfaced to the caller.

use crate::errors::{ClassifierError, ClassifierResult};

/// One ranked classification result.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Index of the class in the model's output tensor.
    pub class_id: usize,
    /// Human-readable label, or `class_{id}` when no label table covers it.
    pub label: String,
    /// Interpreted score for the class.
    pub score: f32,
}

/// Interprets a raw output tensor as per-class scores.
///
/// Implemented per concrete model variant and selected at classifier
/// construction time.
pub trait OutputInterpreter: std::fmt::Debug + Send + Sync {
    /// Converts the raw output tensor into one score per class.
    fn interpret(&self, raw: &[f32]) -> ClassifierResult<Vec<f32>>;
}

/// Interpreter for models whose outputs are already probabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityInterpreter;

impl OutputInterpreter for IdentityInterpreter {
    fn interpret(&self, raw: &[f32]) -> ClassifierResult<Vec<f32>> {
        if raw.is_empty() {
            return Err(ClassifierError::invalid_input(
                "model produced an empty output tensor",
            ));
        }
        Ok(raw.to_vec())
    }
}

/// Interpreter for models that emit raw logits; applies a numerically
/// stable softmax so scores form a probability distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftmaxInterpreter;

impl OutputInterpreter for SoftmaxInterpreter {
    fn interpret(&self, raw: &[f32]) -> ClassifierResult<Vec<f32>> {
        if raw.is_empty() {
            return Err(ClassifierError::invalid_input(
                "model produced an empty output tensor",
            ));
        }
        let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = raw.iter().map(|&v| (v - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Err(ClassifierError::invalid_input(
                "softmax normalization failed: output scores are degenerate",
            ));
        }
        Ok(exps.into_iter().map(|e| e / sum).collect())
    }
}

/// Extracts the K highest-scoring classes, ordered descending by score.
///
/// Ties are broken by the class's original output index: the first-seen
/// class wins.
#[derive(Debug)]
pub struct TopK {
    k: usize,
    labels: Vec<String>,
}

impl TopK {
    /// Creates a ranker returning at most `k` entries, labelled from
    /// `labels` (index = class id).
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::InvalidConfig` if `k` is 0.
    pub fn new(k: usize, labels: Vec<String>) -> ClassifierResult<Self> {
        if k == 0 {
            return Err(ClassifierError::invalid_config(
                "top-k must be greater than 0",
            ));
        }
        Ok(Self { k, labels })
    }

    /// Returns the configured ranking depth.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Adjusts the ranking depth.
    pub fn set_k(&mut self, k: usize) -> ClassifierResult<()> {
        if k == 0 {
            return Err(ClassifierError::invalid_config(
                "top-k must be greater than 0",
            ));
        }
        self.k = k;
        Ok(())
    }

    /// Returns the label for `class_id`, falling back to `class_{id}`.
    pub fn label_for(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }

    /// Ranks `scores` and returns at most K predictions, strictly ordered
    /// by descending score with ties broken by lower class id.
    pub fn rank(&self, scores: &[f32]) -> Vec<Prediction> {
        let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        // Stable sort keeps equal scores in original index order.
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        indexed
            .into_iter()
            .take(self.k.min(scores.len()))
            .map(|(class_id, score)| Prediction {
                class_id,
                label: self.label_for(class_id),
                score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ranks_descending_by_score() {
        let topk = TopK::new(3, labels(&["cat", "dog", "bird"])).unwrap();
        let predictions = topk.rank(&[0.1, 0.8, 0.1]);
        assert_eq!(predictions[0].label, "dog");
        assert!(predictions[0].score >= predictions[1].score);
        assert!(predictions[1].score >= predictions[2].score);
    }

    #[test]
    fn ranks_a_two_class_output() {
        let topk = TopK::new(3, labels(&["class0", "class1"])).unwrap();
        let predictions = topk.rank(&[0.9, 0.1]);
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].class_id, 0);
        assert_eq!(predictions[0].score, 0.9);
        assert_eq!(predictions[1].class_id, 1);
        assert_eq!(predictions[1].score, 0.1);
    }

    #[test]
    fn ties_break_toward_lower_class_id() {
        let topk = TopK::new(4, vec![]).unwrap();
        let predictions = topk.rank(&[0.25, 0.5, 0.25, 0.5]);
        assert_eq!(
            predictions.iter().map(|p| p.class_id).collect::<Vec<_>>(),
            vec![1, 3, 0, 2]
        );
    }

    #[test]
    fn returns_at_most_k_entries() {
        let topk = TopK::new(2, vec![]).unwrap();
        assert_eq!(topk.rank(&[0.1, 0.2, 0.3, 0.4]).len(), 2);
        // K larger than the class count is clamped.
        let wide = TopK::new(10, vec![]).unwrap();
        assert_eq!(wide.rank(&[0.6, 0.4]).len(), 2);
    }

    #[test]
    fn missing_labels_fall_back_to_class_id() {
        let topk = TopK::new(2, labels(&["only_one"])).unwrap();
        let predictions = topk.rank(&[0.3, 0.7]);
        assert_eq!(predictions[0].label, "class_1");
        assert_eq!(predictions[1].label, "only_one");
    }

    #[test]
    fn zero_k_is_rejected() {
        assert!(TopK::new(0, vec![]).is_err());
        let mut topk = TopK::new(1, vec![]).unwrap();
        assert!(topk.set_k(0).is_err());
        assert!(topk.set_k(5).is_ok());
        assert_eq!(topk.k(), 5);
    }

    #[test]
    fn softmax_produces_a_distribution_preserving_order() {
        let interp = SoftmaxInterpreter;
        let scores = interp.interpret(&[2.0, 1.0, 0.5]).unwrap();
        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(scores[0] > scores[1] && scores[1] > scores[2]);
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let interp = SoftmaxInterpreter;
        let scores = interp.interpret(&[1000.0, 999.0]).unwrap();
        assert!(scores.iter().all(|s| s.is_finite()));
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn interpreters_reject_empty_outputs() {
        assert!(IdentityInterpreter.interpret(&[]).is_err());
        assert!(SoftmaxInterpreter.interpret(&[]).is_err());
    }
}
