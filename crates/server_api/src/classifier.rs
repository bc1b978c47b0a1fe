use thiserror::Error;

use crate::preprocess::ModelInput;

/// Category labels in the order the model's output scores are encoded.
pub const CATEGORY_NAMES: [&str; 30] = [
    "Aloe Vera",
    "Banana",
    "Bilimbi",
    "Cantaloupe",
    "Cassava",
    "Coconut",
    "Corn",
    "Cucumber",
    "Curcuma",
    "Eggplant",
    "Galangal",
    "Ginger",
    "Guava",
    "Kale",
    "Longbeans",
    "Mango",
    "Melon",
    "Orange",
    "Paddy",
    "Papaya",
    "Peperchili",
    "Pineapple",
    "Pomelo",
    "Shallot",
    "Soybeans",
    "Spinach",
    "Sweetpotatoes",
    "Tobacco",
    "Waterapple",
    "Watermelon",
];

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("input tensor has {actual} values, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Produces one score per entry of [`CATEGORY_NAMES`] for a preprocessed image.
pub trait Classifier: Send + Sync {
    fn classify(&self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError>;
}

pub struct MissingClassifier;

impl Classifier for MissingClassifier {
    fn classify(&self, _input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        Err(ClassifierError::Unavailable(
            "no classification model is configured".to_string(),
        ))
    }
}

/// Development stand-in that always scores a single configured category.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    index: usize,
}

impl StaticClassifier {
    pub fn for_label(label: &str) -> Option<Self> {
        let label = label.trim();
        CATEGORY_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(label))
            .map(|index| Self { index })
    }

    pub fn label(&self) -> &'static str {
        CATEGORY_NAMES[self.index]
    }
}

impl Classifier for StaticClassifier {
    fn classify(&self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        if input.data.len() != input.expected_len() {
            return Err(ClassifierError::ShapeMismatch {
                expected: input.expected_len(),
                actual: input.data.len(),
            });
        }
        let mut scores = vec![0.0; CATEGORY_NAMES.len()];
        scores[self.index] = 1.0;
        Ok(scores)
    }
}

/// Maps the highest score to its category name. Ties resolve to the lowest
/// index; NaN scores are ignored.
pub fn predicted_category(scores: &[f32]) -> Option<&'static str> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((index, score)),
        }
    }
    best.and_then(|(index, _)| CATEGORY_NAMES.get(index).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_input() -> ModelInput {
        ModelInput {
            width: 2,
            height: 2,
            data: vec![1.0; 12],
        }
    }

    #[test]
    fn argmax_picks_highest_score() {
        let mut scores = vec![0.01; CATEGORY_NAMES.len()];
        scores[15] = 0.9;
        assert_eq!(predicted_category(&scores), Some("Mango"));
    }

    #[test]
    fn argmax_prefers_first_of_equal_scores() {
        let scores = [0.5, 0.5, 0.1];
        assert_eq!(predicted_category(&scores), Some("Aloe Vera"));
    }

    #[test]
    fn argmax_skips_nan_and_rejects_empty_or_out_of_range() {
        assert_eq!(predicted_category(&[f32::NAN, 0.2]), Some("Banana"));
        assert_eq!(predicted_category(&[]), None);
        let mut scores = vec![0.0; CATEGORY_NAMES.len() + 1];
        scores[CATEGORY_NAMES.len()] = 1.0;
        assert_eq!(predicted_category(&scores), None);
    }

    #[test]
    fn static_classifier_matches_labels_case_insensitively() {
        let classifier = StaticClassifier::for_label(" watermelon ").expect("known label");
        assert_eq!(classifier.label(), "Watermelon");
        let scores = classifier.classify(&blank_input()).expect("scores");
        assert_eq!(predicted_category(&scores), Some("Watermelon"));
        assert!(StaticClassifier::for_label("durian").is_none());
    }

    #[test]
    fn static_classifier_rejects_malformed_tensor() {
        let classifier = StaticClassifier::for_label("Kale").expect("known label");
        let input = ModelInput {
            width: 2,
            height: 2,
            data: vec![0.0; 5],
        };
        assert!(matches!(
            classifier.classify(&input),
            Err(ClassifierError::ShapeMismatch {
                expected: 12,
                actual: 5
            })
        ));
    }

    #[test]
    fn missing_classifier_reports_unavailable() {
        assert!(matches!(
            MissingClassifier.classify(&blank_input()),
            Err(ClassifierError::Unavailable(_))
        ));
    }
}
