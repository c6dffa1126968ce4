//! Turns classifier payloads into ranked [`ClassificationResult`]s.

use crate::client::RawResponse;
use crate::{ClassificationResult, OutcomeClass, ResultOrigin};
use serde_json::{Map, Value};
use thiserror::Error;

/// Class reported at each index of a positional payload.
///
/// Assumed from the service's label order; see DESIGN.md.
pub const POSITIONAL_ORDER: [OutcomeClass; 4] = [
    OutcomeClass::GliomaTumor,
    OutcomeClass::MeningiomaTumor,
    OutcomeClass::NoTumor,
    OutcomeClass::PituitaryTumor,
];

/// Percentages shown when no model result is available, in
/// [`OutcomeClass::ALL`] order.
const FALLBACK_SCORES: [f64; 4] = [72.4, 18.6, 2.2, 6.8];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unexpected prediction format: {0}")]
    UnexpectedFormat(String),
}

/// Shape of the first `data` element.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionPayload {
    /// Up to four probabilities in [`POSITIONAL_ORDER`].
    Positional(Vec<f64>),
    /// Probabilities keyed by class, in [`OutcomeClass::ALL`] order; absent
    /// keys are `None`.
    Keyed([Option<f64>; 4]),
}

impl PredictionPayload {
    pub fn parse(value: &Value) -> Result<Self, FormatError> {
        match value {
            Value::Array(items) => parse_positional(items),
            Value::Object(map) => parse_keyed(map),
            other => Err(FormatError::UnexpectedFormat(format!(
                "expected an array or object, got {}",
                json_kind(other)
            ))),
        }
    }

    /// Probabilities in [`OutcomeClass::ALL`] order, missing entries as 0.
    pub fn probabilities(&self) -> [f64; 4] {
        let mut out = [0.0; 4];
        match self {
            PredictionPayload::Positional(values) => {
                for (class, value) in POSITIONAL_ORDER.iter().zip(values) {
                    out[class.index()] = *value;
                }
            }
            PredictionPayload::Keyed(values) => {
                for (slot, value) in out.iter_mut().zip(values) {
                    *slot = value.unwrap_or(0.0);
                }
            }
        }
        out
    }
}

fn parse_positional(items: &[Value]) -> Result<PredictionPayload, FormatError> {
    if items.len() > POSITIONAL_ORDER.len() {
        return Err(FormatError::UnexpectedFormat(format!(
            "expected at most {} scores, got {}",
            POSITIONAL_ORDER.len(),
            items.len()
        )));
    }
    let values = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_f64().ok_or_else(|| {
                FormatError::UnexpectedFormat(format!(
                    "score {idx} is {}, not a number",
                    json_kind(item)
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PredictionPayload::Positional(values))
}

fn parse_keyed(map: &Map<String, Value>) -> Result<PredictionPayload, FormatError> {
    let mut values = [None; 4];
    for class in OutcomeClass::ALL {
        // snake_case wins when both spellings are present; null counts as absent
        let Some((key, raw)) = map
            .get_key_value(class.key())
            .filter(|(_, v)| !v.is_null())
            .or_else(|| map.get_key_value(class.label()))
            .filter(|(_, v)| !v.is_null())
        else {
            continue;
        };
        let value = raw.as_f64().ok_or_else(|| {
            FormatError::UnexpectedFormat(format!("`{key}` is {}, not a number", json_kind(raw)))
        })?;
        values[class.index()] = Some(value);
    }
    Ok(PredictionPayload::Keyed(values))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Normalize a service response into percentages over all four classes.
pub fn normalize(raw: &RawResponse) -> Result<ClassificationResult, FormatError> {
    let payload = PredictionPayload::parse(raw.predictions())?;
    let scores = payload.probabilities().map(|p| p * 100.0);
    let result = ClassificationResult::ranked(scores, ResultOrigin::Model);
    if result.total_confidence() == 0.0 {
        tracing::warn!(
            payload = %raw.predictions(),
            "Prediction carried no scores for any known class"
        );
    }
    Ok(result)
}

/// The fixed demo distribution, tagged [`ResultOrigin::Fallback`].
pub fn fallback() -> ClassificationResult {
    ClassificationResult::ranked(FALLBACK_SCORES, ResultOrigin::Fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use serde_json::json;

    fn raw(predictions: Value) -> RawResponse {
        RawResponse::from_value(json!({ "data": [predictions] })).unwrap()
    }

    #[test]
    fn positional_scores_map_to_classes_and_scale() {
        let result = normalize(&raw(json!([0.7, 0.1, 0.15, 0.05]))).unwrap();
        assert_eq!(result.primary_prediction(), OutcomeClass::GliomaTumor);
        assert_relative_eq!(result.primary().confidence, 70.0, epsilon = 1e-9);
        assert_relative_eq!(result.confidence_of(OutcomeClass::MeningiomaTumor), 10.0, epsilon = 1e-9);
        assert_relative_eq!(result.confidence_of(OutcomeClass::NoTumor), 15.0, epsilon = 1e-9);
        assert_relative_eq!(result.confidence_of(OutcomeClass::PituitaryTumor), 5.0, epsilon = 1e-9);
        assert_eq!(result.origin(), ResultOrigin::Model);

        let order: Vec<OutcomeClass> = result.predictions().iter().map(|p| p.class).collect();
        assert_eq!(
            order,
            vec![
                OutcomeClass::GliomaTumor,
                OutcomeClass::NoTumor,
                OutcomeClass::MeningiomaTumor,
                OutcomeClass::PituitaryTumor,
            ]
        );
    }

    #[rstest]
    #[case([0.25, 0.25, 0.25, 0.25])]
    #[case([0.0, 0.0, 1.0, 0.0])]
    #[case([0.12, 0.33, 0.05, 0.5])]
    #[case([0.4, 0.3, 0.2, 0.1])]
    fn positional_totals_and_descending_order(#[case] probs: [f64; 4]) {
        let result = normalize(&raw(json!(probs))).unwrap();
        let expected_total: f64 = probs.iter().sum::<f64>() * 100.0;
        assert_relative_eq!(result.total_confidence(), expected_total, epsilon = 1e-9);
        for (class, p) in POSITIONAL_ORDER.iter().zip(probs) {
            assert_relative_eq!(result.confidence_of(*class), p * 100.0, epsilon = 1e-9);
        }
        assert!(
            result
                .predictions()
                .windows(2)
                .all(|w| w[0].confidence >= w[1].confidence)
        );
    }

    #[test]
    fn short_positional_payload_fills_missing_with_zero() {
        let result = normalize(&raw(json!([0.2, 0.8]))).unwrap();
        assert_eq!(result.primary_prediction(), OutcomeClass::MeningiomaTumor);
        assert_eq!(result.confidence_of(OutcomeClass::NoTumor), 0.0);
        assert_eq!(result.confidence_of(OutcomeClass::PituitaryTumor), 0.0);
        assert_eq!(result.predictions().len(), 4);
    }

    #[test]
    fn keyed_payload_accepts_both_spellings_and_prefers_snake_case() {
        let result = normalize(&raw(json!({
            "glioma_tumor": 0.1,
            "Glioma Tumor": 0.9,
            "Meningioma Tumor": 0.2,
            "no_tumor": 0.6,
            "pituitary_tumor": 0.1
        })))
        .unwrap();
        assert_relative_eq!(result.confidence_of(OutcomeClass::GliomaTumor), 10.0, epsilon = 1e-9);
        assert_relative_eq!(result.confidence_of(OutcomeClass::MeningiomaTumor), 20.0, epsilon = 1e-9);
        assert_eq!(result.primary_prediction(), OutcomeClass::NoTumor);
    }

    #[test]
    fn keyed_payload_missing_keys_become_zero_and_keep_all_classes() {
        let result = normalize(&raw(json!({ "pituitary_tumor": 0.55, "unrelated": "x" }))).unwrap();
        assert_eq!(result.predictions().len(), 4);
        for class in OutcomeClass::ALL {
            assert!(result.predictions().iter().any(|p| p.class == class));
        }
        assert_eq!(result.primary_prediction(), OutcomeClass::PituitaryTumor);
        assert_eq!(result.confidence_of(OutcomeClass::GliomaTumor), 0.0);
        // zero entries keep declaration order
        let tail: Vec<OutcomeClass> = result.predictions()[1..].iter().map(|p| p.class).collect();
        assert_eq!(
            tail,
            vec![
                OutcomeClass::NoTumor,
                OutcomeClass::GliomaTumor,
                OutcomeClass::MeningiomaTumor,
            ]
        );
    }

    #[test]
    fn null_scores_count_as_absent_keys() {
        let result = normalize(&raw(json!({
            "glioma_tumor": null,
            "Glioma Tumor": 0.8,
            "no_tumor": null,
            "meningioma_tumor": 0.2
        })))
        .unwrap();
        assert_relative_eq!(result.confidence_of(OutcomeClass::GliomaTumor), 80.0, epsilon = 1e-9);
        assert_eq!(result.confidence_of(OutcomeClass::NoTumor), 0.0);
        assert_eq!(result.primary_prediction(), OutcomeClass::GliomaTumor);
        assert_eq!(result.origin(), ResultOrigin::Model);
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({ "error": "model not loaded" }))]
    #[case(json!([]))]
    fn payload_without_known_scores_is_an_empty_model_result(#[case] payload: Value) {
        let result = normalize(&raw(payload)).unwrap();
        assert_eq!(result.total_confidence(), 0.0);
        assert_eq!(result.primary_prediction(), OutcomeClass::NoTumor);
        assert_eq!(result.origin(), ResultOrigin::Model);
    }

    #[rstest]
    #[case(json!("Glioma Tumor"))]
    #[case(json!(0.7))]
    #[case(json!(null))]
    #[case(json!([0.1, 0.2, 0.3, 0.2, 0.2]))]
    #[case(json!([0.1, "0.2"]))]
    #[case(json!({ "glioma_tumor": "high" }))]
    fn unrecognized_shapes_are_format_errors(#[case] payload: Value) {
        let err = normalize(&raw(payload)).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedFormat(_)));
    }

    #[test]
    fn parse_is_tagged_by_shape() {
        assert_eq!(
            PredictionPayload::parse(&json!([0.5])).unwrap(),
            PredictionPayload::Positional(vec![0.5])
        );
        assert_eq!(
            PredictionPayload::parse(&json!({ "No Tumor": 1 })).unwrap(),
            PredictionPayload::Keyed([Some(1.0), None, None, None])
        );
    }

    #[test]
    fn fallback_is_fixed_sorted_and_tagged() {
        let result = fallback();
        let pairs: Vec<(OutcomeClass, f64)> = result
            .predictions()
            .iter()
            .map(|p| (p.class, p.confidence))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (OutcomeClass::NoTumor, 72.4),
                (OutcomeClass::GliomaTumor, 18.6),
                (OutcomeClass::PituitaryTumor, 6.8),
                (OutcomeClass::MeningiomaTumor, 2.2),
            ]
        );
        assert_eq!(result.primary_prediction(), OutcomeClass::NoTumor);
        assert!(result.is_fallback());
        assert_relative_eq!(result.total_confidence(), 100.0, epsilon = 1e-9);
    }
}
