use crate::domain::{is_present, ScoredField};

/// Confidence that a field value is correct, in [0, 1].
///
/// Adjustments are applied in a fixed order and later ones may override
/// earlier ones: external corroboration boost, exact-equality floor, then the
/// low-fuzzy penalty.
pub fn field_confidence(
    original: Option<&str>,
    validated: Option<&str>,
    external_match: bool,
    fuzzy_score: f64,
) -> f64 {
    let (original, validated) = match (original, validated) {
        (Some(o), Some(v)) if is_present(Some(o)) && is_present(Some(v)) => (o, v),
        (o, v) if !is_present(o) && !is_present(v) => return 0.0,
        // One-sided evidence is weak
        _ => return 0.3,
    };

    let mut base = if fuzzy_score > 0.0 { fuzzy_score } else { 0.5 };

    if external_match {
        base = (base + 0.3).min(1.0);
    }

    if original.trim().to_lowercase() == validated.trim().to_lowercase() {
        base = base.max(0.9);
    }

    if fuzzy_score < 0.5 {
        base = (base - 0.2).max(0.0);
    }

    base.clamp(0.0, 1.0)
}

/// Weighted average of per-field confidences.
///
/// Every scored field's weight counts in the denominator whether or not the
/// field appears in `scores`; missing fields contribute 0.
pub fn overall_confidence<I>(scores: I) -> f64
where
    I: IntoIterator<Item = (ScoredField, f64)>,
{
    let scores: Vec<(ScoredField, f64)> = scores.into_iter().collect();

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for field in ScoredField::ALL {
        let score = scores
            .iter()
            .rev()
            .find(|(f, _)| *f == field)
            .map(|(_, s)| s.clamp(0.0, 1.0))
            .unwrap_or(0.0);
        weighted_sum += field.weight() * score;
        total_weight += field.weight();
    }

    if total_weight == 0.0 {
        return 0.0;
    }
    (weighted_sum / total_weight).clamp(0.0, 1.0)
}
