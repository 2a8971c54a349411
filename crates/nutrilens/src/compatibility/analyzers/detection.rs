use super::super::domain::{DetectionMethod, ProductRecord, Severity};
use super::super::restrictions::{CompiledRestriction, LimitKind, NutrientThreshold};
use super::AnalyzerLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DetectionScope {
    Full,
    TagsOnly,
}

/// Evidence gathered for one restriction key across the detection tiers.
#[derive(Debug, Clone, Default)]
pub(super) struct Detection {
    pub(super) methods: Vec<DetectionMethod>,
    pub(super) confidence: u8,
    pub(super) tag_matched: bool,
    pub(super) evidence: Vec<String>,
}

impl Detection {
    fn record(&mut self, method: DetectionMethod, confidence: u8, evidence: String) {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self.confidence = self.confidence.max(confidence);
        self.evidence.push(evidence);
    }

    pub(super) fn severity(&self, limits: &AnalyzerLimits) -> Severity {
        if self.tag_matched || self.confidence >= limits.critical_confidence {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }

    pub(super) fn trace_only(&self) -> bool {
        self.methods == [DetectionMethod::TraceMatch]
    }
}

/// Runs the tiers in order: tag, ingredient text, trace, keyword. Confidence is the max seen.
pub(super) fn detect(
    rule: &CompiledRestriction,
    product: &ProductRecord,
    limits: &AnalyzerLimits,
    scope: DetectionScope,
) -> Option<Detection> {
    let definition = rule.definition();
    let mut detection = Detection::default();

    for tag in definition.tags.iter().filter(|tag| product.carries_tag(tag)) {
        detection.tag_matched = true;
        detection.record(
            DetectionMethod::TagMatch,
            limits.tag_confidence,
            format!("tagged {tag}"),
        );
    }

    if scope == DetectionScope::Full {
        if let Some(found) = rule
            .ingredient_pattern()
            .and_then(|pattern| pattern.find(&product.ingredients_text))
        {
            detection.record(
                DetectionMethod::TextMatch,
                limits.text_confidence,
                format!("ingredient \"{}\"", found.as_str().to_lowercase()),
            );
        }

        for tag in definition
            .tags
            .iter()
            .filter(|tag| product.trace_tags.contains(*tag))
        {
            detection.record(
                DetectionMethod::TraceMatch,
                limits.trace_confidence,
                format!("may contain traces ({tag})"),
            );
        }

        let haystack = format!("{} {}", product.name, product.ingredients_text).to_lowercase();
        if let Some(keyword) = definition
            .keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .find(|keyword| !keyword.is_empty() && haystack.contains(keyword.as_str()))
        {
            detection.record(
                DetectionMethod::KeywordMatch,
                limits.keyword_confidence,
                format!("mentions \"{keyword}\""),
            );
        }
    }

    if detection.methods.is_empty() {
        None
    } else {
        Some(detection)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct ThresholdBreach {
    pub(super) threshold: NutrientThreshold,
    pub(super) measured: f64,
}

impl ThresholdBreach {
    /// Ceilings exceeded more than twofold are critical; floors only warn.
    pub(super) fn severity(&self) -> Severity {
        match self.threshold.kind {
            LimitKind::Max if self.measured > self.threshold.limit * 2.0 => Severity::Critical,
            _ => Severity::Warning,
        }
    }

    pub(super) fn describe(&self) -> String {
        let nutrient = self.threshold.nutrient;
        let relation = match self.threshold.kind {
            LimitKind::Max => "exceeds limit",
            LimitKind::Min => "is below minimum",
        };
        format!(
            "{} {:.1} {unit}/100g {relation} {:.1} {unit}",
            nutrient.label(),
            self.measured,
            self.threshold.limit,
            unit = nutrient.unit(),
        )
    }
}

pub(super) fn check_thresholds(
    rule: &CompiledRestriction,
    product: &ProductRecord,
) -> Vec<ThresholdBreach> {
    rule.definition()
        .thresholds
        .iter()
        .filter_map(|threshold| {
            let measured = product.nutrients.get(threshold.nutrient);
            let breached = match threshold.kind {
                LimitKind::Max => measured > threshold.limit,
                LimitKind::Min => measured < threshold.limit,
            };
            breached.then_some(ThresholdBreach {
                threshold: *threshold,
                measured,
            })
        })
        .collect()
}
