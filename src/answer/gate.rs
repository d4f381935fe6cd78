use super::GroundedAnswer;

/// Grounded answers at or below this probability are replaced by the fallback model.
pub const CONFIDENCE_THRESHOLD: f64 = 0.9;

/// What to do with a grounded answer.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Confident and present; use this text.
    Accept(String),
    /// Not confident enough; ask the fallback model.
    Fallback,
    /// Confident but the response carried no text.
    Malformed,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: f64,
}

impl ConfidenceGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Probability is checked before text, so an empty low-confidence answer falls back.
    pub fn decide(&self, answer: &GroundedAnswer) -> GateDecision {
        if answer.answerable_probability <= self.threshold {
            return GateDecision::Fallback;
        }
        match &answer.text {
            Some(text) => GateDecision::Accept(text.clone()),
            None => GateDecision::Malformed,
        }
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(CONFIDENCE_THRESHOLD)
    }
}
