use serde::{Deserialize, Serialize};

/// Inbound natural-language request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default)]
    pub natural_language: String,
    #[serde(default)]
    pub previous_query: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl GenerationRequest {
    /// The request text with any feedback appended as a labelled addendum.
    pub fn enhanced_question(&self) -> String {
        match self.feedback.as_deref().map(str::trim) {
            Some(feedback) if !feedback.is_empty() => {
                format!("{}\nUser feedback: {}", self.natural_language, feedback)
            }
            _ => self.natural_language.clone(),
        }
    }
}

/// SQL plus explanation, from the text generator or the fallback rules.
/// `sql` is `None` only when the fallback found nothing to offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuery {
    pub sql: Option<String>,
    pub explanation: String,
    #[serde(rename = "fallback")]
    pub is_fallback: bool,
}
