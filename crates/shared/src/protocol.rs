use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{
    domain::{AgentId, KnowledgeBaseId, SessionId, Specialist},
    error::AnalysisError,
};

/// Body of one invocation of the remote agent service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub message: String,
    pub agent_id: AgentId,
    pub knowledge_base_id: KnowledgeBaseId,
    pub session_id: SessionId,
}

/// Normalized outcome of one invocation. `response` is meaningful when
/// `success` is true, `error` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponseEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResultPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponseEnvelope {
    pub fn succeeded(payload: ResultPayload) -> Self {
        Self {
            success: true,
            response: Some(payload),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(message.into()),
        }
    }

    /// Turns the envelope into the coordinator result or the error the
    /// failure panel should show.
    pub fn into_coordinator_result(self) -> Result<CoordinatorResult, AnalysisError> {
        if !self.success {
            return Err(AnalysisError::transport(self.error));
        }
        let payload = self
            .response
            .ok_or_else(|| AnalysisError::malformed("successful envelope without response"))?;
        payload.coordinator_result()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResultPayload {
    pub fn new(result: Value) -> Self {
        Self {
            result: Some(result),
            extra: Map::new(),
        }
    }

    /// Decodes the coordinator result. Agents sometimes return the result
    /// JSON-encoded inside a string; that form is decoded once.
    pub fn coordinator_result(&self) -> Result<CoordinatorResult, AnalysisError> {
        let raw = match &self.result {
            None | Some(Value::Null) => return Err(AnalysisError::malformed("missing result")),
            Some(Value::String(encoded)) => serde_json::from_str::<Value>(encoded)
                .map_err(|err| AnalysisError::malformed(format!("result string is not JSON: {err}")))?,
            Some(value) => value.clone(),
        };
        if !raw.is_object() {
            return Err(AnalysisError::malformed("result is not an object"));
        }
        let result = CoordinatorResult::from_value(raw)
            .map_err(|err| AnalysisError::malformed(err.to_string()))?;
        if result.agent_findings.is_none() {
            return Err(AnalysisError::malformed("missing agent_findings"));
        }
        Ok(result)
    }
}

/// Consolidated finding produced by the coordinator agent.
///
/// The typed fields are a tolerant reading of the untrusted payload: absent,
/// null or wrong-typed values read as empty and non-string list entries are
/// skipped. The payload itself is kept as received and is what serializes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoordinatorResult {
    #[serde(default, deserialize_with = "lenient::string")]
    pub executive_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub agent_findings: Option<AgentFindings>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub cross_cutting_themes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub critical_red_flags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub investment_recommendation: Option<InvestmentRecommendation>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub required_actions: Option<RequiredActions>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub deal_killers_identified: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub valuation_considerations: Option<Vec<String>>,
    #[serde(skip)]
    raw: Value,
}

impl Serialize for CoordinatorResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl CoordinatorResult {
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let mut result: Self = serde_json::from_value(raw.clone())?;
        result.raw = raw;
        Ok(result)
    }

    /// The payload exactly as the coordinator sent it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn executive_summary(&self) -> &str {
        self.executive_summary.as_deref().unwrap_or_default()
    }

    pub fn cross_cutting_themes(&self) -> &[String] {
        self.cross_cutting_themes.as_deref().unwrap_or_default()
    }

    pub fn critical_red_flags(&self) -> &[String] {
        self.critical_red_flags.as_deref().unwrap_or_default()
    }

    pub fn deal_killers(&self) -> &[String] {
        self.deal_killers_identified.as_deref().unwrap_or_default()
    }

    pub fn valuation_considerations(&self) -> &[String] {
        self.valuation_considerations.as_deref().unwrap_or_default()
    }

    /// Summary a specialist contributed, if the coordinator embedded one.
    pub fn specialist_summary(&self, specialist: Specialist) -> Option<&str> {
        let findings = self.agent_findings.as_ref()?;
        let summary = match specialist {
            Specialist::Liquidity => &findings.liquidity_summary,
            Specialist::Operational => &findings.operational_summary,
            Specialist::Sustainability => &findings.sustainability_summary,
            Specialist::Audit => &findings.audit_summary,
        };
        summary.as_deref().filter(|s| !s.is_empty())
    }

    pub fn recommendation(&self) -> Option<&InvestmentRecommendation> {
        self.investment_recommendation.as_ref()
    }

    pub fn actions(&self) -> Option<&RequiredActions> {
        self.required_actions.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentFindings {
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub liquidity_summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub operational_summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub sustainability_summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub audit_summary: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRecommendation {
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub decision: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence_level: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub reasoning: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::strings",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_risks: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "lenient::strings",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_opportunities: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InvestmentRecommendation {
    pub fn decision(&self) -> &str {
        self.decision.as_deref().unwrap_or_default()
    }

    pub fn confidence_level(&self) -> &str {
        self.confidence_level.as_deref().unwrap_or_default()
    }

    pub fn reasoning(&self) -> &str {
        self.reasoning.as_deref().unwrap_or_default()
    }

    pub fn key_risks(&self) -> &[String] {
        self.key_risks.as_deref().unwrap_or_default()
    }

    pub fn key_opportunities(&self) -> &[String] {
        self.key_opportunities.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequiredActions {
    #[serde(
        default,
        deserialize_with = "lenient::strings",
        skip_serializing_if = "Option::is_none"
    )]
    pub immediate: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "lenient::strings",
        skip_serializing_if = "Option::is_none"
    )]
    pub before_closing: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "lenient::strings",
        skip_serializing_if = "Option::is_none"
    )]
    pub post_acquisition: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequiredActions {
    pub fn immediate(&self) -> &[String] {
        self.immediate.as_deref().unwrap_or_default()
    }

    pub fn before_closing(&self) -> &[String] {
        self.before_closing.as_deref().unwrap_or_default()
    }

    pub fn post_acquisition(&self) -> &[String] {
        self.post_acquisition.as_deref().unwrap_or_default()
    }
}

mod lenient {
    use serde::{de::DeserializeOwned, Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Some(text),
            _ => None,
        })
    }

    pub fn strings<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<String>>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(text) => Some(text),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        })
    }

    pub fn object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        })
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
