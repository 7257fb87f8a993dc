//! Natural-language strategy interpretation via an OpenAI-compatible
//! chat-completions endpoint.
//!
//! The model is treated as an untrusted function: its reply is stripped of
//! markdown fences and decoded strictly. A reply that does not decode is
//! reported as [`Interpretation::ParseFailure`], never coerced.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::PortfolioError;
use crate::strategy::parse_strategy;
use crate::types::PortfolioStrategy;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You are a DeFi portfolio strategist. You translate a user's \
investment goals into a structured allocation. Respond with JSON only.";

/// Outcome of asking the model for a strategy
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Strategy(PortfolioStrategy),
    ParseFailure { raw: String, reason: String },
}

#[async_trait]
pub trait StrategyInterpreter: Send + Sync {
    async fn interpret(&self, description: &str) -> Result<Interpretation, PortfolioError>;
}

fn build_prompt(description: &str) -> String {
    format!(
        "Create a DeFi portfolio strategy for this request:\n\
         \"{description}\"\n\n\
         Respond with a single JSON object and nothing else, using exactly this shape:\n\
         {{\n\
         \"riskLevel\": \"conservative\" | \"moderate\" | \"aggressive\",\n\
         \"allocations\": {{ \"lending\": <percent>, \"liquidity\": <percent> }},\n\
         \"preferences\": {{\n\
         \"stablecoinsOnly\": <boolean>,\n\
         \"preferredAssets\": [<token symbols>],\n\
         \"minimumAPY\": <percent, omit if not requested>\n\
         }}\n\
         }}\n\
         lending + liquidity must equal 100. Lending goes to Aave or Compound; \
         liquidity goes to Uniswap pools."
    )
}

/// Strip markdown code fences and surrounding prose from a model reply.
pub fn clean_llm_response(s: &str) -> &str {
    if let Some(start) = s.find("```json") {
        let after = &s[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    if let Some(start) = s.find("```") {
        let after = &s[start + 3..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    if let (Some(start), Some(end)) = (s.find('{'), s.rfind('}')) {
        if start < end {
            return &s[start..=end];
        }
    }
    s.trim()
}

/// Decode a raw model reply into a tagged interpretation.
pub fn decode_reply(content: &str) -> Interpretation {
    let cleaned = clean_llm_response(content);
    let value: serde_json::Value = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(e) => {
            return Interpretation::ParseFailure {
                raw: content.to_string(),
                reason: format!("invalid JSON: {e}"),
            };
        }
    };

    match parse_strategy(&value) {
        Ok(strategy) => Interpretation::Strategy(strategy),
        Err(e) => Interpretation::ParseFailure {
            raw: content.to_string(),
            reason: e.to_string(),
        },
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiInterpreter {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAiInterpreter {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, PortfolioError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into(),
            client: builder.build()?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl StrategyInterpreter for OpenAiInterpreter {
    async fn interpret(&self, description: &str) -> Result<Interpretation, PortfolioError> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "temperature": 0.1,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": build_prompt(description)}
                ]
            }))
            .send()
            .await
            .map_err(|e| PortfolioError::upstream("strategy from LLM", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PortfolioError::upstream(
                "strategy from LLM",
                format!("LLM API returned {status}: {body}"),
            ));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PortfolioError::upstream("strategy from LLM", e))?;

        let Some(content) = body["choices"][0]["message"]["content"].as_str() else {
            return Ok(Interpretation::ParseFailure {
                raw: body.to_string(),
                reason: "response has no message content".into(),
            });
        };

        let interpretation = decode_reply(content);
        if let Interpretation::ParseFailure { reason, .. } = &interpretation {
            tracing::warn!(model = %self.model, reason = %reason, "LLM returned an unusable strategy");
        }
        Ok(interpretation)
    }
}
