//! Narrative collaborator backed by a chat-completion LLM.
//!
//! This adapter only moves bytes: it serializes the context, asks for JSON,
//! and hands back whatever object came out. Shape checking is the
//! validator's job.

use std::sync::Arc;

use async_trait::async_trait;

use crate::infrastructure::ports::{
    ChatMessage, LlmPort, LlmRequest, NarrativeContext, NarrativeError, NarrativePort,
    PerkContext,
};

const TURN_CONTRACT: &str = r#"You narrate a turn-based superhero story for several players.
Reply with a single JSON object and nothing else.
If the player's action is impossible, reply {"valid": false, "validationError": "<why>"}.
Otherwise reply {"valid": true, "narrative": "<story>",
 "choices": [{"label": "A", "description": "...", "riskLevel": "low|medium|high|extreme"}, ... exactly A, B, C, D],
 "statUpdates": [{"characterId": "<id from context>", "changes": {"hp": <delta>, "level": <int>,
   "attributes": {"strength": <int>}, "statuses": [{"name": "...", "description": "...", "duration": <turns>, "effect": "..."}],
   "newPerks": [{"name": "...", "description": "..."}]}}]}
Use character ids, never names, in characterId."#;

const PERK_CONTRACT: &str = r#"A character just leveled up. Invent one perk that fits their powers and weakness.
Reply with a single JSON object: {"name": "<perk name>", "description": "<what it does>"}."#;

pub struct LlmNarrativeGenerator {
    llm: Arc<dyn LlmPort>,
    temperature: f32,
}

impl LlmNarrativeGenerator {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self {
            llm,
            temperature: 0.8,
        }
    }

    async fn ask(&self, contract: &str, payload: String) -> Result<serde_json::Value, NarrativeError> {
        let request = LlmRequest::new(vec![ChatMessage::user(payload)])
            .with_system_prompt(contract)
            .with_temperature(self.temperature);

        let response = self.llm.generate(request).await?;
        if let Some(usage) = response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Narrative generation finished"
            );
        }
        extract_json_object(&response.content)
    }
}

#[async_trait]
impl NarrativePort for LlmNarrativeGenerator {
    async fn generate_turn(
        &self,
        context: &NarrativeContext,
    ) -> Result<serde_json::Value, NarrativeError> {
        let payload = serde_json::to_string(context)
            .map_err(|e| NarrativeError::RequestFailed(format!("context serialization: {e}")))?;
        self.ask(TURN_CONTRACT, payload).await
    }

    async fn generate_perk(
        &self,
        context: &PerkContext,
    ) -> Result<serde_json::Value, NarrativeError> {
        let payload = serde_json::to_string(context)
            .map_err(|e| NarrativeError::RequestFailed(format!("context serialization: {e}")))?;
        self.ask(PERK_CONTRACT, payload).await
    }
}

/// Pull the outermost JSON object out of a reply that may carry code fences
/// or chatter around it.
fn extract_json_object(content: &str) -> Result<serde_json::Value, NarrativeError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let slice = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(NarrativeError::InvalidResponse(
                "reply contains no JSON object".to_string(),
            ))
        }
    };
    serde_json::from_str(slice).map_err(|e| NarrativeError::InvalidResponse(e.to_string()))
}
