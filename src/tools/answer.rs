//! Free-form answer tool
//!
//! Delegates general dining questions to the model's own knowledge with no
//! index access. Best-effort: model outages degrade to a failure result the
//! loop can narrate, not an error.

use super::{arg_str, names, Tool, ToolMetadata, ToolParameter, ToolResult};
use crate::core::llm::{LanguageModel, ModelTurn, PromptMessage};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const ANSWER_SYSTEM_PROMPT: &str =
    "You are a knowledgeable dining assistant. Answer the question directly \
     from general culinary knowledge. Do not invent specific restaurants, \
     addresses or phone numbers.";

pub struct FreeFormAnswerTool {
    model: Arc<dyn LanguageModel>,
}

impl FreeFormAnswerTool {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Tool for FreeFormAnswerTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: names::FREE_FORM_ANSWER.to_string(),
            description: "Answer a general dining or food question from general knowledge, \
                          without searching the restaurant index."
                .to_string(),
            parameters: vec![ToolParameter::required(
                "question",
                "string",
                "The question to answer",
            )],
            requires_session: false,
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let question = match arg_str(&args, "question") {
            Some(q) => q,
            None => return Ok(ToolResult::failure("missing required argument 'question'")),
        };

        let messages = [
            PromptMessage::System(ANSWER_SYSTEM_PROMPT.to_string()),
            PromptMessage::User(question),
        ];

        // No tool schemas: force plain text.
        match self.model.complete(&messages, &[]).await {
            Ok(ModelTurn::Final(text)) => Ok(ToolResult::success(text)),
            Ok(ModelTurn::ToolCalls(_)) => Ok(ToolResult::failure(
                "model attempted a tool call in a text-only context",
            )),
            Err(e) => {
                tracing::error!("free_form_answer failed: {}", e);
                Ok(ToolResult::failure(format!("model unavailable: {}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct CannedModel(String);

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn complete(
            &self,
            _messages: &[PromptMessage],
            _tools: &[Value],
        ) -> Result<ModelTurn> {
            Ok(ModelTurn::Final(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn test_answers_with_model_text() {
        let tool = FreeFormAnswerTool::new(Arc::new(CannedModel("Use 00 flour.".to_string())));
        let result = tool
            .execute(json!({"question": "What flour for neapolitan pizza?"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "Use 00 flour.");
    }

    #[tokio::test]
    async fn test_missing_question_fails() {
        let tool = FreeFormAnswerTool::new(Arc::new(CannedModel(String::new())));
        let result = tool.execute(json!({})).await.unwrap();
        assert!(!result.success);
    }
}
