use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use roster_core::AiSettings;

fn map_backend(provider: &str) -> Result<LLMBackend, String> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" | "gemini" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(format!("unknown provider: {other}")),
    }
}

/// One stateless chat round trip. No retry; an empty answer is an error.
pub async fn generate(
    settings: &AiSettings,
    system: &str,
    user_msg: &str,
) -> Result<String, String> {
    let backend = map_backend(&settings.provider)?;

    let mut builder = LLMBuilder::new()
        .backend(backend)
        .model(&settings.model)
        .system(system);

    if !settings.api_key.is_empty() {
        builder = builder.api_key(&settings.api_key);
    }

    let llm = builder.build().map_err(|e| format!("build LLM: {e}"))?;
    let messages = vec![ChatMessage::user().content(user_msg).build()];

    log::info!("asking {} ({})", settings.provider, settings.model);
    let response = llm.chat(&messages).await.map_err(|e| format!("chat: {e}"))?;

    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err("model returned empty text".to_string()),
        None => Err("model returned no text".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_is_an_alias_for_google() {
        assert!(matches!(map_backend("gemini"), Ok(LLMBackend::Google)));
        assert!(matches!(map_backend("google"), Ok(LLMBackend::Google)));
        assert_eq!(
            map_backend("clippy").err().as_deref(),
            Some("unknown provider: clippy")
        );
    }
}
