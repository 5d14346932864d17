pub mod command;
pub mod engine;
mod parse;
mod prompt;
pub mod transcript;

pub use command::{CommandError, Intent, HELP};
pub use parse::{parse_analysis, Analysis};
pub use transcript::{Entry, Role, Transcript};

use roster_core::{AiSettings, UserStore};

/// Keyword interpreter with an optional language-model fallback.
///
/// The model is only asked when the keyword parser does not recognize the
/// command, and only if AI settings are configured.
#[derive(Debug, Clone, Default)]
pub struct Assistant {
    settings: AiSettings,
}

impl Assistant {
    pub fn new(settings: AiSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AiSettings {
        &self.settings
    }

    pub fn ai_enabled(&self) -> bool {
        roster_core::ai_configured(&self.settings)
    }

    /// Raw ACTION / PARAMETERS / RESPONSE text from the model.
    pub async fn analyze(&self, text: &str) -> Result<String, CommandError> {
        if !self.ai_enabled() {
            return Err(CommandError::External(
                "AI provider is not configured (set GEMINI_API_KEY or run `roster settings`)"
                    .to_string(),
            ));
        }
        let raw = engine::generate(
            &self.settings,
            &prompt::system_prompt(),
            &prompt::user_message(text),
        )
        .await
        .map_err(CommandError::External)?;
        log::debug!("model analysis:\n{}", raw);
        Ok(raw)
    }

    /// Handle one line of user text and return the reply shown in the chat.
    pub async fn respond(&self, store: &UserStore, text: &str) -> String {
        let intent = command::parse(text);
        if intent != Intent::Help || !self.ai_enabled() {
            return command::reply(store, &intent);
        }

        let raw = match self.analyze(text).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("model call failed: {}", e);
                return e.to_string();
            }
        };

        match parse_analysis(&raw) {
            Some(analysis) => reply_for_analysis(store, &analysis),
            None => {
                log::warn!("model answer had no ACTION line");
                HELP.to_string()
            }
        }
    }
}

/// Run the action the model chose, or show its own reply when it chose none.
pub fn reply_for_analysis(store: &UserStore, analysis: &Analysis) -> String {
    match analysis.to_intent() {
        Some(Intent::Help) | None => analysis
            .response
            .clone()
            .unwrap_or_else(|| HELP.to_string()),
        Some(intent) => {
            log::info!("model chose {:?}", intent);
            command::reply(store, &intent)
        }
    }
}
