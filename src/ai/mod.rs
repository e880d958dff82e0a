//! Text generation backends.

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use self::gemini::GeminiClient;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("no text generator configured")]
    Unavailable,

    #[error("request to model failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned no candidates")]
    NoCandidates,

    #[error("prompt blocked: {0}")]
    PromptBlocked(String),

    #[error("response blocked: {0}")]
    Blocked(String),

    #[error("response truncated with no content")]
    Truncated,

    #[error("unknown finish reason: {0}")]
    UnknownFinish(String),
}

/// Anything that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_instruction: &str, prompt: &str)
        -> Result<String, GenerationError>;
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Generator that replays canned replies and records prompts
    pub struct ScriptedGenerator {
        reply: Result<String, String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Every call fails as if the safety filter fired
        pub fn failing(reason: &str) -> Self {
            Self {
                reply: Err(reason.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _system_instruction: &str,
            prompt: &str,
        ) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(GenerationError::Blocked)
        }
    }
}
