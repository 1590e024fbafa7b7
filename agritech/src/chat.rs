use crate::fallback;
use crate::http::{HttpClient, RequestOptions};
use crate::{configured_key, Error};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_REFERER: &str = "http://localhost:5173";

const SYSTEM_PROMPT: &str = "You are an expert agricultural advisor with deep knowledge of sustainable farming practices, crop management, and modern agricultural techniques.";
const EMPTY_ANSWER: &str = "Je m'excuse, mais je n'ai pas pu générer de conseil pour le moment.";
const EMPTY_QUESTION: &str = "Je n'ai pas compris votre question. Pouvez-vous reformuler?";
const TIMEOUT: Duration = Duration::from_secs(30);

/// Starter questions offered next to the chat input.
pub const SUGGESTIONS: [&str; 6] = [
    "Comment optimiser l'irrigation de mes cultures?",
    "Quels sont les meilleurs engrais naturels pour le maraîchage?",
    "Comment lutter contre les ravageurs sans produits chimiques?",
    "Quelles cultures associer pour maximiser les rendements?",
    "Comment améliorer la fertilité de mon sol?",
    "Quand planter mes cultures d'automne?",
];

/// Picks one of [`SUGGESTIONS`] uniformly.
pub fn random_suggestion<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    SUGGESTIONS.choose(rng).copied().unwrap_or(SUGGESTIONS[0])
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Farming advice from an OpenAI-compatible chat completion API.
///
/// Never fails: without a key, or when the call goes wrong, the answer
/// comes from [`fallback::respond`].
pub struct AdviceClient {
    http: HttpClient,
    api_key: Option<String>,
    model: String,
    referer: String,
    timeout: Duration,
}

impl AdviceClient {
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: HttpClient::new(DEFAULT_BASE_URL).with_timeout(TIMEOUT),
            api_key: configured_key(api_key),
            model: DEFAULT_MODEL.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            timeout: TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http = HttpClient::new(base_url).with_timeout(self.timeout);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.http = self.http.with_timeout(timeout);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn ask(&self, question: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("OpenRouter API key is missing or a placeholder; using canned advice");
            return fallback::respond(question).to_string();
        };

        match self.complete(api_key, question).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(error = %err, "advice request failed; using canned advice");
                fallback::respond(question).to_string()
            }
        }
    }

    async fn complete(&self, api_key: &str, question: &str) -> Result<String, Error> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| Error::Application("API key is not a valid header value".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        if let Ok(referer) = HeaderValue::from_str(&self.referer) {
            headers.insert(HeaderName::from_static("http-referer"), referer);
        }

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
        };
        let options = RequestOptions::new(Method::POST)
            .with_body(&body)?
            .with_headers(headers);
        let response: ChatResponse = self.http.request("chat/completions", options).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Application("Completion has no choices".to_string()))?;
        Ok(choice
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .unwrap_or_else(|| EMPTY_ANSWER.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    pub loading: bool,
    pub error: Option<String>,
    pub last_answer: Option<String>,
}

/// Question/answer hook; keeps no conversation history.
pub struct Chatbot {
    client: AdviceClient,
    state: Mutex<ChatState>,
}

impl Chatbot {
    #[must_use]
    pub fn new(client: AdviceClient) -> Self {
        Self {
            client,
            state: Mutex::new(ChatState::default()),
        }
    }

    /// # Errors
    /// Returns an application error for an empty question.
    pub async fn ask(&self, question: &str) -> Result<String, Error> {
        {
            let mut state = self.state.lock();
            state.error = None;
            if question.trim().is_empty() {
                state.error = Some(EMPTY_QUESTION.to_string());
                return Err(Error::Application(EMPTY_QUESTION.to_string()));
            }
            state.loading = true;
        }

        let answer = self.client.ask(question.trim()).await;

        let mut state = self.state.lock();
        state.loading = false;
        state.last_answer = Some(answer.clone());
        Ok(answer)
    }

    #[must_use]
    pub fn state(&self) -> ChatState {
        self.state.lock().clone()
    }

    #[must_use]
    pub const fn suggestions(&self) -> &'static [&'static str] {
        &SUGGESTIONS
    }

    #[must_use]
    pub fn random_suggestion(&self) -> &'static str {
        random_suggestion(&mut rand::thread_rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_client_uses_canned_advice() {
        let client = AdviceClient::new(Some("your_openrouter_api_key_here".into()));
        assert!(!client.is_configured());
        let answer = client.ask("Comment gérer l'arrosage ?").await;
        assert_eq!(answer, fallback::respond("arrosage"));
    }

    #[tokio::test]
    async fn empty_question_is_rejected() {
        let bot = Chatbot::new(AdviceClient::new(None));
        let err = bot.ask("   ").await.unwrap_err();
        assert_eq!(err.to_string(), EMPTY_QUESTION);
        let state = bot.state();
        assert_eq!(state.error.as_deref(), Some(EMPTY_QUESTION));
        assert!(!state.loading);
        assert!(state.last_answer.is_none());
    }

    #[test]
    fn random_suggestion_comes_from_the_list() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut rng = StdRng::seed_from_u64(3);
        let picks: Vec<_> = (0..50).map(|_| random_suggestion(&mut rng)).collect();
        assert!(picks.iter().all(|pick| SUGGESTIONS.contains(pick)));
        assert!(picks.iter().any(|pick| *pick != picks[0]));

        let bot = Chatbot::new(AdviceClient::new(None));
        assert_eq!(bot.suggestions().len(), 6);
        assert!(SUGGESTIONS.contains(&bot.random_suggestion()));
    }

    #[tokio::test]
    async fn answer_is_recorded() {
        let bot = Chatbot::new(AdviceClient::new(None));
        let answer = bot.ask("Bonjour").await.unwrap();
        assert_eq!(answer, fallback::DEFAULT);
        assert_eq!(bot.state().last_answer.as_deref(), Some(fallback::DEFAULT));
    }
}
