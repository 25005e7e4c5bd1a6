//! Chat-completion provider (OpenAI-compatible `/chat/completions`).
//!
//! Every call sends one system instruction plus the user text and asks for a
//! JSON object back (`response_format = json_object`). The same round-trip
//! serves sentiment, emotions and aspects; only the prompt and the reply
//! shape differ.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{
    http_client, transport_error, Provider, ProviderDescriptor, ProviderFamily, ResolvedOptions,
};
use crate::config::{AnalysisMode, Credentials, EngineConfig, ProviderKind};
use crate::error::{EngineError, Result};
use crate::result::{
    AnalysisDetails, AnalysisResult, AspectReport, AspectSentiment, SentimentLabel,
    SentimentScores,
};
use crate::sentiment;

const KIND: ProviderKind = ProviderKind::OpenAi;
const TEMPERATURE: f32 = 0.3;

pub struct OpenAiProvider {
    descriptor: ProviderDescriptor,
    http: reqwest::Client,
    credentials: Credentials,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(cfg: &EngineConfig, credentials: Credentials) -> Result<Self> {
        Ok(Self {
            descriptor: ProviderDescriptor::new(
                KIND,
                "OpenAI Sentiment Analysis",
                ProviderFamily::AiBased,
                &["en", "es", "fr", "de", "it", "pt", "zh", "ja", "ko", "ru", "ar"],
                &[
                    AnalysisMode::Standard,
                    AnalysisMode::Detailed,
                    AnalysisMode::Academic,
                    AnalysisMode::Social,
                ],
                4000,
            ),
            http: http_client(cfg.request_timeout_secs)?,
            credentials,
            model: cfg.openai_model.clone(),
            base_url: cfg.openai_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// One chat round-trip; the model's message content is parsed as `T`.
    pub(crate) async fn chat_json<T: DeserializeOwned>(
        &self,
        system: &str,
        text: &str,
    ) -> Result<T> {
        let key = self
            .credentials
            .get(KIND)
            .ok_or_else(|| EngineError::configuration("OpenAI API key not configured"))?;

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            response_format: ResponseFormat,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: text,
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&req)
            .send()
            .await
            .map_err(|e| transport_error(KIND, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            tracing::warn!(status = status.as_u16(), detail = %detail, "openai request rejected");
            return Err(EngineError::provider(KIND, format!("HTTP {}: {detail}", status.as_u16())));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| EngineError::provider(KIND, format!("unexpected response body: {e}")))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EngineError::provider(KIND, "response contained no message"))?;

        serde_json::from_str::<T>(content.trim())
            .map_err(|e| EngineError::provider(KIND, format!("malformed JSON from model: {e}")))
    }
}

pub(crate) fn sentiment_prompt(mode: AnalysisMode) -> String {
    let task = match mode {
        AnalysisMode::Academic => "Analyze the sentiment of the following text using academic research methods with fine-grained analysis.",
        AnalysisMode::Social => "Analyze the sentiment of the following text in the context of social media communication.",
        AnalysisMode::Detailed => "Provide a detailed sentiment analysis of the following text.",
        AnalysisMode::Standard => "Analyze the sentiment of the following text.",
    };
    format!(
        "You are a sentiment analysis expert. {task} Return JSON with the following structure: \
         {{ \"sentiment\": \"positive\"|\"negative\"|\"neutral\", \"scores\": {{ \"positive\": number, \
         \"negative\": number, \"neutral\": number, \"compound\": number }}, \"confidence\": number, \
         \"analysis\": string }}"
    )
}

pub(crate) fn aspect_prompt(categories: &[String]) -> String {
    let focus = if categories.is_empty() {
        "Identify all aspects mentioned in the text and analyze the sentiment for each.".to_string()
    } else {
        format!(
            "Extract sentiments for these specific aspects: {}.",
            categories.join(", ")
        )
    };
    format!(
        "You are an expert in aspect-based sentiment analysis. {focus} Return JSON with the \
         following structure: {{ \"aspects\": [{{ \"aspect\": string, \"sentiment\": \
         \"positive\"|\"negative\"|\"neutral\", \"confidence\": number, \"text\": string }}], \
         \"overallSentiment\": string }}"
    )
}

#[derive(Debug, Default, Deserialize)]
struct ReplyScores {
    #[serde(default)]
    positive: f64,
    #[serde(default)]
    negative: f64,
    #[serde(default)]
    neutral: f64,
    compound: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SentimentReply {
    sentiment: String,
    #[serde(default)]
    scores: ReplyScores,
    confidence: Option<f64>,
    analysis: Option<String>,
}

impl SentimentReply {
    fn into_result(self, text: &str, options: &ResolvedOptions) -> AnalysisResult {
        let compound = self
            .scores
            .compound
            .unwrap_or_else(|| sentiment::compound(self.scores.positive, self.scores.negative))
            .clamp(-1.0, 1.0);
        let label = SentimentLabel::parse(&self.sentiment)
            .unwrap_or_else(|| SentimentLabel::from_compound(compound));
        let confidence = self
            .confidence
            .unwrap_or_else(|| sentiment::confidence_for(compound));
        let scores = SentimentScores {
            positive: self.scores.positive,
            negative: self.scores.negative,
            neutral: self.scores.neutral,
            compound,
        };

        let mut result = AnalysisResult::new(text, label, scores, confidence, KIND);
        if options.is_detailed() {
            result.details = self
                .analysis
                .filter(|a| !a.trim().is_empty())
                .map(|analysis| AnalysisDetails::Narrative { analysis });
        }
        result
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AspectReply {
    #[serde(default)]
    aspects: Vec<AspectItem>,
    overall_sentiment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AspectItem {
    aspect: String,
    sentiment: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    text: String,
}

impl AspectReply {
    fn into_report(self, text: &str) -> AspectReport {
        let aspects = self
            .aspects
            .into_iter()
            .map(|a| AspectSentiment {
                sentiment: SentimentLabel::parse(&a.sentiment).unwrap_or(SentimentLabel::Neutral),
                confidence: a.confidence.clamp(0.0, 1.0),
                aspect: a.aspect,
                text: a.text,
            })
            .collect();
        AspectReport {
            text: text.to_string(),
            aspects,
            overall_sentiment: self
                .overall_sentiment
                .as_deref()
                .and_then(SentimentLabel::parse)
                .unwrap_or(SentimentLabel::Neutral),
            provider: KIND.as_str().to_string(),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn is_configured(&self) -> bool {
        self.credentials.has(KIND)
    }

    async fn analyze(&self, text: &str, options: &ResolvedOptions) -> Result<AnalysisResult> {
        let reply: SentimentReply = self.chat_json(&sentiment_prompt(options.mode), text).await?;
        Ok(reply.into_result(text, options))
    }

    async fn extract_aspects(
        &self,
        text: &str,
        categories: &[String],
        _options: &ResolvedOptions,
    ) -> Result<Option<AspectReport>> {
        if !self.is_configured() {
            return Ok(None);
        }
        let reply: AspectReply = self.chat_json(&aspect_prompt(categories), text).await?;
        Ok(Some(reply.into_report(text)))
    }
}
