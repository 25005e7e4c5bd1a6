//! Text-analytics provider (Azure-style `/text/analytics/v3.1/sentiment`).
//!
//! The endpoint is natively batched: one request carries every document and
//! the response is mapped back 1:1 by array position.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    http_client, transport_error, Provider, ProviderDescriptor, ProviderFamily, ResolvedOptions,
};
use crate::config::{AnalysisMode, Credentials, EngineConfig, ProviderKind};
use crate::error::{EngineError, Result};
use crate::result::{
    AnalysisDetails, AnalysisResult, AspectReport, AspectSentiment, ClassScores,
    SentenceSentiment, SentimentLabel, SentimentScores,
};

const KIND: ProviderKind = ProviderKind::Azure;

pub struct AzureProvider {
    descriptor: ProviderDescriptor,
    http: reqwest::Client,
    credentials: Credentials,
    endpoint: String,
    region: String,
}

#[derive(Debug, Serialize)]
struct Document<'a> {
    id: String,
    language: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    documents: Vec<Document<'a>>,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    documents: Vec<DocumentSentiment>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct Confidence {
    #[serde(default)]
    positive: f64,
    #[serde(default)]
    negative: f64,
    #[serde(default)]
    neutral: f64,
}

impl Confidence {
    fn compound(&self) -> f64 {
        (self.positive - self.negative).clamp(-1.0, 1.0)
    }

    fn max(&self) -> f64 {
        self.positive.max(self.negative).max(self.neutral)
    }

    /// "mixed" and anything unknown fall back to the score difference.
    fn label(&self, raw: &str) -> SentimentLabel {
        SentimentLabel::parse(raw).unwrap_or_else(|| SentimentLabel::from_compound(self.compound()))
    }

    fn for_label(&self, raw: &str) -> f64 {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => self.positive,
            "negative" => self.negative,
            "neutral" => self.neutral,
            _ => self.max(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSentiment {
    sentiment: String,
    confidence_scores: Confidence,
    #[serde(default)]
    sentences: Vec<Span>,
    #[serde(default)]
    aspects: Vec<Span>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Span {
    #[serde(default)]
    text: String,
    sentiment: String,
    #[serde(default)]
    confidence_scores: Confidence,
}

impl DocumentSentiment {
    fn into_result(self, text: &str, detailed: bool) -> AnalysisResult {
        let c = self.confidence_scores;
        let scores = SentimentScores {
            positive: c.positive,
            negative: c.negative,
            neutral: c.neutral,
            compound: c.compound(),
        };
        let mut result = AnalysisResult::new(text, c.label(&self.sentiment), scores, c.max(), KIND);

        if detailed {
            let sentences = self
                .sentences
                .into_iter()
                .map(|s| SentenceSentiment {
                    sentiment: s.confidence_scores.label(&s.sentiment),
                    scores: ClassScores {
                        positive: s.confidence_scores.positive,
                        negative: s.confidence_scores.negative,
                        neutral: s.confidence_scores.neutral,
                    },
                    text: s.text,
                })
                .collect();
            result.details = Some(AnalysisDetails::Sentences { sentences });

            if !self.aspects.is_empty() {
                result.aspects = Some(
                    self.aspects
                        .into_iter()
                        .map(|a| AspectSentiment {
                            aspect: a.text.clone(),
                            sentiment: a.confidence_scores.label(&a.sentiment),
                            confidence: a.confidence_scores.for_label(&a.sentiment),
                            text: a.text,
                        })
                        .collect(),
                );
            }
        }
        result
    }
}

impl AzureProvider {
    pub fn new(cfg: &EngineConfig, credentials: Credentials) -> Result<Self> {
        Ok(Self {
            descriptor: ProviderDescriptor::new(
                KIND,
                "Azure Text Analytics",
                ProviderFamily::ApiBased,
                &["en", "es", "fr", "de", "it", "pt", "zh", "ja", "nl", "ar"],
                &[AnalysisMode::Standard, AnalysisMode::Detailed],
                5000,
            ),
            http: http_client(cfg.request_timeout_secs)?,
            credentials,
            endpoint: cfg.azure_endpoint.trim_end_matches('/').to_string(),
            region: cfg.azure_region.clone(),
        })
    }

    async fn send(&self, texts: &[&str], language: &str) -> Result<Vec<DocumentSentiment>> {
        let key = self
            .credentials
            .get(KIND)
            .ok_or_else(|| EngineError::configuration("Azure Text Analytics key not configured"))?;

        let req = Request {
            documents: texts
                .iter()
                .copied()
                .enumerate()
                .map(|(i, text)| Document {
                    id: (i + 1).to_string(),
                    language,
                    text,
                })
                .collect(),
        };

        let resp = self
            .http
            .post(format!("{}/text/analytics/v3.1/sentiment", self.endpoint))
            .header("Ocp-Apim-Subscription-Key", key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .json(&req)
            .send()
            .await
            .map_err(|e| transport_error(KIND, e))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "text analytics request rejected");
            return Err(EngineError::provider(
                KIND,
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("error")
                ),
            ));
        }

        let body: Response = resp
            .json()
            .await
            .map_err(|e| EngineError::provider(KIND, format!("unexpected response body: {e}")))?;
        if body.documents.len() != texts.len() {
            return Err(EngineError::provider(
                KIND,
                format!(
                    "expected {} documents, got {}",
                    texts.len(),
                    body.documents.len()
                ),
            ));
        }
        Ok(body.documents)
    }
}

#[async_trait]
impl Provider for AzureProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn is_configured(&self) -> bool {
        self.credentials.has(KIND)
    }

    async fn analyze(&self, text: &str, options: &ResolvedOptions) -> Result<AnalysisResult> {
        let mut docs = self.send(&[text], &options.language).await?;
        let doc = docs
            .pop()
            .ok_or_else(|| EngineError::provider(KIND, "no analysis returned"))?;
        Ok(doc.into_result(text, options.is_detailed()))
    }

    fn supports_batch(&self) -> bool {
        true
    }

    async fn batch_analyze(
        &self,
        texts: &[String],
        options: &ResolvedOptions,
    ) -> Result<Vec<AnalysisResult>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let docs = self.send(&refs, &options.language).await?;
        Ok(docs
            .into_iter()
            .zip(texts)
            .map(|(doc, text)| doc.into_result(text, options.is_detailed()))
            .collect())
    }

    /// Runs a detailed analysis; the service's aspect list is used when present.
    async fn extract_aspects(
        &self,
        text: &str,
        _categories: &[String],
        options: &ResolvedOptions,
    ) -> Result<Option<AspectReport>> {
        if !self.is_configured() {
            return Ok(None);
        }
        let detailed = ResolvedOptions {
            mode: AnalysisMode::Detailed,
            ..options.clone()
        };
        let result = self.analyze(text, &detailed).await?;
        Ok(result.aspects.filter(|a| !a.is_empty()).map(|aspects| AspectReport {
            text: text.to_string(),
            aspects,
            overall_sentiment: result.sentiment,
            provider: KIND.as_str().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(raw: &str) -> DocumentSentiment {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn document_maps_scores_and_confidence() {
        let r = doc(r#"{"sentiment":"positive","confidenceScores":{"positive":0.7,"negative":0.1,"neutral":0.2}}"#)
            .into_result("nice", false);
        assert_eq!(r.sentiment, SentimentLabel::Positive);
        assert!((r.scores.compound - 0.6).abs() < 1e-9);
        assert!((r.confidence - 0.7).abs() < 1e-9);
        assert!(r.details.is_none());
    }

    #[test]
    fn mixed_label_is_derived_from_scores() {
        let r = doc(r#"{"sentiment":"mixed","confidenceScores":{"positive":0.2,"negative":0.5,"neutral":0.3}}"#)
            .into_result("meh", false);
        assert_eq!(r.sentiment, SentimentLabel::Negative);
    }

    #[test]
    fn detailed_keeps_sentences_and_aspects() {
        let raw = r#"{
            "sentiment":"negative",
            "confidenceScores":{"positive":0.1,"negative":0.8,"neutral":0.1},
            "sentences":[{"text":"Food was cold.","sentiment":"negative","confidenceScores":{"positive":0.0,"negative":0.9,"neutral":0.1}}],
            "aspects":[{"text":"food","sentiment":"negative","confidenceScores":{"positive":0.05,"negative":0.9,"neutral":0.05}}]
        }"#;
        let r = doc(raw).into_result("Food was cold.", true);
        let Some(AnalysisDetails::Sentences { sentences }) = &r.details else {
            panic!("expected sentence details");
        };
        assert_eq!(sentences.len(), 1);
        let aspects = r.aspects.unwrap();
        assert_eq!(aspects[0].aspect, "food");
        assert!((aspects[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn request_ids_are_one_based_strings() {
        let req = Request {
            documents: vec![Document {
                id: 1.to_string(),
                language: "en",
                text: "hi",
            }],
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["documents"][0]["id"], "1");
    }
}
