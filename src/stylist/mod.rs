//! Style analysis adapter: the only place that talks to the hosted model.

pub mod error;
pub mod plan;
pub mod profile;
pub mod prompts;
pub mod session;

use std::future::Future;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::ANALYSIS_INSTRUCTION;
use crate::llm::gemini::{GeminiClient, GeminiResponse};
use crate::llm::media::{normalize_image_mime_type, ImagePayload};

pub use error::StylistError;
pub use plan::{PlanIssue, WeeklyPlan, WeeklyPlanDay};
pub use profile::{
    Gender, ProfileAnalysis, ProfileIssue, RecommendationField, Recommendations, StyleCategory,
    StyleProfile, Undertone,
};

/// The three hosted-model operations the bot depends on.
pub trait StyleAdvisor: Send + Sync {
    fn analyze_image_style(
        &self,
        image: &ImagePayload,
    ) -> impl Future<Output = Result<ProfileAnalysis, StylistError>> + Send;

    fn generate_weekly_style_plan(
        &self,
        profile: &StyleProfile,
    ) -> impl Future<Output = Result<WeeklyPlan, StylistError>> + Send;

    /// Returns the edited photo as a `data:` URI.
    fn edit_user_image(
        &self,
        image: &ImagePayload,
        prompt: &str,
    ) -> impl Future<Output = Result<String, StylistError>> + Send;
}

#[derive(Debug, Clone)]
pub struct GeminiStylist {
    client: GeminiClient,
    analysis_model: String,
    image_model: String,
}

impl GeminiStylist {
    pub fn new(client: GeminiClient, analysis_model: String, image_model: String) -> Self {
        Self {
            client,
            analysis_model,
            image_model,
        }
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    /// Photo first, then the fixed instruction; the answer is schema-bound JSON.
    pub fn analysis_request(&self, image: &ImagePayload) -> ModelRequest<'_> {
        ModelRequest {
            model: &self.analysis_model,
            operation: "analyze_image_style",
            contents: user_turn(vec![
                inline_image_part(image),
                json!({ "text": ANALYSIS_INSTRUCTION }),
            ]),
            generation_config: prompts::json_generation_config(prompts::style_profile_schema()),
        }
    }

    pub fn weekly_plan_request(&self, profile: &StyleProfile) -> ModelRequest<'_> {
        ModelRequest {
            model: &self.analysis_model,
            operation: "generate_weekly_style_plan",
            contents: user_turn(vec![json!({ "text": prompts::weekly_plan_prompt(profile) })]),
            generation_config: prompts::json_generation_config(prompts::weekly_plan_schema()),
        }
    }

    pub fn edit_request(&self, image: &ImagePayload, prompt: &str) -> ModelRequest<'_> {
        ModelRequest {
            model: &self.image_model,
            operation: "edit_user_image",
            contents: user_turn(vec![inline_image_part(image), json!({ "text": prompt })]),
            generation_config: json!({ "responseModalities": ["TEXT", "IMAGE"] }),
        }
    }

    async fn send(&self, request: ModelRequest<'_>) -> Result<GeminiResponse, StylistError> {
        let response = self
            .client
            .generate_content(
                request.model,
                request.operation,
                request.contents,
                Some(request.generation_config),
            )
            .await?;
        Ok(response)
    }
}

/// One `generateContent` call before it goes on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub operation: &'static str,
    pub contents: Value,
    pub generation_config: Value,
}

fn user_turn(parts: Vec<Value>) -> Value {
    json!([{ "role": "user", "parts": parts }])
}

fn inline_image_part(image: &ImagePayload) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.data
        }
    })
}

/// Empty text is an explicit empty analysis; text that is not a profile object
/// is an error.
pub fn parse_profile_response(response: &GeminiResponse) -> Result<ProfileAnalysis, StylistError> {
    let Some(text) = response.text() else {
        warn!("Style analysis returned no text; using an empty profile");
        return Ok(ProfileAnalysis::empty());
    };
    let profile: StyleProfile = serde_json::from_str(text.trim())
        .map_err(|err| StylistError::MalformedResponse(err.to_string()))?;
    Ok(ProfileAnalysis::from_profile(profile))
}

pub fn parse_plan_response(response: &GeminiResponse) -> Result<WeeklyPlan, StylistError> {
    let Some(text) = response.text() else {
        warn!("Weekly plan returned no text; using an empty plan");
        return Ok(WeeklyPlan::empty());
    };
    let days: Vec<WeeklyPlanDay> = serde_json::from_str(text.trim())
        .map_err(|err| StylistError::MalformedResponse(err.to_string()))?;
    Ok(WeeklyPlan::from_days(days))
}

pub fn edited_image_from_response(response: &GeminiResponse) -> Result<String, StylistError> {
    let inline = response
        .first_inline_data()
        .ok_or(StylistError::NoImageProduced)?;
    let mime_type = inline
        .mime_type
        .as_deref()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .map(normalize_image_mime_type)
        .unwrap_or_else(|| "image/png".to_string());
    Ok(format!("data:{};base64,{}", mime_type, inline.data))
}

impl StyleAdvisor for GeminiStylist {
    async fn analyze_image_style(
        &self,
        image: &ImagePayload,
    ) -> Result<ProfileAnalysis, StylistError> {
        let response = self.send(self.analysis_request(image)).await?;
        let analysis = parse_profile_response(&response)?;
        info!(
            "Style analysis finished: gender={:?} complete={} issues={}",
            analysis.profile.gender,
            analysis.is_complete(),
            analysis.issues.len()
        );
        Ok(analysis)
    }

    async fn generate_weekly_style_plan(
        &self,
        profile: &StyleProfile,
    ) -> Result<WeeklyPlan, StylistError> {
        let response = self.send(self.weekly_plan_request(profile)).await?;
        parse_plan_response(&response)
    }

    async fn edit_user_image(
        &self,
        image: &ImagePayload,
        prompt: &str,
    ) -> Result<String, StylistError> {
        let response = self.send(self.edit_request(image, prompt)).await?;
        edited_image_from_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::llm::GeminiSettings;

    fn stylist() -> GeminiStylist {
        let settings = GeminiSettings {
            api_key: "test-key".into(),
            base_url: "https://example.invalid/v1beta".into(),
            safety_profile: "standard".into(),
            request_timeout: Duration::from_secs(5),
            max_attempts: 1,
        };
        GeminiStylist::new(
            GeminiClient::new(reqwest::Client::new(), settings),
            "analysis-model".into(),
            "image-model".into(),
        )
    }

    fn selfie() -> ImagePayload {
        ImagePayload {
            mime_type: "image/jpeg".into(),
            data: "QUJD".into(),
        }
    }

    #[test]
    fn analysis_request_sends_photo_then_instruction_with_profile_schema() {
        let stylist = stylist();
        let request = stylist.analysis_request(&selfie());
        assert_eq!(request.model, "analysis-model");
        assert_eq!(request.operation, "analyze_image_style");
        assert_eq!(
            request.contents,
            json!([{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": "image/jpeg", "data": "QUJD" } },
                    { "text": ANALYSIS_INSTRUCTION }
                ]
            }])
        );
        assert_eq!(
            request.generation_config,
            json!({
                "responseMimeType": "application/json",
                "responseSchema": prompts::style_profile_schema()
            })
        );
    }

    #[test]
    fn weekly_plan_request_is_text_only_with_plan_schema() {
        let stylist = stylist();
        let profile = StyleProfile {
            gender: Some(Gender::Female),
            ..Default::default()
        };
        let request = stylist.weekly_plan_request(&profile);
        assert_eq!(request.model, "analysis-model");
        assert_eq!(
            request.contents,
            json!([{
                "role": "user",
                "parts": [{ "text": prompts::weekly_plan_prompt(&profile) }]
            }])
        );
        assert_eq!(
            request.generation_config.pointer("/responseSchema/type"),
            Some(&json!("ARRAY"))
        );
        assert_eq!(
            request.generation_config.pointer("/responseMimeType"),
            Some(&json!("application/json"))
        );
    }

    #[test]
    fn edit_request_uses_image_model_and_asks_for_an_image_back() {
        let stylist = stylist();
        let request = stylist.edit_request(&selfie(), "Change the hairstyle");
        assert_eq!(request.model, "image-model");
        assert_eq!(request.operation, "edit_user_image");
        assert_eq!(
            request.contents,
            json!([{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": "image/jpeg", "data": "QUJD" } },
                    { "text": "Change the hairstyle" }
                ]
            }])
        );
        assert_eq!(
            request.generation_config,
            json!({ "responseModalities": ["TEXT", "IMAGE"] })
        );
    }

    fn response(value: Value) -> GeminiResponse {
        serde_json::from_value(value).unwrap()
    }

    fn text_response(text: &str) -> GeminiResponse {
        response(json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
    }

    #[test]
    fn empty_analysis_text_yields_profile_without_categories() {
        let analysis = parse_profile_response(&text_response("")).unwrap();
        assert_eq!(analysis.profile, StyleProfile::default());
        assert!(analysis.profile.recommendations.is_empty());
        assert_eq!(analysis.issues, vec![ProfileIssue::EmptyResponse]);

        let analysis = parse_profile_response(&GeminiResponse::default()).unwrap();
        assert!(analysis.profile.recommendations.is_empty());
    }

    #[test]
    fn partial_json_becomes_a_partial_profile() {
        let analysis = parse_profile_response(&text_response(
            r#"{"gender":"Male","faceShape":"Square","recommendations":{"hair":["Buzz Cut"]}}"#,
        ))
        .unwrap();
        assert!(!analysis.is_complete());
        assert!(analysis
            .issues
            .contains(&ProfileIssue::MissingCategory(RecommendationField::Beard)));
        assert!(analysis
            .issues
            .contains(&ProfileIssue::MissingAttribute("skin tone")));
    }

    #[test]
    fn malformed_analysis_text_is_an_error() {
        let err = parse_profile_response(&text_response("Sorry, I can't help")).unwrap_err();
        assert!(matches!(err, StylistError::MalformedResponse(_)));
        let err = parse_profile_response(&text_response("[1,2,3]")).unwrap_err();
        assert!(matches!(err, StylistError::MalformedResponse(_)));
    }

    #[test]
    fn plan_parses_days_and_flags_empty_text() {
        let plan = parse_plan_response(&text_response(
            r#"[{"day":"Monday","occasion":"Office","outfit":"Charcoal suit"}]"#,
        ))
        .unwrap();
        assert_eq!(plan.days[0].outfit, "Charcoal suit");
        assert_eq!(
            plan.issues,
            vec![PlanIssue::DayCount {
                expected: 7,
                actual: 1
            }]
        );

        let plan = parse_plan_response(&GeminiResponse::default()).unwrap();
        assert!(plan.days.is_empty());
        assert_eq!(plan.issues, vec![PlanIssue::EmptyResponse]);
    }

    #[test]
    fn edit_without_candidates_is_no_image_produced() {
        let err = edited_image_from_response(&response(json!({ "candidates": [] }))).unwrap_err();
        assert!(matches!(err, StylistError::NoImageProduced));
        let err = edited_image_from_response(&GeminiResponse::default()).unwrap_err();
        assert!(matches!(err, StylistError::NoImageProduced));
    }

    #[test]
    fn edit_without_inline_parts_is_no_image_produced() {
        let no_content = response(json!({ "candidates": [{}] }));
        assert!(matches!(
            edited_image_from_response(&no_content),
            Err(StylistError::NoImageProduced)
        ));
        let no_parts = response(json!({ "candidates": [{ "content": {} }] }));
        assert!(matches!(
            edited_image_from_response(&no_parts),
            Err(StylistError::NoImageProduced)
        ));
        assert!(matches!(
            edited_image_from_response(&text_response("I cannot edit this photo")),
            Err(StylistError::NoImageProduced)
        ));
    }

    #[test]
    fn edit_returns_first_inline_image_as_data_uri() {
        let parsed = response(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here you go" },
                { "inlineData": { "mimeType": "image/jpeg", "data": "AAAA" } },
                { "inlineData": { "mimeType": "image/png", "data": "BBBB" } }
            ] } }]
        }));
        assert_eq!(
            edited_image_from_response(&parsed).unwrap(),
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[test]
    fn edit_defaults_to_png_when_mime_is_missing() {
        let parsed = response(json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": { "data": "CCCC" } }] } }]
        }));
        assert_eq!(
            edited_image_from_response(&parsed).unwrap(),
            "data:image/png;base64,CCCC"
        );
    }
}
