use serde_json::{json, Map, Value};

use crate::config::TRY_ON_PRESERVE_SUFFIX;
use crate::stylist::profile::{Gender, RecommendationField, StyleCategory, StyleProfile};

pub fn style_profile_schema() -> Value {
    let mut categories = Map::new();
    for field in RecommendationField::ALL {
        categories.insert(
            field.key().to_string(),
            json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
        );
    }

    json!({
        "type": "OBJECT",
        "properties": {
            "faceShape": { "type": "STRING" },
            "skinTone": { "type": "STRING" },
            "gender": { "type": "STRING", "enum": ["Male", "Female", "Unspecified"] },
            "undertone": { "type": "STRING", "enum": ["Warm", "Cool", "Neutral"] },
            "recommendations": { "type": "OBJECT", "properties": Value::Object(categories) }
        }
    })
}

pub fn weekly_plan_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "day": { "type": "STRING" },
                "occasion": { "type": "STRING" },
                "outfit": { "type": "STRING" }
            }
        }
    })
}

pub fn json_generation_config(schema: Value) -> Value {
    json!({
        "responseMimeType": "application/json",
        "responseSchema": schema
    })
}

fn or_unknown(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("unknown")
}

pub fn weekly_plan_prompt(profile: &StyleProfile) -> String {
    let gender = match profile.gender {
        Some(Gender::Male) => "man",
        Some(Gender::Female) => "woman",
        _ => "person",
    };
    let skin_tone = or_unknown(profile.skin_tone.as_deref());
    let undertone = or_unknown(profile.undertone.as_ref().map(|tone| tone.as_str()));
    let face_shape = or_unknown(profile.face_shape.as_deref());
    format!(
        "Based on a {gender} with {skin_tone} skin ({undertone} undertone) and a {face_shape} face shape, create a 7-day style calendar.
Include a mix of Casual, Office, and Traditional/Party styles. Suggest outfit colors that match their skin tone."
    )
}

/// Edit instruction that puts `item` on the person in the user's photo.
pub fn try_on_prompt(item: &str, category: StyleCategory, gender: Option<Gender>) -> String {
    let item = item.trim();
    let person = match gender {
        Some(Gender::Male) => "man",
        Some(Gender::Female) => "woman",
        _ => "person",
    };
    let instruction = match category {
        StyleCategory::Hair => format!("Change the {person}'s hairstyle to a {item}."),
        StyleCategory::Beard => format!("Give the {person} a {item} beard style."),
        StyleCategory::Makeup => format!("Apply a {item} makeup look to the {person}'s face."),
        StyleCategory::Color => format!("Dress the {person} in an outfit styled as: {item}."),
        StyleCategory::Accessory => format!("Add {item} to the {person}, worn naturally."),
        StyleCategory::Tattoo => format!("Add a tattoo to the {person}: {item}."),
        StyleCategory::Eyebrows => format!("Reshape the {person}'s eyebrows into a {item} shape."),
        StyleCategory::Eyelashes => format!("Give the {person} {item} eyelashes."),
    };
    format!("{instruction} {TRY_ON_PRESERVE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylist::profile::Undertone;

    #[test]
    fn profile_schema_constrains_enums_and_lists_every_category() {
        let schema = style_profile_schema();
        assert_eq!(
            schema.pointer("/properties/gender/enum"),
            Some(&json!(["Male", "Female", "Unspecified"]))
        );
        assert_eq!(
            schema.pointer("/properties/undertone/enum"),
            Some(&json!(["Warm", "Cool", "Neutral"]))
        );
        let categories = schema
            .pointer("/properties/recommendations/properties")
            .and_then(|value| value.as_object())
            .unwrap();
        assert_eq!(categories.len(), 10);
        assert_eq!(
            categories.get("eyebrows"),
            Some(&json!({ "type": "ARRAY", "items": { "type": "STRING" } }))
        );
    }

    #[test]
    fn plan_prompt_embeds_profile_attributes() {
        let profile = StyleProfile {
            face_shape: Some("Oval".into()),
            skin_tone: Some("Tan".into()),
            undertone: Some(Undertone::Warm),
            gender: Some(Gender::Male),
            ..Default::default()
        };
        let prompt = weekly_plan_prompt(&profile);
        assert!(prompt.starts_with("Based on a man with Tan skin (Warm undertone) and a Oval face shape"));
        assert!(prompt.contains("7-day style calendar"));
    }

    #[test]
    fn plan_prompt_marks_missing_attributes_as_unknown() {
        let prompt = weekly_plan_prompt(&StyleProfile::default());
        assert!(prompt.starts_with("Based on a person with unknown skin (unknown undertone)"));
    }

    #[test]
    fn plan_prompt_keeps_braces_in_model_text_verbatim() {
        let profile = StyleProfile {
            skin_tone: Some("{face_shape}".into()),
            face_shape: Some("Round".into()),
            ..Default::default()
        };
        let prompt = weekly_plan_prompt(&profile);
        assert!(prompt.contains("with {face_shape} skin"));
        assert!(prompt.contains("a Round face shape"));
    }

    #[test]
    fn try_on_prompt_is_category_specific() {
        let hair = try_on_prompt("Undercut", StyleCategory::Hair, Some(Gender::Male));
        assert!(hair.starts_with("Change the man's hairstyle to a Undercut."));
        assert!(hair.ends_with(TRY_ON_PRESERVE_SUFFIX));
        let tattoo = try_on_prompt(" Rose on wrist ", StyleCategory::Tattoo, None);
        assert!(tattoo.starts_with("Add a tattoo to the person: Rose on wrist."));
    }
}
