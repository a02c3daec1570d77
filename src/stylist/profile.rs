use std::fmt;

use serde::{Deserialize, Deserializer};

/// Number of items the analysis prompt asks for in every category.
pub const ITEMS_PER_CATEGORY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Unspecified,
}

impl Gender {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" | "man" => Gender::Male,
            "female" | "woman" => Gender::Female,
            _ => Gender::Unspecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unspecified => "Unspecified",
        }
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Gender::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Undertone {
    Warm,
    Cool,
    Neutral,
}

impl Undertone {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "warm" => Some(Undertone::Warm),
            "cool" => Some(Undertone::Cool),
            "neutral" => Some(Undertone::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Undertone::Warm => "Warm",
            Undertone::Cool => "Cool",
            Undertone::Neutral => "Neutral",
        }
    }
}

fn deserialize_undertone<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Undertone>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Undertone::parse))
}

/// Keys of the `recommendations` object returned by the analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecommendationField {
    Hair,
    Colors,
    Sunglasses,
    Tattoos,
    Beard,
    Makeup,
    Earrings,
    Stickers,
    Eyelashes,
    Eyebrows,
}

impl RecommendationField {
    pub const ALL: [RecommendationField; 10] = [
        RecommendationField::Hair,
        RecommendationField::Colors,
        RecommendationField::Sunglasses,
        RecommendationField::Tattoos,
        RecommendationField::Beard,
        RecommendationField::Makeup,
        RecommendationField::Earrings,
        RecommendationField::Stickers,
        RecommendationField::Eyelashes,
        RecommendationField::Eyebrows,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            RecommendationField::Hair => "hair",
            RecommendationField::Colors => "colors",
            RecommendationField::Sunglasses => "sunglasses",
            RecommendationField::Tattoos => "tattoos",
            RecommendationField::Beard => "beard",
            RecommendationField::Makeup => "makeup",
            RecommendationField::Earrings => "earrings",
            RecommendationField::Stickers => "stickers",
            RecommendationField::Eyelashes => "eyelashes",
            RecommendationField::Eyebrows => "eyebrows",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn category(&self) -> StyleCategory {
        match self {
            RecommendationField::Hair => StyleCategory::Hair,
            RecommendationField::Colors => StyleCategory::Color,
            RecommendationField::Sunglasses
            | RecommendationField::Earrings
            | RecommendationField::Stickers => StyleCategory::Accessory,
            RecommendationField::Tattoos => StyleCategory::Tattoo,
            RecommendationField::Beard => StyleCategory::Beard,
            RecommendationField::Makeup => StyleCategory::Makeup,
            RecommendationField::Eyelashes => StyleCategory::Eyelashes,
            RecommendationField::Eyebrows => StyleCategory::Eyebrows,
        }
    }

    /// Fields the analysis prompt asks the model to fill for `gender`.
    pub fn expected_for(gender: Option<Gender>) -> &'static [RecommendationField] {
        match gender {
            Some(Gender::Male) => &[
                RecommendationField::Hair,
                RecommendationField::Beard,
                RecommendationField::Sunglasses,
                RecommendationField::Colors,
                RecommendationField::Tattoos,
            ],
            Some(Gender::Female) => &[
                RecommendationField::Hair,
                RecommendationField::Sunglasses,
                RecommendationField::Colors,
                RecommendationField::Earrings,
                RecommendationField::Makeup,
                RecommendationField::Eyebrows,
                RecommendationField::Eyelashes,
                RecommendationField::Stickers,
                RecommendationField::Tattoos,
            ],
            _ => &[
                RecommendationField::Hair,
                RecommendationField::Sunglasses,
                RecommendationField::Colors,
                RecommendationField::Tattoos,
            ],
        }
    }
}

impl fmt::Display for RecommendationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// What a single recommended item is, for shopping, previews and try-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleCategory {
    Hair,
    Beard,
    Makeup,
    Color,
    Accessory,
    Tattoo,
    Eyebrows,
    Eyelashes,
}

impl StyleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleCategory::Hair => "hair",
            StyleCategory::Beard => "beard",
            StyleCategory::Makeup => "makeup",
            StyleCategory::Color => "color",
            StyleCategory::Accessory => "accessory",
            StyleCategory::Tattoo => "tattoo",
            StyleCategory::Eyebrows => "eyebrows",
            StyleCategory::Eyelashes => "eyelashes",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Recommendations {
    pub hair: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub sunglasses: Option<Vec<String>>,
    pub tattoos: Option<Vec<String>>,
    pub beard: Option<Vec<String>>,
    pub makeup: Option<Vec<String>>,
    pub earrings: Option<Vec<String>>,
    pub stickers: Option<Vec<String>>,
    pub eyelashes: Option<Vec<String>>,
    pub eyebrows: Option<Vec<String>>,
}

impl Recommendations {
    pub fn get(&self, field: RecommendationField) -> Option<&[String]> {
        let items = match field {
            RecommendationField::Hair => &self.hair,
            RecommendationField::Colors => &self.colors,
            RecommendationField::Sunglasses => &self.sunglasses,
            RecommendationField::Tattoos => &self.tattoos,
            RecommendationField::Beard => &self.beard,
            RecommendationField::Makeup => &self.makeup,
            RecommendationField::Earrings => &self.earrings,
            RecommendationField::Stickers => &self.stickers,
            RecommendationField::Eyelashes => &self.eyelashes,
            RecommendationField::Eyebrows => &self.eyebrows,
        };
        items.as_deref()
    }

    pub fn item(&self, field: RecommendationField, index: usize) -> Option<&str> {
        self.get(field)
            .and_then(|items| items.get(index))
            .map(|item| item.as_str())
    }

    pub fn is_empty(&self) -> bool {
        RecommendationField::ALL
            .iter()
            .all(|field| self.get(*field).is_none())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleProfile {
    pub face_shape: Option<String>,
    pub skin_tone: Option<String>,
    #[serde(deserialize_with = "deserialize_undertone")]
    pub undertone: Option<Undertone>,
    pub gender: Option<Gender>,
    pub recommendations: Recommendations,
}

impl StyleProfile {
    pub fn is_male(&self) -> bool {
        self.gender == Some(Gender::Male)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileIssue {
    EmptyResponse,
    MissingAttribute(&'static str),
    MissingCategory(RecommendationField),
    ItemCount {
        field: RecommendationField,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for ProfileIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileIssue::EmptyResponse => f.write_str("the style service returned no data"),
            ProfileIssue::MissingAttribute(name) => write!(f, "{name} was not detected"),
            ProfileIssue::MissingCategory(field) => write!(f, "no {field} recommendations"),
            ProfileIssue::ItemCount {
                field,
                expected,
                actual,
            } => write!(f, "{actual} of {expected} {field} recommendations"),
        }
    }
}

/// Analysis result together with everything the model left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileAnalysis {
    pub profile: StyleProfile,
    pub issues: Vec<ProfileIssue>,
}

impl ProfileAnalysis {
    pub fn empty() -> Self {
        Self {
            profile: StyleProfile::default(),
            issues: vec![ProfileIssue::EmptyResponse],
        }
    }

    pub fn from_profile(profile: StyleProfile) -> Self {
        let mut issues = Vec::new();
        if profile.gender.is_none() {
            issues.push(ProfileIssue::MissingAttribute("gender"));
        }
        if profile.face_shape.as_deref().map_or(true, |v| v.trim().is_empty()) {
            issues.push(ProfileIssue::MissingAttribute("face shape"));
        }
        if profile.skin_tone.as_deref().map_or(true, |v| v.trim().is_empty()) {
            issues.push(ProfileIssue::MissingAttribute("skin tone"));
        }
        if profile.undertone.is_none() {
            issues.push(ProfileIssue::MissingAttribute("undertone"));
        }

        for field in RecommendationField::expected_for(profile.gender) {
            match profile.recommendations.get(*field) {
                None => issues.push(ProfileIssue::MissingCategory(*field)),
                Some(items) if items.len() != ITEMS_PER_CATEGORY => {
                    issues.push(ProfileIssue::ItemCount {
                        field: *field,
                        expected: ITEMS_PER_CATEGORY,
                        actual: items.len(),
                    })
                }
                Some(_) => {}
            }
        }

        Self { profile, issues }
    }

    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn five(prefix: &str) -> Vec<String> {
        (1..=5).map(|i| format!("{prefix} {i}")).collect()
    }

    #[test]
    fn deserializes_camel_case_profile_with_optional_categories() {
        let profile: StyleProfile = serde_json::from_value(json!({
            "faceShape": "Oval",
            "skinTone": "Tan",
            "undertone": "Warm",
            "gender": "Male",
            "recommendations": { "hair": ["Undercut"], "beard": [] }
        }))
        .unwrap();
        assert_eq!(profile.face_shape.as_deref(), Some("Oval"));
        assert_eq!(profile.undertone, Some(Undertone::Warm));
        assert!(profile.is_male());
        assert_eq!(profile.recommendations.get(RecommendationField::Beard), Some(&[][..]));
        assert_eq!(profile.recommendations.get(RecommendationField::Makeup), None);
    }

    #[test]
    fn unknown_enum_values_degrade_instead_of_failing() {
        let profile: StyleProfile = serde_json::from_value(json!({
            "gender": "nonbinary",
            "undertone": "olive"
        }))
        .unwrap();
        assert_eq!(profile.gender, Some(Gender::Unspecified));
        assert_eq!(profile.undertone, None);
        assert_eq!(Gender::parse(" FEMALE "), Gender::Female);
    }

    #[test]
    fn complete_male_profile_has_no_issues() {
        let profile = StyleProfile {
            face_shape: Some("Oval".into()),
            skin_tone: Some("Tan".into()),
            undertone: Some(Undertone::Warm),
            gender: Some(Gender::Male),
            recommendations: Recommendations {
                hair: Some(five("hair")),
                beard: Some(five("beard")),
                sunglasses: Some(five("glasses")),
                colors: Some(five("color")),
                tattoos: Some(five("tattoo")),
                ..Default::default()
            },
        };
        assert!(ProfileAnalysis::from_profile(profile).is_complete());
    }

    #[test]
    fn reports_missing_categories_and_short_lists() {
        let profile = StyleProfile {
            face_shape: Some("Heart".into()),
            skin_tone: Some("Fair".into()),
            undertone: Some(Undertone::Cool),
            gender: Some(Gender::Female),
            recommendations: Recommendations {
                hair: Some(five("hair")),
                sunglasses: Some(vec!["Cat Eye".into()]),
                colors: Some(five("color")),
                earrings: Some(five("earrings")),
                makeup: Some(five("makeup")),
                eyebrows: Some(five("brows")),
                eyelashes: Some(five("lashes")),
                tattoos: Some(five("tattoo")),
                ..Default::default()
            },
        };
        let analysis = ProfileAnalysis::from_profile(profile);
        assert_eq!(
            analysis.issues,
            vec![
                ProfileIssue::ItemCount {
                    field: RecommendationField::Sunglasses,
                    expected: 5,
                    actual: 1
                },
                ProfileIssue::MissingCategory(RecommendationField::Stickers),
            ]
        );
        assert_eq!(
            analysis.issues[0].to_string(),
            "1 of 5 sunglasses recommendations"
        );
    }

    #[test]
    fn empty_analysis_has_no_categories() {
        let analysis = ProfileAnalysis::empty();
        assert!(analysis.profile.recommendations.is_empty());
        assert_eq!(analysis.issues, vec![ProfileIssue::EmptyResponse]);
    }

    #[test]
    fn field_keys_round_trip_and_map_to_categories() {
        for field in RecommendationField::ALL {
            assert_eq!(RecommendationField::from_key(field.key()), Some(field));
        }
        assert_eq!(RecommendationField::Sunglasses.category(), StyleCategory::Accessory);
        assert_eq!(RecommendationField::Colors.category(), StyleCategory::Color);
        assert_eq!(RecommendationField::from_key("shoes"), None);
    }
}
