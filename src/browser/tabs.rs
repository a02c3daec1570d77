use crate::stylist::{Gender, RecommendationField, StyleCategory, StyleProfile};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tab {
    #[default]
    Hair,
    Face,
    Eyes,
    Style,
    Accessory,
    Tattoo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabLabel {
    pub icon: &'static str,
    pub label: &'static str,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Hair,
        Tab::Face,
        Tab::Eyes,
        Tab::Style,
        Tab::Accessory,
        Tab::Tattoo,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Tab::Hair => "hair",
            Tab::Face => "face",
            Tab::Eyes => "eyes",
            Tab::Style => "style",
            Tab::Accessory => "accessory",
            Tab::Tattoo => "tattoo",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tab| tab.id() == id)
    }

    pub fn label(&self, gender: Option<Gender>) -> TabLabel {
        let is_male = gender == Some(Gender::Male);
        match self {
            Tab::Hair => TabLabel {
                icon: "💇",
                label: "Hair",
            },
            Tab::Face if is_male => TabLabel {
                icon: "🧔",
                label: "Beard",
            },
            Tab::Face => TabLabel {
                icon: "💄",
                label: "Makeup",
            },
            Tab::Eyes => TabLabel {
                icon: "🕶️",
                label: "Eyes",
            },
            Tab::Style => TabLabel {
                icon: "👗",
                label: "Outfit",
            },
            Tab::Accessory => TabLabel {
                icon: "✨",
                label: "Bling",
            },
            Tab::Tattoo => TabLabel {
                icon: "🐉",
                label: "Tattoo",
            },
        }
    }
}

/// One titled list of recommendations shown on a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationSection {
    pub title: &'static str,
    pub items: Vec<String>,
    pub category: StyleCategory,
    pub field: RecommendationField,
}

fn section(
    profile: &StyleProfile,
    title: &'static str,
    field: RecommendationField,
) -> RecommendationSection {
    RecommendationSection {
        title,
        items: profile
            .recommendations
            .get(field)
            .map(|items| items.to_vec())
            .unwrap_or_default(),
        category: field.category(),
        field,
    }
}

fn push_if_present(
    sections: &mut Vec<RecommendationSection>,
    profile: &StyleProfile,
    title: &'static str,
    field: RecommendationField,
) {
    if profile.recommendations.get(field).is_some() {
        sections.push(section(profile, title, field));
    }
}

/// Sections shown for `tab`. "Always" sections appear even when the model left
/// the list out, so the empty state is rendered instead of nothing.
pub fn sections_for_tab(profile: &StyleProfile, tab: Tab) -> Vec<RecommendationSection> {
    let mut sections = Vec::new();
    let is_male = profile.is_male();

    match tab {
        Tab::Hair => {
            sections.push(section(profile, "Recommended Hairstyles", RecommendationField::Hair));
        }
        Tab::Face => {
            if is_male {
                push_if_present(&mut sections, profile, "Beard Styles", RecommendationField::Beard);
            } else {
                push_if_present(
                    &mut sections,
                    profile,
                    "Makeup & Lipstick",
                    RecommendationField::Makeup,
                );
            }
        }
        Tab::Eyes => {
            sections.push(section(
                profile,
                "Sunglasses & Frames",
                RecommendationField::Sunglasses,
            ));
            if !is_male {
                push_if_present(
                    &mut sections,
                    profile,
                    "Eyebrow Shapes",
                    RecommendationField::Eyebrows,
                );
                push_if_present(&mut sections, profile, "Eyelashes", RecommendationField::Eyelashes);
            }
        }
        Tab::Style => {
            sections.push(section(
                profile,
                "Best Colors & Outfits",
                RecommendationField::Colors,
            ));
        }
        Tab::Accessory => {
            if !is_male {
                push_if_present(&mut sections, profile, "Earrings", RecommendationField::Earrings);
                push_if_present(
                    &mut sections,
                    profile,
                    "Bindis & Stickers",
                    RecommendationField::Stickers,
                );
            }
        }
        Tab::Tattoo => {
            push_if_present(&mut sections, profile, "Tattoo Concepts", RecommendationField::Tattoos);
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylist::Recommendations;

    fn five(prefix: &str) -> Option<Vec<String>> {
        Some((1..=5).map(|i| format!("{prefix} {i}")).collect())
    }

    fn everything(gender: Gender) -> StyleProfile {
        StyleProfile {
            gender: Some(gender),
            recommendations: Recommendations {
                hair: five("hair"),
                colors: five("color"),
                sunglasses: five("glasses"),
                tattoos: five("tattoo"),
                beard: five("beard"),
                makeup: five("makeup"),
                earrings: five("earrings"),
                stickers: five("stickers"),
                eyelashes: five("lashes"),
                eyebrows: five("brows"),
            },
            ..Default::default()
        }
    }

    fn fields(sections: &[RecommendationSection]) -> Vec<RecommendationField> {
        sections.iter().map(|section| section.field).collect()
    }

    #[test]
    fn male_face_tab_only_shows_beard_and_accessory_tab_is_empty() {
        let profile = everything(Gender::Male);
        let face = sections_for_tab(&profile, Tab::Face);
        assert_eq!(fields(&face), vec![RecommendationField::Beard]);
        assert_eq!(face[0].category, StyleCategory::Beard);
        assert!(sections_for_tab(&profile, Tab::Accessory).is_empty());
    }

    #[test]
    fn female_eyes_tab_includes_brows_and_lashes() {
        let profile = everything(Gender::Female);
        assert_eq!(
            fields(&sections_for_tab(&profile, Tab::Eyes)),
            vec![
                RecommendationField::Sunglasses,
                RecommendationField::Eyebrows,
                RecommendationField::Eyelashes
            ]
        );
        assert_eq!(
            fields(&sections_for_tab(&profile, Tab::Face)),
            vec![RecommendationField::Makeup]
        );
        assert_eq!(
            fields(&sections_for_tab(&profile, Tab::Accessory)),
            vec![RecommendationField::Earrings, RecommendationField::Stickers]
        );
    }

    #[test]
    fn male_eyes_tab_excludes_brows_and_lashes_even_when_present() {
        let profile = everything(Gender::Male);
        assert_eq!(
            fields(&sections_for_tab(&profile, Tab::Eyes)),
            vec![RecommendationField::Sunglasses]
        );
    }

    #[test]
    fn female_sections_are_skipped_when_absent() {
        let mut profile = everything(Gender::Female);
        profile.recommendations.eyelashes = None;
        profile.recommendations.earrings = None;
        assert_eq!(
            fields(&sections_for_tab(&profile, Tab::Eyes)),
            vec![RecommendationField::Sunglasses, RecommendationField::Eyebrows]
        );
        assert_eq!(
            fields(&sections_for_tab(&profile, Tab::Accessory)),
            vec![RecommendationField::Stickers]
        );
    }

    #[test]
    fn always_sections_survive_an_empty_profile() {
        let profile = StyleProfile::default();
        let hair = sections_for_tab(&profile, Tab::Hair);
        assert_eq!(hair.len(), 1);
        assert!(hair[0].items.is_empty());
        assert_eq!(sections_for_tab(&profile, Tab::Style).len(), 1);
        assert_eq!(sections_for_tab(&profile, Tab::Eyes).len(), 1);
        assert!(sections_for_tab(&profile, Tab::Tattoo).is_empty());
        assert!(sections_for_tab(&profile, Tab::Face).is_empty());
    }

    #[test]
    fn face_tab_label_follows_gender() {
        assert_eq!(Tab::Face.label(Some(Gender::Male)).label, "Beard");
        assert_eq!(Tab::Face.label(Some(Gender::Female)).label, "Makeup");
        assert_eq!(Tab::Face.label(None).icon, "💄");
        for tab in Tab::ALL {
            assert_eq!(Tab::from_id(tab.id()), Some(tab));
        }
    }
}
