use reqwest::Url;

use crate::browser::links::LinkSettings;
use crate::browser::tabs::{sections_for_tab, Tab, TabLabel};
use crate::stylist::{RecommendationField, StyleCategory, StyleProfile};
use crate::utils::telegram::escape_html;

pub const EMPTY_SECTION_PLACEHOLDER: &str = "No recommendations found.";

/// A single recommended item with its outbound links.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationCard {
    pub item: String,
    pub category: StyleCategory,
    pub field: RecommendationField,
    pub index: usize,
    pub preview_url: Url,
    pub shop_url: Url,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
    pub title: &'static str,
    pub cards: Vec<RecommendationCard>,
    pub placeholder: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabView {
    pub tab: Tab,
    pub label: TabLabel,
    pub sections: Vec<SectionView>,
}

impl TabView {
    pub fn build(profile: &StyleProfile, tab: Tab, links: &LinkSettings) -> Self {
        let sections = sections_for_tab(profile, tab)
            .into_iter()
            .map(|section| {
                let cards: Vec<RecommendationCard> = section
                    .items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| RecommendationCard {
                        item: item.clone(),
                        category: section.category,
                        field: section.field,
                        index,
                        preview_url: links.preview_url(item, section.category, profile.gender),
                        shop_url: links.shop_url(item, section.category, profile.gender),
                    })
                    .collect();
                let placeholder = cards.is_empty().then_some(EMPTY_SECTION_PLACEHOLDER);
                SectionView {
                    title: section.title,
                    cards,
                    placeholder,
                }
            })
            .collect();

        Self {
            tab,
            label: tab.label(profile.gender),
            sections,
        }
    }

    pub fn cards(&self) -> impl Iterator<Item = &RecommendationCard> {
        self.sections.iter().flat_map(|section| section.cards.iter())
    }

    /// HTML body for the tab message. Empty sections print the placeholder.
    pub fn render_html(&self) -> String {
        let mut text = format!("<b>{} {}</b>", self.label.icon, self.label.label);
        if self.sections.is_empty() {
            text.push_str(&format!("\n\n<i>{EMPTY_SECTION_PLACEHOLDER}</i>"));
            return text;
        }
        for section in &self.sections {
            text.push_str(&format!("\n\n<b>{}</b>", escape_html(section.title)));
            if let Some(placeholder) = section.placeholder {
                text.push_str(&format!("\n<i>{placeholder}</i>"));
                continue;
            }
            for card in &section.cards {
                text.push_str(&format!("\n{}. {}", card.index + 1, escape_html(&card.item)));
            }
        }
        text
    }
}
