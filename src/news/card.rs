use serde::Serialize;

use crate::storage::{HomepageBlock, NewsItem};

/// Layout of a feed card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Standard,
    Slider,
    Poll,
    Gallery,
}

/// Feed-card projection of a post.
///
/// A homepage block replaces summary, media and card type on the card only;
/// the detail view always uses the underlying post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedCard {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub author_name: Option<String>,
    pub published_at: i64,
    pub card_type: CardType,
    pub media: Vec<String>,
    pub poll_options: Vec<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    pub liked: bool,
    pub saved: bool,
}

impl FeedCard {
    pub fn from_item(item: &NewsItem) -> Self {
        let (card_type, summary, media, poll_options) = match &item.homepage_block {
            None => (
                CardType::Standard,
                item.summary.clone(),
                item.image_url.iter().cloned().collect(),
                Vec::new(),
            ),
            Some(HomepageBlock::Slider { images, caption }) => (
                CardType::Slider,
                caption.clone().or_else(|| item.summary.clone()),
                images.clone(),
                Vec::new(),
            ),
            Some(HomepageBlock::Gallery { images, caption }) => (
                CardType::Gallery,
                caption.clone().or_else(|| item.summary.clone()),
                images.clone(),
                Vec::new(),
            ),
            Some(HomepageBlock::Poll { question, options }) => (
                CardType::Poll,
                Some(question.clone()),
                item.image_url.iter().cloned().collect(),
                options.clone(),
            ),
        };

        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            summary,
            category: item.category.clone(),
            author_name: item.author_name.clone(),
            published_at: item.published_at,
            card_type,
            media,
            poll_options,
            likes_count: item.likes_count,
            comments_count: item.comments_count,
            shares_count: item.shares_count,
            liked: item.liked,
            saved: item.saved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(block: Option<HomepageBlock>) -> NewsItem {
        NewsItem {
            id: "p1".to_string(),
            slug: None,
            title: "Başlık".to_string(),
            summary: Some("Özet".to_string()),
            content: None,
            category: Some("spor".to_string()),
            author_id: None,
            author_name: None,
            publisher_id: None,
            image_url: Some("cover.jpg".to_string()),
            language_code: "tr".to_string(),
            created_at: 0,
            published_at: 0,
            likes_count: 3,
            comments_count: 0,
            shares_count: 0,
            views_count: 0,
            liked: true,
            saved: false,
            homepage_block: block,
        }
    }

    #[test]
    fn test_standard_card() {
        let card = FeedCard::from_item(&item(None));
        assert_eq!(card.card_type, CardType::Standard);
        assert_eq!(card.summary.as_deref(), Some("Özet"));
        assert_eq!(card.media, vec!["cover.jpg"]);
        assert!(card.liked);
    }

    #[test]
    fn test_slider_block_overrides_media() {
        let card = FeedCard::from_item(&item(Some(HomepageBlock::Slider {
            images: vec!["a.jpg".to_string(), "b.jpg".to_string()],
            caption: Some("Galeri".to_string()),
        })));
        assert_eq!(card.card_type, CardType::Slider);
        assert_eq!(card.summary.as_deref(), Some("Galeri"));
        assert_eq!(card.media, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_poll_block() {
        let card = FeedCard::from_item(&item(Some(HomepageBlock::Poll {
            question: "Hangisi?".to_string(),
            options: vec!["A".to_string(), "B".to_string()],
        })));
        assert_eq!(card.card_type, CardType::Poll);
        assert_eq!(card.summary.as_deref(), Some("Hangisi?"));
        assert_eq!(card.poll_options.len(), 2);
    }

    #[test]
    fn test_gallery_without_caption_keeps_summary() {
        let card = FeedCard::from_item(&item(Some(HomepageBlock::Gallery {
            images: vec![],
            caption: None,
        })));
        assert_eq!(card.card_type, CardType::Gallery);
        assert_eq!(card.summary.as_deref(), Some("Özet"));
        assert!(card.media.is_empty());
    }
}
