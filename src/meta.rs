//! Document metadata derived from site settings.
//!
//! Rebuilt on every settings broadcast and on every navigation: title,
//! description, keywords, Open Graph tags, canonical link, favicon and
//! JSON-LD (`NewsArticle` on the detail view, `FAQPage` when the settings
//! carry FAQ entries).
use serde_json::{json, Value};
use url::Url;

use crate::storage::{NewsItem, SiteSettings};

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    pub language: String,
    pub title: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    /// `(property, content)` pairs, e.g. `("og:title", ...)`.
    pub open_graph: Vec<(String, String)>,
    pub canonical: Option<String>,
    pub favicon: Option<String>,
    pub json_ld: Vec<Value>,
}

impl DocumentMeta {
    /// Build metadata for the page at `path`.
    ///
    /// `article` is the post shown by the detail view, if any. A `path` that
    /// cannot be joined onto `site_url` leaves the canonical link out.
    pub fn build(
        settings: &SiteSettings,
        site_url: &Url,
        path: &str,
        article: Option<&NewsItem>,
    ) -> Self {
        let canonical = site_url.join(path).ok().map(|u| u.to_string());

        let title = match article {
            Some(a) => format!("{} | {}", a.title, settings.site_title),
            None => settings.site_title.clone(),
        };
        let description = article
            .and_then(|a| a.summary.clone())
            .or_else(|| settings.description.clone())
            .filter(|d| !d.trim().is_empty());
        let keywords = (!settings.keywords.is_empty()).then(|| settings.keywords.join(", "));
        let image = article
            .and_then(|a| a.image_url.clone())
            .or_else(|| settings.og_image_url.clone());

        let mut open_graph = vec![
            ("og:title".to_string(), title.clone()),
            (
                "og:type".to_string(),
                if article.is_some() { "article" } else { "website" }.to_string(),
            ),
            ("og:site_name".to_string(), settings.site_title.clone()),
            ("og:locale".to_string(), settings.language_code.clone()),
        ];
        if let Some(d) = &description {
            open_graph.push(("og:description".to_string(), d.clone()));
        }
        if let Some(img) = &image {
            open_graph.push(("og:image".to_string(), img.clone()));
        }
        if let Some(url) = &canonical {
            open_graph.push(("og:url".to_string(), url.clone()));
        }

        let mut json_ld = Vec::new();
        if let Some(a) = article {
            json_ld.push(news_article_ld(a, settings, canonical.as_deref()));
        }
        if !settings.faq.is_empty() {
            json_ld.push(faq_page_ld(settings));
        }

        Self {
            language: settings.language_code.clone(),
            title,
            description,
            keywords,
            open_graph,
            canonical,
            favicon: settings.favicon_url.clone(),
            json_ld,
        }
    }

    /// Render as `<head>` elements.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("<title>{}</title>\n", escape(&self.title)));
        if let Some(d) = &self.description {
            out.push_str(&format!(
                "<meta name=\"description\" content=\"{}\">\n",
                escape(d)
            ));
        }
        if let Some(k) = &self.keywords {
            out.push_str(&format!(
                "<meta name=\"keywords\" content=\"{}\">\n",
                escape(k)
            ));
        }
        for (property, content) in &self.open_graph {
            out.push_str(&format!(
                "<meta property=\"{}\" content=\"{}\">\n",
                escape(property),
                escape(content)
            ));
        }
        if let Some(c) = &self.canonical {
            out.push_str(&format!("<link rel=\"canonical\" href=\"{}\">\n", escape(c)));
        }
        if let Some(f) = &self.favicon {
            out.push_str(&format!("<link rel=\"icon\" href=\"{}\">\n", escape(f)));
        }
        for ld in &self.json_ld {
            // `</` would close the script element early
            let body = ld.to_string().replace("</", "<\\/");
            out.push_str(&format!(
                "<script type=\"application/ld+json\">{body}</script>\n"
            ));
        }
        out
    }
}

fn news_article_ld(article: &NewsItem, settings: &SiteSettings, url: Option<&str>) -> Value {
    let published = chrono::DateTime::from_timestamp(article.published_at, 0)
        .map(|d| d.to_rfc3339())
        .unwrap_or_default();
    let mut ld = json!({
        "@context": "https://schema.org",
        "@type": "NewsArticle",
        "headline": article.title,
        "datePublished": published,
        "inLanguage": article.language_code,
        "publisher": { "@type": "Organization", "name": settings.site_title },
    });
    if let Some(summary) = &article.summary {
        ld["description"] = json!(summary);
    }
    if let Some(image) = &article.image_url {
        ld["image"] = json!([image]);
    }
    if let Some(author) = &article.author_name {
        ld["author"] = json!({ "@type": "Person", "name": author });
    }
    if let Some(url) = url {
        ld["mainEntityOfPage"] = json!(url);
    }
    ld
}

fn faq_page_ld(settings: &SiteSettings) -> Value {
    let entities: Vec<Value> = settings
        .faq
        .iter()
        .map(|entry| {
            json!({
                "@type": "Question",
                "name": entry.question,
                "acceptedAnswer": { "@type": "Answer", "text": entry.answer },
            })
        })
        .collect();
    json!({
        "@context": "https://schema.org",
        "@type": "FAQPage",
        "mainEntity": entities,
    })
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
