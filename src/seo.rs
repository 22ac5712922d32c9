//! Search engine metadata of articles: page metadata (description, keywords, Open Graph and
//! Twitter cards, alternate links) and schema.org structured data as JSON-LD.

use std::fs;

use anyhow::Context;
use serde_json::{json, Value};

use crate::articles::{self, ArticleMetadata, Faq};
use crate::config::Config;
use crate::publish::MARKDOWN_DIR;

/// Output directory of the SEO files, relative to the site's output directory.
pub const SEO_DIR: &str = "seo";

/// Keywords added to every article's own category.
pub const BASE_KEYWORDS: [&str; 3] = ["AI", "Technology", "Philosophy"];

const SCHEMA_CONTEXT: &str = "https://schema.org";

/// Keywords of an article: the ones from its front matter, or its category followed by the
/// base keywords.
pub fn keywords(article: &ArticleMetadata) -> Vec<String> {
    if let Some(keywords) = article.keywords.as_ref().filter(|k| !k.is_empty()) {
        return keywords.clone();
    }

    let category = Some(article.category.as_str()).filter(|c| !c.is_empty());
    category
        .into_iter()
        .chain(BASE_KEYWORDS)
        .map(String::from)
        .collect()
}

pub fn page_metadata(config: &Config, article: &ArticleMetadata) -> anyhow::Result<Value> {
    let url = config.page_url(&format!("articles/{}", article.slug))?;
    let author = config.author_name();
    let tags: Vec<&str> = Some(article.category.as_str()).filter(|c| !c.is_empty()).into_iter().collect();

    let mut twitter = json!({
        "card": "summary_large_image",
        "title": article.title,
        "description": article.excerpt,
    });
    if let Some(handle) = &config.twitter_handle {
        twitter["creator"] = json!(handle);
    }

    Ok(json!({
        "title": article.title,
        "description": article.excerpt,
        "keywords": keywords(article),
        "authors": [{ "name": author }],
        "openGraph": {
            "type": "article",
            "locale": "en_US",
            "url": url,
            "title": article.title,
            "description": article.excerpt,
            "siteName": config.site_title,
            "publishedTime": article.date,
            "authors": [author],
            "tags": tags,
        },
        "twitter": twitter,
        "alternates": {
            "canonical": url,
            "types": {
                "text/markdown": format!("/{}/{}.md", MARKDOWN_DIR, article.slug),
            },
        },
    }))
}

/// schema.org `Article` of an article page.
pub fn article_json_ld(config: &Config, article: &ArticleMetadata) -> anyhow::Result<Value> {
    let author = config.author_name();

    Ok(json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "Article",
        "headline": article.title,
        "description": article.excerpt,
        "datePublished": article.date,
        "dateModified": article.date,
        "author": {
            "@type": "Person",
            "name": author,
            "url": config.base_url(),
        },
        "publisher": {
            "@type": "Organization",
            "name": config.site_title,
            "logo": {
                "@type": "ImageObject",
                "url": config.page_url("logo.png")?,
            },
        },
        "mainEntityOfPage": {
            "@type": "WebPage",
            "@id": config.page_url(&format!("articles/{}", article.slug))?,
        },
    }))
}

/// schema.org `FAQPage` for a list of questions and answers. No questions, no page.
pub fn faq_json_ld(faq: &[Faq]) -> Option<Value> {
    if faq.is_empty() {
        return None;
    }

    let questions = faq
        .iter()
        .map(|item| {
            json!({
                "@type": "Question",
                "name": item.q,
                "acceptedAnswer": {
                    "@type": "Answer",
                    "text": item.a,
                },
            })
        })
        .collect::<Vec<_>>();

    Some(json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "FAQPage",
        "mainEntity": questions,
    }))
}

/// All structured data blocks of an article page.
pub fn structured_data(config: &Config, article: &ArticleMetadata) -> anyhow::Result<Vec<Value>> {
    let mut data = vec![article_json_ld(config, article)?];
    if let Some(faq) = article.faq.as_deref().and_then(faq_json_ld) {
        data.push(faq);
    }
    Ok(data)
}

/// Write `<output_dir>/seo/<slug>.json` for all articles, holding the page metadata and the
/// structured data.
pub fn write_seo(config: &Config) -> anyhow::Result<()> {
    let articles = articles::all_articles(&config.articles_dir)?;

    let out_dir = config.output_dir.join(SEO_DIR);
    fs::create_dir_all(&out_dir).with_context(|| format!("Cannot create directory {:?}", &out_dir))?;

    for article in &articles {
        let seo = json!({
            "metadata": page_metadata(config, article)?,
            "structuredData": structured_data(config, article)?,
        });

        let path = out_dir.join(&article.slug).with_extension("json");
        let file = fs::File::create(&path).with_context(|| format!("Cannot create {:?}", &path))?;
        serde_json::to_writer_pretty(file, &seo).with_context(|| format!("Cannot write to {:?}", &path))?;
    }

    println!("Wrote SEO metadata of {} articles to {:?}", articles.len(), out_dir);
    Ok(())
}
