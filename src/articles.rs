//! Articles of the site: `<slug>.mdx` files in the articles directory.

use std::cmp::Reverse;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};

use crate::frontmatter;

pub const ARTICLE_EXTENSION: &str = "mdx";

/// Reading speed used to compute reading times, in words per minute.
const WORDS_PER_MINUTE: f64 = 200.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Article,
    Short,
    Technical,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Faq {
    pub q: String,
    pub a: String,
}

/// Front matter as written by authors. Everything is optional, and a field with an unexpected
/// type is ignored rather than failing the whole article.
#[derive(Debug, Default, Deserialize)]
struct RawFrontMatter {
    #[serde(deserialize_with = "deser_scalar_string", default)]
    title: Option<String>,
    #[serde(deserialize_with = "deser_scalar_string", default)]
    date: Option<String>,
    #[serde(deserialize_with = "deser_scalar_string", default)]
    excerpt: Option<String>,
    #[serde(deserialize_with = "deser_or_ignore", default)]
    template: Option<Template>,
    #[serde(deserialize_with = "deser_scalar_string", default)]
    category: Option<String>,
    #[serde(deserialize_with = "deser_keywords", default)]
    keywords: Option<Vec<String>>,
    #[serde(deserialize_with = "deser_or_ignore", default)]
    faq: Option<Vec<Faq>>,
}

/// Strings, numbers and booleans, as a string. `title: 2024` is a valid title.
fn deser_scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_string(&value))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        _ => None,
    }
}

/// A list of keywords, or a single comma-separated string.
fn deser_keywords<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<String>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let keywords = match &value {
        Value::Sequence(items) => items.iter().filter_map(scalar_string).collect(),
        Value::String(s) => s.split(',').map(str::trim).filter(|k| !k.is_empty()).map(String::from).collect(),
        _ => return Ok(None),
    };
    Ok(Some(keywords))
}

fn deser_or_ignore<'de, D: Deserializer<'de>, T: DeserializeOwned>(deserializer: D) -> Result<Option<T>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_yaml::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(err) => {
            log::warn!("Ignoring invalid front matter field: {}", err);
            Ok(None)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArticleMetadata {
    pub slug: String,
    pub title: String,
    /// Publication date as written in the front matter (ISO-8601)
    pub date: String,
    pub reading_time: String,
    pub excerpt: String,
    pub template: Template,
    pub category: String,
    pub keywords: Option<Vec<String>>,
    pub faq: Option<Vec<Faq>>,
}

impl ArticleMetadata {
    /// The publication date, if it can be parsed.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        parse_date(&self.date)
    }
}

#[derive(Debug, Clone)]
pub struct Article {
    pub metadata: ArticleMetadata,
    /// The front matter fields as found in the source file, without defaults
    pub front_matter: Mapping,
    /// MDX body, without the front matter
    pub content: String,
}

/// Slugs of all articles, sorted. A missing directory has no articles.
pub fn article_slugs(dir: &Path) -> anyhow::Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut slugs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Cannot list articles in {:?}", dir))? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == ARTICLE_EXTENSION) && path.is_file() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                slugs.push(stem.to_string());
            }
        }
    }
    slugs.sort();
    Ok(slugs)
}

/// Load an article from its slug. Returns `None` if there's no such article.
pub fn load_article(dir: &Path, slug: &str) -> anyhow::Result<Option<Article>> {
    let path = dir.join(slug).with_extension(ARTICLE_EXTENSION);
    if !path.exists() {
        return Ok(None);
    }

    let source = fs::read_to_string(&path).with_context(|| format!("Cannot read article {:?}", &path))?;
    let article = parse_article(slug, &source).with_context(|| format!("Cannot parse article {:?}", &path))?;
    Ok(Some(article))
}

/// Parse an article source, applying defaults for missing front matter fields.
pub fn parse_article(slug: &str, source: &str) -> anyhow::Result<Article> {
    let (front_matter, content) = frontmatter::read_frontmatter(source)?;
    let raw: RawFrontMatter = serde_yaml::from_value(serde_yaml::Value::Mapping(front_matter.clone()))?;

    let metadata = ArticleMetadata {
        slug: slug.to_string(),
        title: raw.title.unwrap_or_else(|| "Untitled".to_string()),
        date: raw.date.unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        reading_time: reading_time(content),
        excerpt: raw.excerpt.unwrap_or_default(),
        template: raw.template.unwrap_or_default(),
        category: raw.category.unwrap_or_default(),
        keywords: raw.keywords,
        faq: raw.faq,
    };

    Ok(Article {
        metadata,
        front_matter,
        content: content.to_string(),
    })
}

/// Metadata of all articles, newest first. Articles with an unparseable date come last.
/// Articles that can't be read are skipped with a warning.
pub fn all_articles(dir: &Path) -> anyhow::Result<Vec<ArticleMetadata>> {
    let mut articles = Vec::new();
    for slug in article_slugs(dir)? {
        match load_article(dir, &slug) {
            Ok(Some(article)) => articles.push(article.metadata),
            Ok(None) => {}
            Err(err) => log::warn!("Skipping article '{}': {:#}", slug, err),
        }
    }

    articles.sort_by_key(|a| Reverse(a.published()));
    Ok(articles)
}

/// Estimated reading time, e.g. "3 min read".
pub fn reading_time(text: &str) -> String {
    let words = text.split_whitespace().count() as f64;
    let minutes = words / WORDS_PER_MINUTE;
    // Round to 2 decimals before rounding up, so that 2.001 minutes read as 2
    let displayed = ((minutes * 100.0).round() / 100.0).ceil() as u64;
    format!("{} min read", displayed)
}

/// Parse an ISO-8601 date or date-time. Dates without a time are midnight UTC.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;
    use testresult::TestResult;

    #[test]
    fn test_parse_article() -> TestResult {
        let source = indoc! {r#"
            ---
            title: "Mindful prompts"
            date: "2024-03-01"
            excerpt: Short excerpt
            template: technical
            keywords: [ai, prompts]
            faq:
              - q: Why?
                a: Because.
            ---
            Body text here.
        "#};

        let article = parse_article("mindful-prompts", source)?;
        let meta = &article.metadata;

        assert_eq!("mindful-prompts", meta.slug);
        assert_eq!("Mindful prompts", meta.title);
        assert_eq!("2024-03-01", meta.date);
        assert_eq!("Short excerpt", meta.excerpt);
        assert_eq!(Template::Technical, meta.template);
        assert_eq!("", meta.category);
        assert_eq!(Some(vec!["ai".to_string(), "prompts".to_string()]), meta.keywords);
        assert_eq!(1, meta.faq.as_ref().map_or(0, |f| f.len()));
        assert_eq!("1 min read", meta.reading_time);
        assert_eq!("Body text here.\n", article.content);
        assert!(article.front_matter.get("category").is_none());
        Ok(())
    }

    #[test]
    fn test_defaults() -> TestResult {
        let article = parse_article("bare", "Just text")?;
        let meta = article.metadata;

        assert_eq!("Untitled", meta.title);
        assert_eq!(Template::Article, meta.template);
        assert_eq!("", meta.excerpt);
        assert!(meta.published().is_some());
        assert_eq!("Just text", article.content);
        Ok(())
    }

    #[test]
    fn test_lenient_front_matter() -> TestResult {
        let source = indoc! {r#"
            ---
            title: 2024
            excerpt: true
            category: [not, a, string]
            template: fancy
            keywords: "ai, ethics ,"
            faq: not a list
            ---
            Text
        "#};

        let meta = parse_article("lenient", source)?.metadata;
        assert_eq!("2024", meta.title);
        assert_eq!("true", meta.excerpt);
        assert_eq!("", meta.category);
        assert_eq!(Template::Article, meta.template);
        assert_eq!(Some(vec!["ai".to_string(), "ethics".to_string()]), meta.keywords);
        assert_eq!(None, meta.faq);
        Ok(())
    }

    #[test]
    fn test_invalid_yaml_fails() {
        assert!(parse_article("x", "---\ntitle: [unclosed\n---\n").is_err());
    }

    #[test]
    fn test_unreadable_articles_are_skipped() -> TestResult {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("good.mdx"), "---\ntitle: Good\n---\nFine")?;
        fs::write(dir.path().join("bad.mdx"), "---\ntitle: [unclosed\n---\n")?;

        let articles = all_articles(dir.path())?;
        assert_eq!(1, articles.len());
        assert_eq!("good", articles[0].slug);
        Ok(())
    }

    #[test]
    fn test_reading_time() {
        assert_eq!("0 min read", reading_time(""));
        assert_eq!("1 min read", reading_time("one two three"));
        assert_eq!("1 min read", reading_time(&"word ".repeat(200)));
        assert_eq!("2 min read", reading_time(&"word ".repeat(300)));
        assert_eq!("5 min read", reading_time(&"word ".repeat(1000)));
    }

    #[test]
    fn test_parse_date() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(Some(expected), parse_date("2024-01-15"));
        assert_eq!(Some(expected), parse_date("2024-01-15T00:00:00Z"));
        assert_eq!(Some(expected), parse_date("2024-01-15T01:00:00+01:00"));
        assert_eq!(Some(expected), parse_date("2024-01-15T00:00:00"));
        assert_eq!(None, parse_date("January 15th"));
    }
}
