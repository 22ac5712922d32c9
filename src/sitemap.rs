use std::fmt::Write;
use std::fs;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::articles::{self, ArticleMetadata};
use crate::config::Config;
use crate::feed::escape;

pub const SITEMAP_FILE: &str = "sitemap.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Weekly,
    Monthly,
}

impl ChangeFrequency {
    fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

/// Sitemap entries: the home page, the about page, and all articles.
pub fn entries(config: &Config, articles: &[ArticleMetadata], now: DateTime<Utc>) -> anyhow::Result<Vec<SitemapEntry>> {
    let mut entries = vec![
        SitemapEntry {
            url: config.base_url().to_string(),
            last_modified: Some(now),
            change_frequency: ChangeFrequency::Weekly,
            priority: 1.0,
        },
        SitemapEntry {
            url: config.page_url("about")?,
            last_modified: Some(now),
            change_frequency: ChangeFrequency::Monthly,
            priority: 0.9,
        },
    ];

    for article in articles {
        entries.push(SitemapEntry {
            url: config.page_url(&format!("articles/{}", article.slug))?,
            last_modified: article.published(),
            change_frequency: ChangeFrequency::Monthly,
            priority: 0.8,
        });
    }

    Ok(entries)
}

pub fn render(entries: &[SitemapEntry]) -> anyhow::Result<String> {
    let mut xml = String::new();
    writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(xml, r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#)?;
    for entry in entries {
        writeln!(xml, "  <url>")?;
        writeln!(xml, "    <loc>{}</loc>", escape(&entry.url))?;
        if let Some(date) = entry.last_modified {
            writeln!(xml, "    <lastmod>{}</lastmod>", date.to_rfc3339_opts(SecondsFormat::Millis, true))?;
        }
        writeln!(xml, "    <changefreq>{}</changefreq>", entry.change_frequency.as_str())?;
        writeln!(xml, "    <priority>{:.1}</priority>", entry.priority)?;
        writeln!(xml, "  </url>")?;
    }
    writeln!(xml, "</urlset>")?;
    Ok(xml)
}

/// Write the sitemap to the output directory.
pub fn write_sitemap(config: &Config) -> anyhow::Result<()> {
    let articles = articles::all_articles(&config.articles_dir)?;
    let entries = entries(config, &articles, Utc::now())?;
    let xml = render(&entries)?;

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Cannot create directory {:?}", &config.output_dir))?;
    let path = config.output_dir.join(SITEMAP_FILE);
    fs::write(&path, xml).with_context(|| format!("Cannot write to {:?}", &path))?;

    println!("Wrote sitemap with {} urls to {:?}", entries.len(), path);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use testresult::TestResult;

    #[test]
    fn test_sitemap() -> TestResult {
        let config: Config = serde_yaml::from_str("site_url: https://example.com")?;
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let article = articles::parse_article("hello", "---\ndate: 2024-01-15\n---\nHi")?.metadata;

        let entries = entries(&config, &[article], now)?;
        assert_eq!(3, entries.len());
        assert_eq!("https://example.com", entries[0].url);
        assert_eq!("https://example.com/about", entries[1].url);
        assert_eq!("https://example.com/articles/hello", entries[2].url);

        let xml = render(&entries)?;
        insta::assert_snapshot!(xml.trim_end(), @r###"
        <?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url>
            <loc>https://example.com</loc>
            <lastmod>2024-05-01T08:00:00.000Z</lastmod>
            <changefreq>weekly</changefreq>
            <priority>1.0</priority>
          </url>
          <url>
            <loc>https://example.com/about</loc>
            <lastmod>2024-05-01T08:00:00.000Z</lastmod>
            <changefreq>monthly</changefreq>
            <priority>0.9</priority>
          </url>
          <url>
            <loc>https://example.com/articles/hello</loc>
            <lastmod>2024-01-15T00:00:00.000Z</lastmod>
            <changefreq>monthly</changefreq>
            <priority>0.8</priority>
          </url>
        </urlset>
        "###);

        Ok(())
    }
}
