//! RSS 2.0 feed of the articles.

use std::fmt::Write;
use std::fs;

use anyhow::Context;
use chrono::{DateTime, Utc};
use indoc::formatdoc;

use crate::articles::{self, ArticleMetadata};
use crate::config::Config;

pub const FEED_FILE: &str = "feed.xml";

/// Render the feed for a list of articles, in the order given.
pub fn render(config: &Config, articles: &[ArticleMetadata], build_date: DateTime<Utc>) -> anyhow::Result<String> {
    let site = config.base_url();

    let mut items = String::new();
    for article in articles {
        let link = config.page_url(&format!("articles/{}", article.slug))?;
        let category = if article.category.is_empty() {
            &config.default_category
        } else {
            &article.category
        };

        writeln!(items, "    <item>")?;
        writeln!(items, "      <title>{}</title>", cdata(&article.title))?;
        writeln!(items, "      <link>{}</link>", escape(&link))?;
        writeln!(items, "      <guid isPermaLink=\"true\">{}</guid>", escape(&link))?;
        writeln!(items, "      <description>{}</description>", cdata(&article.excerpt))?;
        if let Some(date) = article.published() {
            writeln!(items, "      <pubDate>{}</pubDate>", http_date(date))?;
        }
        writeln!(items, "      <category>{}</category>", escape(category))?;
        writeln!(items, "    </item>")?;
    }

    let rss = formatdoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:content="http://purl.org/rss/1.0/modules/content/">
          <channel>
            <title>{title}</title>
            <link>{site}</link>
            <description>{description}</description>
            <language>en-US</language>
            <lastBuildDate>{build_date}</lastBuildDate>
            <atom:link href="{self_link}" rel="self" type="application/rss+xml"/>
            <image>
              <url>{icon}</url>
              <title>{title}</title>
              <link>{site}</link>
            </image>
        {items}  </channel>
        </rss>
        "#,
        title = escape(&config.site_title),
        site = escape(site),
        description = escape(&config.site_description),
        build_date = http_date(build_date),
        self_link = escape(&config.page_url(FEED_FILE)?),
        icon = escape(&config.page_url("icon")?),
        items = items,
    };

    Ok(rss)
}

/// Write the feed of all articles to the output directory.
pub fn write_feed(config: &Config) -> anyhow::Result<()> {
    let articles = articles::all_articles(&config.articles_dir)?;
    let rss = render(config, &articles, Utc::now())?;

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Cannot create directory {:?}", &config.output_dir))?;
    let path = config.output_dir.join(FEED_FILE);
    fs::write(&path, rss).with_context(|| format!("Cannot write to {:?}", &path))?;

    println!("Wrote feed with {} articles to {:?}", articles.len(), path);
    Ok(())
}

/// Date in the format of HTTP headers and RSS, e.g. "Mon, 15 Jan 2024 00:00:00 GMT"
fn http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use testresult::TestResult;

    fn article(slug: &str, date: &str, category: &str) -> ArticleMetadata {
        ArticleMetadata {
            slug: slug.to_string(),
            title: format!("About {}", slug),
            date: date.to_string(),
            reading_time: "1 min read".to_string(),
            excerpt: "Tips & tricks ]]> more".to_string(),
            template: Default::default(),
            category: category.to_string(),
            keywords: None,
            faq: None,
        }
    }

    #[test]
    fn test_render_feed() -> TestResult {
        let config: Config = serde_yaml::from_str(indoc::indoc! {"
            site_url: https://example.com/
            site_title: Example & co
            site_description: Thoughts
        "})?;

        let articles = vec![
            article("second", "2024-02-01", "Ethics"),
            article("first", "not a date", ""),
        ];
        let build_date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let rss = render(&config, &articles, build_date)?;

        insta::assert_snapshot!(rss.trim_end(), @r###"
        <?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:content="http://purl.org/rss/1.0/modules/content/">
          <channel>
            <title>Example &amp; co</title>
            <link>https://example.com</link>
            <description>Thoughts</description>
            <language>en-US</language>
            <lastBuildDate>Fri, 01 Mar 2024 12:30:00 GMT</lastBuildDate>
            <atom:link href="https://example.com/feed.xml" rel="self" type="application/rss+xml"/>
            <image>
              <url>https://example.com/icon</url>
              <title>Example &amp; co</title>
              <link>https://example.com</link>
            </image>
            <item>
              <title><![CDATA[About second]]></title>
              <link>https://example.com/articles/second</link>
              <guid isPermaLink="true">https://example.com/articles/second</guid>
              <description><![CDATA[Tips & tricks ]]]]><![CDATA[> more]]></description>
              <pubDate>Thu, 01 Feb 2024 00:00:00 GMT</pubDate>
              <category>Ethics</category>
            </item>
            <item>
              <title><![CDATA[About first]]></title>
              <link>https://example.com/articles/first</link>
              <guid isPermaLink="true">https://example.com/articles/first</guid>
              <description><![CDATA[Tips & tricks ]]]]><![CDATA[> more]]></description>
              <category>AI</category>
            </item>
          </channel>
        </rss>
        "###);

        Ok(())
    }

    #[test]
    fn test_escape() {
        assert_eq!("a &lt;b&gt; &amp; &quot;c&quot; &apos;d&apos;", escape("a <b> & \"c\" 'd'"));
    }
}
