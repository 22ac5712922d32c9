use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use anyhow::{anyhow, bail};
use rayon::prelude::*;
use serde_yaml::{Mapping, Value};

use crate::articles::{self, Article};
use crate::config::Config;
use crate::frontmatter::add_frontmatter;
use crate::sanitize::sanitize;

/// Front matter fields copied to the Markdown exports, in this order.
pub const EXPORTED_FIELDS: [&str; 5] = ["title", "date", "excerpt", "template", "category"];

/// Output directory of the Markdown exports, relative to the site's output directory.
pub const MARKDOWN_DIR: &str = "articles";

//--------------------------------------------------------------------------------------------------
///
/// Export all articles (or only those in `only`, if not empty) as plain Markdown to
/// `<output_dir>/articles/<slug>.md`.
///
/// A failing article doesn't stop the others. An error is returned at the end if any article
/// failed.
///
pub fn publish_markdown(config: &Config, only: &[String]) -> anyhow::Result<()> {
    let mut slugs = articles::article_slugs(&config.articles_dir)?;
    if !only.is_empty() {
        for slug in only {
            if !slugs.contains(slug) {
                log::warn!("No article with slug '{}'", slug);
            }
        }
        slugs.retain(|slug| only.contains(slug));
    }

    let out_dir = config.output_dir.join(MARKDOWN_DIR);
    fs::create_dir_all(&out_dir).with_context(|| format!("Cannot create directory {:?}", &out_dir))?;

    println!("Generating markdown files for {} articles", slugs.len());

    let results = slugs
        .par_iter()
        .map(|slug| {
            let result = publish_article(&config.articles_dir, slug, &out_dir);
            (slug, result)
        })
        .collect::<Vec<_>>();

    let mut failed = 0;
    for (slug, result) in &results {
        match result {
            Ok(path) => println!("Wrote {:?}", path),
            Err(err) => {
                eprintln!("Error processing '{}': {:#}", slug, err);
                failed += 1;
            }
        }
    }

    println!("Summary: {} succeeded, {} failed", results.len() - failed, failed);

    if failed > 0 {
        bail!("{} article(s) could not be exported", failed);
    }
    Ok(())
}

/// Export a single article, returning the path of the Markdown file.
pub fn publish_article(articles_dir: &Path, slug: &str, out_dir: &Path) -> anyhow::Result<PathBuf> {
    let article = articles::load_article(articles_dir, slug)?
        .ok_or_else(|| anyhow!("Article '{}' not found", slug))?;

    let path = out_dir.join(slug).with_extension("md");
    fs::write(&path, article_markdown(&article))
        .with_context(|| format!("Cannot write to {:?}", &path))?;

    Ok(path)
}

/// Plain Markdown rendering of an article, with its front matter.
pub fn article_markdown(article: &Article) -> String {
    let mut fields = Mapping::new();
    for name in EXPORTED_FIELDS {
        if let Some(value) = article.front_matter.get(name) {
            fields.insert(Value::String(name.to_string()), value.clone());
        }
    }

    add_frontmatter(&sanitize(&article.content), &fields)
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;
    use testresult::TestResult;

    #[test]
    fn test_article_markdown() -> TestResult {
        let source = indoc! {r#"
            ---
            category: Tools
            title: Sandboxes
            draft: true
            date: "2024-04-02"
            ---
            import Sandbox from '@/components/InteractiveSandbox'

            Run this:

            <InteractiveSandbox>
            ```js
            console.log(1)
            ```
            </InteractiveSandbox>
        "#};

        let article = articles::parse_article("sandboxes", source)?;

        insta::assert_snapshot!(article_markdown(&article), @r###"
        ---
        title: "Sandboxes"
        date: "2024-04-02"
        category: "Tools"
        ---
        Run this:

        ```js
        // Interactive sandbox example
        console.log(1)
        ```
        "###);

        Ok(())
    }
}
