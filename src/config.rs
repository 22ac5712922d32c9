use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use url::Url;

//----- Command line parameters

/// From MDX articles to plain Markdown, feeds and themes
#[derive(Parser, Debug)]
pub struct RootCommand {
    /// Path to the config file
    #[clap(global = true, long, default_value = "mdx2md.yml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

impl RootCommand {
    // Avoids importing Parser in main
    pub fn read() -> RootCommand {
        RootCommand::parse()
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate plain Markdown exports of all articles
    Markdown {
        /// Only export these slugs
        #[clap(long)]
        only: Vec<String>,
    },

    /// Generate the RSS feed
    Feed,

    /// Generate the sitemap
    Sitemap,

    /// Generate the SEO metadata and structured data of all articles
    Seo,

    /// Generate Markdown exports, feed, sitemap and SEO metadata
    Build,

    /// Print the sanitized body of a single MDX file
    Sanitize {
        file: PathBuf,
    },

    /// Inspect or change the selected theme
    Theme {
        #[clap(subcommand)]
        command: ThemeCommand,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ThemeCommand {
    /// List the built-in themes
    List,
    /// Show the theme that is currently in effect
    Show,
    /// Select a theme and persist the choice
    Set {
        name: crate::theme::ThemeName,
    },
    /// Print the style variables of the current theme as CSS
    Css,
}

//----- Config file

#[derive(Deserialize, Debug)]
pub struct Config {
    pub site_url: String,
    #[serde(default = "default_site_title")]
    pub site_title: String,
    #[serde(default)]
    pub site_description: String,
    #[serde(default = "default_articles_dir")]
    pub articles_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_theme_store")]
    pub theme_store: PathBuf,
    #[serde(default = "default_category")]
    pub default_category: String,
    /// Author of the articles, defaults to the site title
    pub author: Option<String>,
    /// Twitter/X handle, e.g. `@someone`
    pub twitter_handle: Option<String>,
    pub concurrency: Option<usize>,
}

fn default_site_title() -> String {
    "Articles".into()
}

fn default_articles_dir() -> PathBuf {
    "content/articles".into()
}

fn default_output_dir() -> PathBuf {
    "public".into()
}

fn default_theme_store() -> PathBuf {
    ".mdx2md/storage.json".into()
}

fn default_category() -> String {
    "AI".into()
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config = serde_yaml::from_reader(file).with_context(|| format!("Failed to read {:?}", path))?;
        Ok(config)
    }

    pub fn author_name(&self) -> &str {
        self.author.as_deref().unwrap_or(&self.site_title)
    }

    /// Site URL without a trailing slash, so that paths can be appended.
    pub fn base_url(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    /// Absolute URL of a page of the site, given its path relative to the site root.
    pub fn page_url(&self, path: &str) -> anyhow::Result<String> {
        let base = Url::parse(&format!("{}/", self.base_url()))
            .with_context(|| format!("Invalid site url {:?}", self.site_url))?;
        let url = base.join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid page path {:?}", path))?;
        Ok(url.to_string())
    }
}
