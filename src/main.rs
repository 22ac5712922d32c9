use anyhow::Context;
use mdx2md::config::Commands::*;
use mdx2md::config::*;
use mdx2md::theme::{FileStorage, LocalClock, StyleVars, ThemeManager, ThemeName};
use mdx2md::*;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = RootCommand::read();
    let config = Config::read(&args.config)?;

    // Each article is converted independently, sanitizing is pure CPU work.
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.concurrency.unwrap_or(8))
        .build()?
        .install(|| main0(args, config))
}

fn main0(args: RootCommand, config: Config) -> anyhow::Result<()> {
    match args.command {
        Markdown { only } => {
            publish::publish_markdown(&config, &only)?;
        }

        Feed => feed::write_feed(&config)?,

        Sitemap => sitemap::write_sitemap(&config)?,

        Seo => seo::write_seo(&config)?,

        Build => {
            publish::publish_markdown(&config, &[])?;
            feed::write_feed(&config)?;
            sitemap::write_sitemap(&config)?;
            seo::write_seo(&config)?;
        }

        Sanitize { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Cannot read {:?}", &file))?;
            let (_, body) = frontmatter::split_frontmatter(&source);
            println!("{}", sanitize(body));
        }

        Theme { command } => {
            let storage = FileStorage::new(&config.theme_store);
            let mut manager = ThemeManager::initialize(storage, StyleVars::default(), &LocalClock);

            match command {
                ThemeCommand::List => {
                    for name in ThemeName::ALL {
                        let marker = if name == manager.current() { "*" } else { " " };
                        println!("{} {:<8} {}", marker, name, name.theme().name);
                    }
                }
                ThemeCommand::Show => {
                    println!("{} ({})", manager.current(), manager.theme().name);
                }
                ThemeCommand::Set { name } => {
                    manager.set_theme(name);
                    println!("Selected theme {} ({})", name, name.theme().name);
                }
                ThemeCommand::Css => {
                    print!("{}", manager.surface().to_css());
                }
            }
        }
    }

    Ok(())
}
