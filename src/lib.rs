#[macro_use]
extern crate serde_derive;

pub mod config;
pub mod scan;
pub mod tabs;
pub mod sanitize;
pub mod frontmatter;
pub mod articles;
pub mod publish;
pub mod feed;
pub mod sitemap;
pub mod seo;
pub mod theme;

pub use frontmatter::add_frontmatter;
pub use sanitize::sanitize;
