//! MDX to plain Markdown conversion, for text-only consumers like feed readers and LLMs.
//!
//! Conversion is best-effort and never fails: components that can't be understood are reduced
//! to their text content. Fenced code blocks and inline code spans are copied as they are.
//!
//! Known limitation: the tokenizer doesn't understand the full MDX grammar (JSX expressions in
//! text, nested template strings in attributes, etc.), so unusual input may produce imperfect
//! output.

use std::fmt::Write;
use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use crate::scan::{self, TagKind, Token, TokenKind};
use crate::tabs;

/// Interactive code runner. Its children contain a fenced code block.
pub const INTERACTIVE_SANDBOX: &str = "InteractiveSandbox";

/// Tabbed code samples, described by a `tabs={[...]}` attribute.
pub const SANDBOX_TABS: &str = "SandboxTabs";

/// Language used for code blocks that don't specify one.
pub const DEFAULT_LANGUAGE: &str = "javascript";

lazy_static! {
    static ref IMPORT_RE: Regex = Regex::new(r#"^import\s+.*?from\s+['"].*?['"];?\s*$"#).unwrap();
    static ref SIDE_EFFECT_IMPORT_RE: Regex = Regex::new(r#"^import\s+['"][^'"]+['"];?\s*$"#).unwrap();
    static ref IMPORT_START_RE: Regex = Regex::new(r"^import\s+(type\s+)?\{[^}]*$").unwrap();
    static ref IMPORT_END_RE: Regex = Regex::new(r#"\}\s*from\s+['"].*?['"];?\s*$"#).unwrap();
    static ref EXPORT_RE: Regex = Regex::new(r"^export\s+(default\s+)?").unwrap();
    static ref BLANK_LINES_RE: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Convert an MDX article body to plain Markdown.
pub fn sanitize(mdx: &str) -> String {
    let src = mdx.replace("\r\n", "\n");
    let tokens = scan::tokenize(&src);

    let mut markdown = String::with_capacity(src.len());
    reduce(&src, &tokens, &mut markdown);

    let markdown = BLANK_LINES_RE.replace_all(&markdown, "\n\n");
    markdown.trim().to_string()
}

fn reduce(src: &str, tokens: &[Token], out: &mut String) {
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        match &token.kind {
            TokenKind::Text => strip_module_lines(src, token.span.clone(), out),

            TokenKind::Fence(_) => out.push_str(&src[token.span.clone()]),

            TokenKind::Tag(tag) => match tag.kind {
                TagKind::Open => {
                    if let Some(close) = find_close(tokens, i) {
                        let inner = token.span.end..tokens[close].span.start;

                        if tag.name == INTERACTIVE_SANDBOX {
                            render_sandbox(src, tag.attrs, &tokens[i + 1..close], inner, out);
                            i = close + 1;
                            continue;
                        }

                        if tag.name == SANDBOX_TABS {
                            if let Some(rendered) = render_tabs(tag.attrs) {
                                out.push_str(&rendered);
                                i = close + 1;
                                continue;
                            }
                            // Fall through: the children are kept as regular content
                        }
                    }
                    // Other components: drop the tag, keep the content
                }

                TagKind::Close => {}

                TagKind::SelfClosing => {
                    let rendered = if tag.name == SANDBOX_TABS {
                        render_tabs(tag.attrs)
                    } else {
                        None
                    };
                    match rendered {
                        Some(tabs) => out.push_str(&tabs),
                        None => {
                            let _ = write!(out, "[{} component]", tag.name);
                        }
                    }
                }
            },
        }
        i += 1;
    }
}

/// Finds the index of the tag closing the opening tag at `open`, taking nested tags with the
/// same name into account.
fn find_close(tokens: &[Token], open: usize) -> Option<usize> {
    let name = match &tokens[open].kind {
        TokenKind::Tag(tag) => tag.name,
        _ => return None,
    };

    let mut depth = 0;
    for (i, token) in tokens.iter().enumerate().skip(open + 1) {
        if let TokenKind::Tag(tag) = &token.kind {
            if tag.name != name {
                continue;
            }
            match tag.kind {
                TagKind::Open => depth += 1,
                TagKind::Close if depth == 0 => return Some(i),
                TagKind::Close => depth -= 1,
                TagKind::SelfClosing => {}
            }
        }
    }
    None
}

//----- Interactive sandbox

fn render_sandbox(src: &str, attrs: &str, children: &[Token], inner: Range<usize>, out: &mut String) {
    let attr_lang = scan::attr_string(attrs, "language").or_else(|| scan::attr_string(attrs, "lang"));

    let fence = children.iter().find_map(|t| match &t.kind {
        TokenKind::Fence(fence) => Some((fence, t.span.start)),
        _ => None,
    });

    if let Some((fence, start)) = fence {
        let lang = Some(fence.lang())
            .filter(|l| !l.is_empty())
            .or(attr_lang)
            .unwrap_or(DEFAULT_LANGUAGE);

        let indent = src[start..].len() - src[start..].trim_start_matches(|c: char| c == ' ' || c == '\t').len();
        let mut code = dedent(fence.body, indent);
        if !code.is_empty() && !code.ends_with('\n') {
            code.push('\n');
        }

        let _ = write!(out, "```{}\n{} Interactive sandbox example\n{}```", lang, comment_prefix(lang), code);
    } else {
        let lang = attr_lang.unwrap_or(DEFAULT_LANGUAGE);
        let _ = write!(
            out,
            "```{}\n{} Interactive example\n{}\n```",
            lang,
            comment_prefix(lang),
            src[inner].trim()
        );
    }
}

/// Removes up to `indent` leading spaces or tabs from every line.
fn dedent(text: &str, indent: usize) -> String {
    if indent == 0 {
        return text.to_string();
    }
    text.split_inclusive('\n')
        .map(|line| {
            let strip = line
                .bytes()
                .take(indent)
                .take_while(|b| *b == b' ' || *b == b'\t')
                .count();
            &line[strip..]
        })
        .collect()
}

/// Line comment syntax for a code block language.
fn comment_prefix(lang: &str) -> &'static str {
    match lang.to_ascii_lowercase().as_str() {
        "python" | "py" | "ruby" | "rb" | "bash" | "sh" | "shell" | "zsh" | "console" | "yaml"
        | "yml" | "toml" | "r" | "perl" | "powershell" | "ps1" | "dockerfile" | "makefile"
        | "elixir" => "#",
        "sql" | "lua" | "haskell" | "hs" => "--",
        _ => "//",
    }
}

//----- Tabbed samples

fn render_tabs(attrs: &str) -> Option<String> {
    let expr = scan::attr_expression(attrs, "tabs")?;
    let tabs = match tabs::parse_tabs(expr) {
        Ok(tabs) => tabs,
        Err(err) => {
            log::debug!("Cannot parse {} tabs, keeping content: {}", SANDBOX_TABS, err);
            return None;
        }
    };

    let mut result = String::from("\n");
    for tab in &tabs {
        let _ = write!(result, "### {}\n\n", tab.heading());
        if let Some(code) = tab.code.as_deref().filter(|c| !c.is_empty()) {
            let lang = tab.language.as_deref().filter(|l| !l.is_empty()).unwrap_or(DEFAULT_LANGUAGE);
            let _ = write!(result, "```{}\n{}\n```\n\n", lang, code);
        }
    }
    Some(result)
}

//----- Import and export statements

/// Copies the `span` text to `out`, dropping import statements and `export` keywords.
///
/// Imports are only dropped when they fill a complete line of the source, so that a line that
/// also contains a tag is left untouched. `export` keywords are stripped from any text that
/// starts a line, whatever follows it (e.g. `export default <Layout>`).
fn strip_module_lines(src: &str, span: Range<usize>, out: &mut String) {
    let lines = line_ranges(src, span);

    let mut i = 0;
    while i < lines.len() {
        let SourceLine { range, starts_line, whole } = lines[i].clone();
        let line = &src[range];
        let content = line.strip_suffix('\n').unwrap_or(line);

        if whole {
            if IMPORT_RE.is_match(content) || SIDE_EFFECT_IMPORT_RE.is_match(content) {
                i += 1;
                continue;
            }

            if IMPORT_START_RE.is_match(content) {
                if let Some(end) = multiline_import_end(src, &lines, i) {
                    i = end + 1;
                    continue;
                }
            }
        }

        match EXPORT_RE.find(content) {
            Some(m) if starts_line => out.push_str(&line[m.end()..]),
            _ => out.push_str(line),
        }
        i += 1;
    }
}

/// Index of the last line of a multi-line import starting at `start`, e.g.
/// `import {\n  A,\n  B\n} from 'x'`.
fn multiline_import_end(src: &str, lines: &[SourceLine], start: usize) -> Option<usize> {
    let end = lines[start + 1..]
        .iter()
        .position(|l| src[l.range.clone()].contains('}'))
        .map(|p| start + 1 + p)?;

    let last = &lines[end];
    if last.whole && IMPORT_END_RE.is_match(src[last.range.clone()].trim_end_matches('\n')) {
        Some(end)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
struct SourceLine {
    /// Byte range, including the newline
    range: Range<usize>,
    /// Starts at the beginning of a source line
    starts_line: bool,
    /// Is a complete line of the source
    whole: bool,
}

/// Splits `span` into lines.
fn line_ranges(src: &str, span: Range<usize>) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    let mut pos = span.start;
    while pos < span.end {
        let end = src[pos..span.end]
            .find('\n')
            .map(|i| pos + i + 1)
            .unwrap_or(span.end);
        let content_end = if src[pos..end].ends_with('\n') { end - 1 } else { end };
        let starts_line = scan::is_line_start(src, pos);
        lines.push(SourceLine {
            range: pos..end,
            starts_line,
            whole: starts_line && scan::is_line_end(src, content_end),
        });
        pos = end;
    }
    lines
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_plain_markdown_is_untouched() {
        let md = "# Title\n\nSome *text* with <em>html</em>.\n\n- a\n- b";
        assert_eq!(md, sanitize(md));
    }

    #[test]
    fn test_blank_lines_collapsed() {
        assert_eq!("First\n\nSecond", sanitize("First\n\n\n\nSecond"));
        assert_eq!("First\n\nSecond", sanitize("\n\nFirst\n\n\nSecond\n\n"));
    }

    #[test]
    fn test_sandbox_with_fence() {
        let mdx = "<InteractiveSandbox lang=\"python\">\n```python\nprint(1+1)\n```\n</InteractiveSandbox>";
        assert_eq!(
            "```python\n# Interactive sandbox example\nprint(1+1)\n```",
            sanitize(mdx)
        );
    }

    #[test]
    fn test_sandbox_indented_fence() {
        let mdx = indoc! {"
            Try it:

            <InteractiveSandbox>
              ```js
              const x = 1;
              console.log(x > 0);
              ```
            </InteractiveSandbox>

            Done.
        "};

        insta::assert_snapshot!(sanitize(mdx), @r###"
        Try it:

        ```js
        // Interactive sandbox example
        const x = 1;
        console.log(x > 0);
        ```

        Done.
        "###);
    }

    #[test]
    fn test_sandbox_without_fence() {
        let mdx = "<InteractiveSandbox>\n  console.log('hi')\n</InteractiveSandbox>";
        assert_eq!(
            "```javascript\n// Interactive example\nconsole.log('hi')\n```",
            sanitize(mdx)
        );

        let mdx = "<InteractiveSandbox language=\"python\">print('hi')</InteractiveSandbox>";
        assert_eq!(
            "```python\n# Interactive example\nprint('hi')\n```",
            sanitize(mdx)
        );
    }

    #[test]
    fn test_fence_without_language_in_sandbox() {
        let mdx = "<InteractiveSandbox>\n```\nlet a = 1\n```\n</InteractiveSandbox>";
        assert_eq!(
            "```javascript\n// Interactive sandbox example\nlet a = 1\n```",
            sanitize(mdx)
        );
    }

    #[test]
    fn test_sandbox_tabs() {
        let mdx = indoc! {r#"
            <SandboxTabs tabs={[
              { label: "Python", language: "python", code: "print('a')" },
              { title: "Node", code: 'console.log("a")' },
              { code: "" },
            ]}>
            ignored
            </SandboxTabs>
        "#};

        insta::assert_snapshot!(sanitize(mdx), @r###"
        ### Python

        ```python
        print('a')
        ```

        ### Node

        ```javascript
        console.log("a")
        ```

        ### Example
        "###);
    }

    #[test]
    fn test_self_closing_sandbox_tabs() {
        let mdx = "<SandboxTabs tabs={[{ label: 'Sh', language: 'bash', code: 'ls' }]} />";
        assert_eq!("### Sh\n\n```bash\nls\n```", sanitize(mdx));
    }

    #[test]
    fn test_sandbox_tabs_fallback() {
        let mdx = "<SandboxTabs tabs={buildTabs()}>\nSee the *examples*.\n</SandboxTabs>";
        assert_eq!("See the *examples*.", sanitize(mdx));

        // Not evaluated
        let mdx = "<SandboxTabs tabs={[{ code: `${secret}` }]}>fallback</SandboxTabs>";
        assert_eq!("fallback", sanitize(mdx));
    }

    #[test]
    fn test_imports_removed() {
        let mdx = indoc! {r#"
            import { Chart } from '../components/Chart'
            import Sandbox from "@/components/Sandbox";
            import type { Props } from './types'
            import './styles.css'
            import {
              A,
              B,
            } from '@/components'

            # Title

            The word import at the start of a sentence stays.
            import this is not a statement
        "#};

        assert_eq!(
            "# Title\n\nThe word import at the start of a sentence stays.\nimport this is not a statement",
            sanitize(mdx)
        );
    }

    #[test]
    fn test_export_keywords_removed() {
        let mdx = "export const meta = { a: 1 }\nexport default function Layout() {}\nexported text";
        assert_eq!(
            "const meta = { a: 1 }\nfunction Layout() {}\nexported text",
            sanitize(mdx)
        );
    }

    #[test]
    fn test_export_keywords_removed_before_tags() {
        assert_eq!(
            "[Chart component]\n\nconst X = hi",
            sanitize("export default <Chart />\n\nexport const X = <Foo>hi</Foo>")
        );
        assert_eq!(
            "({children}) => {children}",
            sanitize("export default ({children}) => <Layout>{children}</Layout>")
        );
        // Not at the start of a line
        assert_eq!("export x", sanitize("<Note>export x</Note>"));
    }

    #[test]
    fn test_code_is_not_stripped() {
        let mdx = indoc! {"
            ```ts
            import { x } from 'y'
            export default <Foo />
            ```
        "};
        assert_eq!(mdx.trim(), sanitize(mdx));
    }

    #[test]
    fn test_unmatched_backtick() {
        let mdx = indoc! {"
            Press the ` key.

            <InteractiveSandbox>
            ```python
            print(1)
            ```
            </InteractiveSandbox>

            Then the ` key again.
        "};

        insta::assert_snapshot!(sanitize(mdx), @r###"
        Press the ` key.

        ```python
        # Interactive sandbox example
        print(1)
        ```

        Then the ` key again.
        "###);
    }

    #[test]
    fn test_self_closing_components() {
        assert_eq!(
            "Chart: [MermaidDiagram component] and [Logo component].",
            sanitize("Chart: <MermaidDiagram chart={`graph TD; A-->B`} /> and <Logo/>.")
        );
    }

    #[test]
    fn test_component_tags_removed() {
        let mdx = "<Callout type=\"info\">\n**Note**: keep this <Highlight>text</Highlight>.\n</Callout>";
        assert_eq!("**Note**: keep this text.", sanitize(mdx));
    }

    #[test]
    fn test_tag_on_import_line_keeps_line() {
        assert_eq!(
            "import x from 'y'",
            sanitize("<Note>import x from 'y'</Note>")
        );
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!("<Broken attr=\"x", sanitize("<Broken attr=\"x"));
        assert_eq!("text", sanitize("<InteractiveSandbox>text"));
        assert_eq!("a  b", sanitize("a </Unopened> b"));
        assert_eq!("```js\nunclosed", sanitize("```js\nunclosed"));
        assert_eq!("", sanitize(""));
        assert_eq!("< Spaced >", sanitize("< Spaced >"));
    }

    #[test]
    fn test_crlf() {
        assert_eq!("a\n\nb", sanitize("a\r\n\r\n\r\n\r\nb"));
    }

    #[test]
    fn test_idempotent() {
        let mdx = indoc! {r#"
            import X from 'x'

            <Intro>Hello</Intro>



            <InteractiveSandbox>
            ```python
            print(1)
            ```
            </InteractiveSandbox>

            <SandboxTabs tabs={[{ label: 'A', code: 'a()' }]} />
            <Chart />
        "#};

        let once = sanitize(mdx);
        assert_eq!(once, sanitize(&once));
    }

    /// Every concatenation of up to `len` fragments.
    fn combinations<'a>(fragments: &[&'a str], len: usize) -> Vec<String> {
        let mut result = vec![String::new()];
        let mut previous = vec![String::new()];
        for _ in 0..len {
            previous = previous
                .iter()
                .flat_map(|prefix| fragments.iter().map(move |f| format!("{}{}", prefix, f)))
                .collect();
            result.extend(previous.iter().cloned());
        }
        result
    }

    #[test]
    fn test_text_without_components_is_unchanged() {
        let fragments = [
            "plain", "\n", "\n\n\n", " ", "a < b", "<em>x</em>", "`code`", "``", "é ü", "{x}",
            "# Title", "```js\nlet a = 1;\n```\n", "~~~\n", "exported",
        ];

        for mdx in combinations(&fragments, 4) {
            let expected = BLANK_LINES_RE.replace_all(&mdx, "\n\n");
            assert_eq!(expected.trim(), sanitize(&mdx), "input: {:?}", mdx);
        }
    }

    #[test]
    fn test_any_input_is_converted() {
        let fragments = [
            "text", "\n", "\n\n", "<Note>", "</Note>", "<Chart />", "<InteractiveSandbox lang=\"py\">",
            "</InteractiveSandbox>", "<SandboxTabs tabs={[{ label: 'A', code: `x` }]}>", "</SandboxTabs>",
            "```python\n", "`", "{", "\"", "import x from 'y'", "export default ", "<Broken a=\"",
        ];

        for mdx in combinations(&fragments, 3) {
            let markdown = sanitize(&mdx);
            assert_eq!(markdown.trim(), markdown, "input: {:?}", mdx);
            assert!(!markdown.contains("\n\n\n"), "input: {:?}", mdx);
        }
    }
}
