//! Utility functions.

use std::path::Path;

use indexmap::IndexMap;
use tracing::info;

/// Wait for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Parse Java-style `key=value` properties.
///
/// Blank lines and lines starting with `#` or `!` are skipped; `:` is also
/// accepted as separator. A trailing backslash continues the entry on the next
/// line. Keys and values are unescaped (`\:`, `\=`, `\n`, `\t`, `\uXXXX`, ...).
/// Lines without a separator are ignored.
pub fn parse_properties(contents: &str) -> IndexMap<String, String> {
    let mut props = IndexMap::new();
    let mut lines = contents.lines();

    while let Some(line) = lines.next() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut entry = line.to_string();
        while continues(&entry) {
            entry.pop();
            match lines.next() {
                Some(next) => entry.push_str(next.trim_start()),
                None => break,
            }
        }

        if let Some((key, value)) = split_entry(&entry) {
            props.insert(unescape(key), unescape(value));
        }
    }
    props
}

/// Odd number of trailing backslashes.
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split at the first unescaped `=` or `:`.
fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in entry.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '=' | ':' => return Some((entry[..i].trim_end(), entry[i + 1..].trim_start())),
            _ => {}
        }
    }
    None
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => out.push_str(&hex),
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Read and parse a properties file.
pub async fn read_properties(path: impl AsRef<Path>) -> std::io::Result<IndexMap<String, String>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(parse_properties(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_git_properties() {
        let props = parse_properties(
            "#Generated by Git-Commit-Id-Plugin\n\
             git.branch=main\n\
             git.commit.id.abbrev = 1a2b3c4\n\
             git.commit.message.short: Fix health rollup\n\
             \n\
             git.commit.time=2024-05-01T10\\:00\\:00+0000\n",
        );

        assert_eq!(props["git.branch"], "main");
        assert_eq!(props["git.commit.id.abbrev"], "1a2b3c4");
        assert_eq!(props["git.commit.message.short"], "Fix health rollup");
        assert_eq!(props["git.commit.time"], "2024-05-01T10:00:00+0000");
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn escapes_are_decoded() {
        let props = parse_properties(
            "git.remote.origin.url=https\\://example.com/shop.git\n\
             git.commit.message.full=Fix rollup\\n\\nCloses \\u0023 12\n\
             path\\=with\\:separators=a\\\\b\n",
        );

        assert_eq!(props["git.remote.origin.url"], "https://example.com/shop.git");
        assert_eq!(props["git.commit.message.full"], "Fix rollup\n\nCloses # 12");
        assert_eq!(props["path=with:separators"], "a\\b");
    }

    #[test]
    fn continuation_lines_are_joined() {
        let props = parse_properties("git.commit.message.full=first \\\n    second\nnext=1\n");
        assert_eq!(props["git.commit.message.full"], "first second");
        assert_eq!(props["next"], "1");
    }

    #[test]
    fn lines_without_separator_are_skipped() {
        let props = parse_properties("just-a-key\nk=v\n");
        assert_eq!(props.len(), 1);
        assert_eq!(props["k"], "v");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        assert!(read_properties("/nonexistent/git.properties").await.is_err());
    }
}
