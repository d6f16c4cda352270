use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use std::ops::Range;

/// A credential-shaped token found in scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedLeak {
    /// Human-readable label for the kind of secret found.
    pub kind: &'static str,
    /// The matched fragment (truncated for display safety).
    pub matched: String,
    /// The encoding in which the secret was found.
    pub encoding: LeakEncoding,
    /// Byte range of the offending run in the scanned text.
    pub span: Range<usize>,
}

/// Encoding in which a secret pattern was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakEncoding {
    Plain,
    UrlEncoded,
    Base64,
    Hex,
}

/// Known prefix patterns and their human-readable labels.
const SECRET_PREFIXES: &[(&str, &str)] = &[
    ("sk-", "OpenAI/Stripe API key"),
    ("ghp_", "GitHub personal access token"),
    ("github_pat_", "GitHub fine-grained PAT"),
    ("gho_", "GitHub OAuth token"),
    ("ghs_", "GitHub server-to-server token"),
    ("AKIA", "AWS access key"),
    ("ASIA", "AWS temporary access key"),
    ("xoxb-", "Slack bot token"),
    ("xoxp-", "Slack user token"),
    ("xapp-", "Slack app-level token"),
    ("hf_", "Hugging Face token"),
    ("glpat-", "GitLab personal access token"),
    ("AGE-SECRET-KEY-", "age encryption key"),
    ("GOCSPX-", "Google OAuth client secret"),
    ("AIza", "Google API key"),
    ("ya29.", "Google OAuth access token"),
    ("eyJ", "JWT token"),
];

/// Minimum length of the token portion (after prefix) to consider it a match.
const MIN_TOKEN_TAIL: usize = 8;

/// Scan `text` for leaked credentials across plain, URL, base64 and hex encodings.
pub fn scan_for_leaks(text: &str) -> Vec<DetectedLeak> {
    let mut leaks = Vec::new();

    scan_plain(text, &mut leaks);
    scan_url_encoded(text, &mut leaks);
    scan_encoded_runs(text, &mut leaks);

    leaks
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn token_len_at(text: &str, start: usize) -> usize {
    let rest = &text[start..];
    rest.find(|c: char| !is_token_char(c)).unwrap_or(rest.len())
}

/// Every qualifying `(prefix, kind, token_start, token_len)` in `text`.
fn prefixed_tokens(text: &str) -> Vec<(&'static str, usize, usize)> {
    let mut found = Vec::new();
    for &(prefix, kind) in SECRET_PREFIXES {
        let mut search_from = 0;
        while let Some(pos) = text[search_from..].find(prefix) {
            let abs_pos = search_from + pos;
            let len = token_len_at(text, abs_pos);
            if len.saturating_sub(prefix.len()) >= MIN_TOKEN_TAIL {
                found.push((kind, abs_pos, len));
            }
            search_from = abs_pos + prefix.len();
        }
    }
    found
}

fn scan_plain(text: &str, leaks: &mut Vec<DetectedLeak>) {
    for (kind, start, len) in prefixed_tokens(text) {
        leaks.push(DetectedLeak {
            kind,
            matched: truncate_match(&text[start..start + len]),
            encoding: LeakEncoding::Plain,
            span: start..start + len,
        });
    }
}

fn scan_url_encoded(text: &str, leaks: &mut Vec<DetectedLeak>) {
    for run in runs(text, |c| is_token_char(c) || c == '%', 1) {
        let raw = &text[run.clone()];
        if !raw.contains('%') {
            continue;
        }
        let decoded = url_decode(raw);
        if let Some((kind, start, len)) = prefixed_tokens(&decoded).into_iter().next() {
            leaks.push(DetectedLeak {
                kind,
                matched: truncate_match(&decoded[start..start + len]),
                encoding: LeakEncoding::UrlEncoded,
                span: run,
            });
        }
    }
}

fn scan_encoded_runs(text: &str, leaks: &mut Vec<DetectedLeak>) {
    let base64_runs = runs(
        text,
        |c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='),
        16,
    );
    for run in base64_runs {
        let Ok(bytes) = BASE64_STANDARD.decode(&text[run.clone()]) else {
            continue;
        };
        push_decoded(&bytes, run, LeakEncoding::Base64, leaks);
    }

    for run in runs(text, |c| c.is_ascii_hexdigit(), 32) {
        if !run.len().is_multiple_of(2) {
            continue;
        }
        let Ok(bytes) = hex::decode(&text[run.clone()]) else {
            continue;
        };
        push_decoded(&bytes, run, LeakEncoding::Hex, leaks);
    }
}

fn push_decoded(
    bytes: &[u8],
    span: Range<usize>,
    encoding: LeakEncoding,
    leaks: &mut Vec<DetectedLeak>,
) {
    let Ok(decoded) = std::str::from_utf8(bytes) else {
        return;
    };
    if let Some((kind, start, len)) = prefixed_tokens(decoded).into_iter().next() {
        leaks.push(DetectedLeak {
            kind,
            matched: truncate_match(&decoded[start..start + len]),
            encoding,
            span,
        });
    }
}

/// Contiguous runs of `accept` characters with byte length >= `min_len`.
fn runs(text: &str, accept: impl Fn(char) -> bool, min_len: usize) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        if accept(c) {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take()
            && i - s >= min_len
        {
            out.push(s..i);
        }
    }
    if let Some(s) = start
        && text.len() - s >= min_len
    {
        out.push(s..text.len());
    }

    out
}

/// Simple percent-decode (handles `%XX` sequences).
fn url_decode(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            match u8::from_str_radix(&hex, 16) {
                Ok(byte) if hex.len() == 2 => result.push(byte as char),
                _ => {
                    result.push('%');
                    result.push_str(&hex);
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Truncate a matched token for safe display (first 12 chars + "...").
fn truncate_match(token: &str) -> String {
    if token.len() <= 16 {
        token.to_string()
    } else {
        let cut = token
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= 12)
            .last()
            .unwrap_or(0);
        format!("{}...", &token[..cut])
    }
}
