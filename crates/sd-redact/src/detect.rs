//! Sensitive field-name and content detection.
//!
//! Field names are classified against an exact-name table and a set of
//! case-insensitive patterns. String content is classified against
//! credential, identifier and key formats, plus a binary-data heuristic.
//! Nothing in this module fails: input that cannot be classified is reported
//! as not sensitive.

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default share of control characters above which a string is binary.
pub const DEFAULT_BINARY_THRESHOLD: f64 = 0.3;

/// Field names that are always sensitive (compared lower-cased).
pub const SENSITIVE_FIELD_NAMES: &[&str] = &[
    "password",
    "passwd",
    "pwd",
    "pass",
    "passphrase",
    "secret",
    "secret_key",
    "secretkey",
    "client_secret",
    "clientsecret",
    "token",
    "access_token",
    "accesstoken",
    "refresh_token",
    "refreshtoken",
    "id_token",
    "auth_token",
    "authtoken",
    "api_key",
    "apikey",
    "api-key",
    "x-api-key",
    "api_secret",
    "private_key",
    "privatekey",
    "auth",
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "session_id",
    "sessionid",
    "credentials",
    "credential",
    "ssn",
    "social_security_number",
    "credit_card",
    "creditcard",
    "card_number",
    "cardnumber",
    "cvv",
    "cvc",
    "pin",
    "otp",
    "iban",
    "account_number",
    "routing_number",
    "jwt",
    "bearer",
];

static FIELD_NAME_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| SENSITIVE_FIELD_NAMES.iter().copied().collect());

// Field-name patterns, all case-insensitive
static FIELD_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)pass(word|wd|phrase)",
        r"(?i)secret",
        r"(?i)token$",
        r"(?i)^token[_-]?(value|id)?$",
        r"(?i)(access|refresh|auth|id|csrf|xsrf|session|bearer)[_-]?token",
        r"(?i)api[_-]?(key|secret)",
        r"(?i)private[_-]?key",
        r"(?i)auth[_-]?(key|header|code)",
        r"(?i)^authori[sz]ation$",
        r"(?i)credential",
        r"(?i)(credit|debit)[_-]?card",
        r"(?i)card[_-]?(number|num|no)$",
        r"(?i)^cv[cv]2?$",
        r"(?i)(^|[_-])ssn$",
        r"(?i)social[_-]?security",
        r"(?i)session[_-]?(id|key)$",
        r"(?i)cookie",
        r"(?i)(account|routing)[_-]?(number|num|no)$",
    ])
    .unwrap()
});

/// Kind of sensitive content found in a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// PEM private key header
    PrivateKey,
    /// JSON Web Token
    Jwt,
    /// AWS access key (AKIA...)
    AwsAccessKey,
    /// GitHub token (ghp_, gho_, ...)
    GitHubToken,
    /// GitLab personal access token
    GitLabToken,
    /// Slack token (xoxb-...)
    SlackToken,
    /// Stripe secret/publishable/restricted key
    StripeKey,
    /// Google API key (AIza...)
    GoogleApiKey,
    /// OpenAI/Anthropic API key
    AiApiKey,
    /// `Bearer <token>` credential
    BearerToken,
    /// Database URL with embedded credentials
    ConnectionString,
    /// Payment card number
    CreditCard,
    /// US social security number
    Ssn,
    /// Email address
    Email,
    /// IPv4 address
    Ipv4,
    /// IPv6 address
    Ipv6,
    /// Phone number
    Phone,
    /// Long base64 run
    Base64Blob,
    /// Long hexadecimal run
    HexBlob,
    /// Non-printable / binary data
    Binary,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContentKind::PrivateKey => "private_key",
            ContentKind::Jwt => "jwt",
            ContentKind::AwsAccessKey => "aws_access_key",
            ContentKind::GitHubToken => "github_token",
            ContentKind::GitLabToken => "gitlab_token",
            ContentKind::SlackToken => "slack_token",
            ContentKind::StripeKey => "stripe_key",
            ContentKind::GoogleApiKey => "google_api_key",
            ContentKind::AiApiKey => "ai_api_key",
            ContentKind::BearerToken => "bearer_token",
            ContentKind::ConnectionString => "connection_string",
            ContentKind::CreditCard => "credit_card",
            ContentKind::Ssn => "ssn",
            ContentKind::Email => "email",
            ContentKind::Ipv4 => "ipv4",
            ContentKind::Ipv6 => "ipv6",
            ContentKind::Phone => "phone",
            ContentKind::Base64Blob => "base64_blob",
            ContentKind::HexBlob => "hex_blob",
            ContentKind::Binary => "binary",
        };
        write!(f, "{}", s)
    }
}

/// Content pattern definition.
struct ContentPattern {
    kind: ContentKind,
    pattern: Regex,
}

pub(crate) const CREDIT_CARD: &str =
    r"\b(?:\d{4}[- ]?){3}\d{4}\b|\b3[47]\d{2}[- ]?\d{6}[- ]?\d{5}\b";
pub(crate) const EMAIL: &str = r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}";
pub(crate) const IPV4: &str =
    r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b";
pub(crate) const IPV6: &str = r"\b(?:[0-9A-Fa-f]{1,4}:){7}[0-9A-Fa-f]{1,4}\b|\b(?:[0-9A-Fa-f]{1,4}:){1,6}:(?:[0-9A-Fa-f]{1,4}:){0,5}[0-9A-Fa-f]{1,4}\b";
pub(crate) const JWT: &str = r"eyJ[A-Za-z0-9_-]+\.eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+";

// Checked in order; the first match decides the kind
static CONTENT_PATTERNS: Lazy<Vec<ContentPattern>> = Lazy::new(|| {
    let table: &[(ContentKind, &str)] = &[
        (ContentKind::PrivateKey, r"-----BEGIN[A-Z ]*PRIVATE KEY-----"),
        (ContentKind::Jwt, JWT),
        (ContentKind::AwsAccessKey, r"AKIA[0-9A-Z]{16}"),
        (ContentKind::GitHubToken, r"gh[pousr]_[A-Za-z0-9_]{36,}"),
        (ContentKind::GitLabToken, r"glpat-[A-Za-z0-9\-_]{20,}"),
        (ContentKind::SlackToken, r"xox[baprs]-[A-Za-z0-9\-]+"),
        (ContentKind::StripeKey, r"(?:sk|pk|rk)_(?:live|test)_[A-Za-z0-9]{16,}"),
        (ContentKind::GoogleApiKey, r"AIza[0-9A-Za-z_\-]{35}"),
        (ContentKind::AiApiKey, r"sk-(?:ant-)?[A-Za-z0-9_-]{20,}"),
        (ContentKind::BearerToken, r"(?i)\bbearer\s+[A-Za-z0-9._~+/\-]{8,}=*"),
        (
            ContentKind::ConnectionString,
            r"(?i)(postgres(?:ql)?|mysql|mongodb(?:\+srv)?|redis|amqp)://[^@\s]+@",
        ),
        (ContentKind::CreditCard, CREDIT_CARD),
        (ContentKind::Ssn, r"\b\d{3}-\d{2}-\d{4}\b"),
        (ContentKind::Email, EMAIL),
        (ContentKind::Ipv4, IPV4),
        (ContentKind::Ipv6, IPV6),
        (
            ContentKind::Phone,
            r"(?:\+\d{1,3}[-.\s]?)?\(?\b\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b",
        ),
        (ContentKind::HexBlob, r"\b[0-9A-Fa-f]{32,}\b"),
    ];
    table
        .iter()
        .map(|(kind, source)| ContentPattern {
            kind: *kind,
            pattern: Regex::new(source).unwrap(),
        })
        .collect()
});

static CONTENT_SET: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new(CONTENT_PATTERNS.iter().map(|p| p.pattern.as_str())).unwrap()
});

static BASE64_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9+/]{40,}={0,2}").unwrap());

/// Check whether a key name is sensitive.
///
/// Matching is case-insensitive. The exact-name table is consulted before
/// the pattern set.
pub fn is_sensitive_field_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let lower = name.to_lowercase();
    if FIELD_NAME_SET.contains(lower.as_str()) {
        return true;
    }
    FIELD_PATTERNS.is_match(name)
}

/// Check a key name against the default tables and any extra patterns.
pub fn is_sensitive_field_name_with(name: &str, extra: &[Regex]) -> bool {
    is_sensitive_field_name(name) || extra.iter().any(|re| re.is_match(name))
}

/// Check whether string content looks sensitive or binary.
pub fn contains_sensitive_content(value: &str) -> bool {
    detect_content(value).is_some()
}

/// Classify string content, returning the first matching kind.
pub fn detect_content(value: &str) -> Option<ContentKind> {
    if value.is_empty() {
        return None;
    }
    if is_binary_content(value, DEFAULT_BINARY_THRESHOLD) {
        return Some(ContentKind::Binary);
    }

    let hits = CONTENT_SET.matches(value);
    if let Some(index) = hits.iter().next() {
        return Some(CONTENT_PATTERNS[index].kind);
    }

    if BASE64_RUN
        .find_iter(value)
        .any(|m| looks_like_base64(m.as_str()))
    {
        return Some(ContentKind::Base64Blob);
    }

    None
}

/// Check whether a string is binary data.
///
/// True on any NUL, or when the share of control characters other than
/// `\n`, `\t` and `\r` exceeds `threshold`.
pub fn is_binary_content(value: &str, threshold: f64) -> bool {
    if value.is_empty() {
        return false;
    }
    if value.contains('\0') {
        return true;
    }

    let mut total = 0usize;
    let mut control = 0usize;
    for c in value.chars() {
        total += 1;
        if is_control(c) {
            control += 1;
        }
    }

    (control as f64 / total as f64) > threshold
}

fn is_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}')
}

/// Base64 runs must mix cases and digits, which rules out long lowercase
/// paths and words.
fn looks_like_base64(run: &str) -> bool {
    let upper = run.bytes().any(|b| b.is_ascii_uppercase());
    let lower = run.bytes().any(|b| b.is_ascii_lowercase());
    let digit = run.bytes().any(|b| b.is_ascii_digit());
    upper && lower && digit
}

/// A sensitive match inside a string, with byte offsets.
#[derive(Debug, Clone)]
pub struct ContentMatch {
    /// Kind of content matched.
    pub kind: ContentKind,
    /// Start position in the input.
    pub start: usize,
    /// End position in the input.
    pub end: usize,
    /// The matched text (should be redacted before display).
    matched: String,
}

impl ContentMatch {
    /// Get a redacted version of the match for logging.
    pub fn redacted_match(&self) -> String {
        let prefix: String = self.matched.chars().take(4).collect();
        if self.matched.chars().count() <= 8 {
            "[REDACTED]".to_string()
        } else {
            format!("{}...[REDACTED]", prefix)
        }
    }
}

/// Find every sensitive match in a string, sorted by position.
pub fn find_sensitive_content(value: &str) -> Vec<ContentMatch> {
    let mut matches = Vec::new();

    for pattern in CONTENT_PATTERNS.iter() {
        for m in pattern.pattern.find_iter(value) {
            matches.push(ContentMatch {
                kind: pattern.kind,
                start: m.start(),
                end: m.end(),
                matched: m.as_str().to_string(),
            });
        }
    }

    for m in BASE64_RUN.find_iter(value) {
        if looks_like_base64(m.as_str()) {
            matches.push(ContentMatch {
                kind: ContentKind::Base64Blob,
                start: m.start(),
                end: m.end(),
                matched: m.as_str().to_string(),
            });
        }
    }

    matches.sort_by_key(|m| m.start);
    matches
}
