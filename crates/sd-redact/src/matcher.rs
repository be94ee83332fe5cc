//! Pattern compilation and matcher construction.
//!
//! Plain strings are escaped and compiled as literal, case-insensitive
//! patterns; already compiled regexes pass through untouched. Compiled
//! patterns are kept in a process-wide LRU keyed by source and flags, so
//! repeated compilation of the same input is a cache hit.

use crate::detect::{CREDIT_CARD, EMAIL, IPV4, IPV6, JWT};
use crate::error::{RedactionError, Result};
use crate::value::Value;
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::warn;

const COMPILE_CACHE_CAPACITY: usize = 256;
const VERDICT_CACHE_CAPACITY: usize = 1024;
/// Longer inputs are matched but never memoized.
const VERDICT_CACHE_MAX_INPUT: usize = 256;

/// Input accepted by [`compile_patterns`] and [`create_matcher`].
#[derive(Debug, Clone)]
pub enum PatternSource {
    /// Literal text, matched as a substring after escaping.
    Text(String),
    /// A regex used as-is.
    Compiled(Regex),
}

impl From<&str> for PatternSource {
    fn from(s: &str) -> Self {
        PatternSource::Text(s.to_string())
    }
}

impl From<String> for PatternSource {
    fn from(s: String) -> Self {
        PatternSource::Text(s)
    }
}

impl From<Regex> for PatternSource {
    fn from(re: Regex) -> Self {
        PatternSource::Compiled(re)
    }
}

impl From<&Regex> for PatternSource {
    fn from(re: &Regex) -> Self {
        PatternSource::Compiled(re.clone())
    }
}

/// Flags applied when compiling text patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompileFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
}

impl CompileFlags {
    /// Flags for exact-case matching.
    pub fn case_sensitive() -> Self {
        Self {
            case_insensitive: false,
            multi_line: false,
        }
    }
}

impl Default for CompileFlags {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            multi_line: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: String,
    flags: CompileFlags,
    literal: bool,
}

static COMPILE_CACHE: Lazy<Mutex<LruCache<CacheKey, Regex>>> = Lazy::new(|| {
    Mutex::new(LruCache::new(
        NonZeroUsize::new(COMPILE_CACHE_CAPACITY).unwrap(),
    ))
});

fn build(source: &str, flags: CompileFlags) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(source)
        .case_insensitive(flags.case_insensitive)
        .multi_line(flags.multi_line)
        .build()
}

fn compile_cached(key: CacheKey) -> std::result::Result<Regex, regex::Error> {
    if let Some(hit) = COMPILE_CACHE.lock().get(&key) {
        return Ok(hit.clone());
    }
    let pattern = if key.literal {
        build(&regex::escape(&key.source), key.flags)?
    } else {
        build(&key.source, key.flags)?
    };
    COMPILE_CACHE.lock().put(key, pattern.clone());
    Ok(pattern)
}

fn compile_source(source: &PatternSource, flags: CompileFlags, cache: bool) -> Option<Regex> {
    let text = match source {
        PatternSource::Compiled(re) => return Some(re.clone()),
        PatternSource::Text(text) => text,
    };

    let compiled = if cache {
        compile_cached(CacheKey {
            source: text.clone(),
            flags,
            literal: true,
        })
    } else {
        build(&regex::escape(text), flags)
    };

    match compiled {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern_len = text.len(), error = %e, "Skipping pattern that failed to compile");
            None
        }
    }
}

/// Compile a list of pattern sources.
///
/// Text is escaped (so it matches literally) and compiled with `flags`.
/// Sources that cannot be compiled are logged and skipped.
pub fn compile_patterns(sources: &[PatternSource], flags: CompileFlags) -> Vec<Regex> {
    sources
        .iter()
        .filter_map(|source| compile_source(source, flags, true))
        .collect()
}

/// Compile a regular-expression source (not escaped), through the cache.
pub fn compile_regex(source: &str, flags: CompileFlags) -> Result<Regex> {
    compile_cached(CacheKey {
        source: source.to_string(),
        flags,
        literal: false,
    })
    .map_err(|e| RedactionError::pattern(source, &e))
}

/// Options for [`create_matcher`].
#[derive(Debug, Clone, Copy)]
pub struct MatcherOptions {
    /// Require every pattern to match instead of any.
    pub match_all: bool,
    /// Use the compile cache and memoize recent verdicts.
    pub cache: bool,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            match_all: false,
            cache: true,
        }
    }
}

/// Reusable predicate over strings built from a list of patterns.
#[derive(Clone)]
pub struct Matcher {
    patterns: Vec<Regex>,
    match_all: bool,
    verdicts: Option<Arc<Mutex<LruCache<String, bool>>>>,
}

impl Matcher {
    /// Test a string. A matcher without patterns matches nothing.
    pub fn is_match(&self, value: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let memo = self
            .verdicts
            .as_ref()
            .filter(|_| value.len() <= VERDICT_CACHE_MAX_INPUT);
        if let Some(verdicts) = memo {
            if let Some(hit) = verdicts.lock().get(value) {
                return *hit;
            }
        }

        let verdict = if self.match_all {
            self.patterns.iter().all(|re| re.is_match(value))
        } else {
            self.patterns.iter().any(|re| re.is_match(value))
        };

        if let Some(verdicts) = memo {
            verdicts.lock().put(value.to_string(), verdict);
        }
        verdict
    }

    /// Test a value. Non-strings never match.
    pub fn matches(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| self.is_match(s))
    }

    /// The compiled patterns behind this matcher.
    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("patterns", &self.patterns.len())
            .field("match_all", &self.match_all)
            .field("cached", &self.verdicts.is_some())
            .finish()
    }
}

/// Build a matcher that is true when any (or, with `match_all`, every)
/// pattern matches.
pub fn create_matcher(sources: &[PatternSource], options: MatcherOptions) -> Matcher {
    let flags = CompileFlags::default();
    let patterns = sources
        .iter()
        .filter_map(|source| compile_source(source, flags, options.cache))
        .collect();

    let verdicts = options.cache.then(|| {
        Arc::new(Mutex::new(LruCache::new(
            NonZeroUsize::new(VERDICT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        )))
    });

    Matcher {
        patterns,
        match_all: options.match_all,
        verdicts,
    }
}

static CREDIT_CARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(CREDIT_CARD).unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(EMAIL).unwrap());
static IPV4_RE: Lazy<Regex> = Lazy::new(|| Regex::new(IPV4).unwrap());
static IPV6_RE: Lazy<Regex> = Lazy::new(|| Regex::new(IPV6).unwrap());
static JWT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(JWT).unwrap());

/// Factories for common sensitive-content patterns.
pub struct PatternBuilder;

impl PatternBuilder {
    pub fn credit_card() -> Regex {
        CREDIT_CARD_RE.clone()
    }

    pub fn email() -> Regex {
        EMAIL_RE.clone()
    }

    pub fn ipv4() -> Regex {
        IPV4_RE.clone()
    }

    pub fn ipv6() -> Regex {
        IPV6_RE.clone()
    }

    pub fn jwt() -> Regex {
        JWT_RE.clone()
    }

    /// Key with a fixed prefix followed by at least `min_length` token
    /// characters, e.g. `api_key("sk_live_", 24)`.
    pub fn api_key(prefix: &str, min_length: usize) -> Result<Regex> {
        let source = format!(r"{}[A-Za-z0-9_\-]{{{},}}", regex::escape(prefix), min_length);
        compile_regex(&source, CompileFlags::case_sensitive())
    }

    /// Arbitrary regex source with explicit flags.
    pub fn custom(source: &str, flags: CompileFlags) -> Result<Regex> {
        compile_regex(source, flags)
    }
}
