//! Route pattern compilation.
//!
//! Glob paths and raw regular expressions are both turned into an anchored
//! pattern string for the router. The router evaluates patterns with a
//! regex dialect that has no lookahead and spells named groups differently,
//! so raw patterns are scanned for those constructs: named groups are
//! rewritten to plain capture groups and lookaheads are rejected.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::declaration::{Declaration, Matcher};
use crate::error::{BuildError, BuildResult};
use crate::flags::UnsupportedRegexPolicy;
use crate::function::EdgeFunction;

/// A construct in a raw pattern that the router cannot evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Regular expressions with lookaheads are not supported")]
    Lookahead,

    #[error("Unbalanced parenthesis at offset {offset}")]
    UnbalancedParenthesis { offset: usize },

    #[error("Unterminated character class")]
    UnterminatedClass,

    #[error("Unterminated group name at offset {offset}")]
    UnterminatedGroupName { offset: usize },

    #[error("Pattern ends with a trailing backslash")]
    TrailingEscape,

    #[error("Backreference to unknown group '{name}'")]
    UnknownGroupName { name: String },
}

/// A non-fatal problem found while compiling a function's routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestWarning {
    /// The function whose declaration produced the warning.
    pub function: String,
    /// The function's source path.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
}

impl std::fmt::Display for ManifestWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Compiles a glob path into an anchored pattern.
///
/// `*` matches within one path segment and a `**` segment matches any number
/// of segments. The result tolerates an optional trailing slash.
///
/// ```
/// use edgeroute_spec::pattern::glob_to_pattern;
///
/// assert_eq!(glob_to_pattern("/f1/*"), "^/f1/([^/]*)/?$");
/// ```
pub fn glob_to_pattern(glob: &str) -> String {
    let source = format!("^{}\\/?$", glob_body(glob));
    unescape_slashes(&source)
}

fn glob_body(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '/' | '$' | '^' | '+' | '.' | '(' | ')' | '=' | '!' | '|' | '?' | '[' | ']' | '{'
            | '}' | ',' => {
                out.push('\\');
                out.push(c);
            }
            '*' => {
                let prev = i.checked_sub(1).map(|p| chars[p]);
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
                let is_double = i > 0 && chars[i - 1] == '*';
                let next = chars.get(i + 1).copied();
                let whole_segment =
                    matches!(prev, None | Some('/')) && matches!(next, None | Some('/'));

                if is_double && whole_segment {
                    out.push_str("((?:[^/]*(?:\\/|$))*)");
                    // The segment matcher already consumes the separator.
                    i += 1;
                } else {
                    out.push_str("([^/]*)");
                }
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}

/// Rewrites a raw regular expression for the router's dialect.
///
/// Named groups become unnamed groups at the same position, named
/// backreferences become numbered ones, and the pattern is anchored with
/// `^`/`$` where missing. A pattern with a top-level `|` is wrapped whole as
/// `^(?:...)$`. Lookaheads and malformed patterns are rejected.
///
/// ```
/// use edgeroute_spec::pattern::translate_regex;
///
/// assert_eq!(translate_regex(r"^/(?<name>\w+)$").unwrap(), r"^/(\w+)$");
/// ```
pub fn translate_regex(source: &str) -> Result<String, PatternError> {
    // The first pass only collects group names so that backreferences may
    // point forward.
    let names = rewrite_groups(source, None)?.names;
    let rewritten = rewrite_groups(source, Some(&names))?;
    let body = rewritten.pattern;

    // Anchors do not distribute over a top-level alternation.
    if rewritten.alternation {
        return Ok(unescape_slashes(&format!("^(?:{})$", body)));
    }

    let mut anchored = String::with_capacity(body.len() + 2);
    if !body.starts_with('^') {
        anchored.push('^');
    }
    anchored.push_str(&body);
    if !ends_with_anchor(&body) {
        anchored.push('$');
    }

    Ok(unescape_slashes(&anchored))
}

fn ends_with_anchor(source: &str) -> bool {
    let trailing_backslashes = source
        .strip_suffix('$')
        .map(|rest| rest.chars().rev().take_while(|c| *c == '\\').count());
    matches!(trailing_backslashes, Some(count) if count % 2 == 0)
}

struct Rewritten {
    pattern: String,
    names: BTreeMap<String, usize>,
    /// Whether the pattern has a `|` outside every group.
    alternation: bool,
}

fn rewrite_groups(
    source: &str,
    names: Option<&BTreeMap<String, usize>>,
) -> Result<Rewritten, PatternError> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut found = BTreeMap::new();
    let mut open_groups = 0usize;
    let mut captures = 0usize;
    let mut in_class = false;
    let mut alternation = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' {
            let next = *chars.get(i + 1).ok_or(PatternError::TrailingEscape)?;
            if !in_class && next == 'k' && chars.get(i + 2) == Some(&'<') {
                let close = find_close(&chars, i + 3)?;
                let name: String = chars[i + 3..close].iter().collect();
                match names {
                    Some(names) => {
                        let index = names
                            .get(&name)
                            .ok_or(PatternError::UnknownGroupName { name: name.clone() })?;
                        out.push_str(&format!("\\{}", index));
                    }
                    None => out.push_str("\\k"),
                }
                i = close + 1;
                continue;
            }
            out.push(c);
            out.push(next);
            i += 2;
            continue;
        }

        if in_class {
            if c == ']' {
                in_class = false;
            }
            out.push(c);
            i += 1;
            continue;
        }

        match c {
            '[' => {
                in_class = true;
                out.push(c);
                i += 1;
            }
            '(' => {
                open_groups += 1;
                if chars.get(i + 1) != Some(&'?') {
                    captures += 1;
                    out.push(c);
                    i += 1;
                    continue;
                }

                let name_start = match (chars.get(i + 2), chars.get(i + 3)) {
                    (Some('='), _) | (Some('!'), _) => return Err(PatternError::Lookahead),
                    (Some('<'), Some('=')) | (Some('<'), Some('!')) => None,
                    (Some('<'), _) => Some(i + 3),
                    (Some('P'), Some('<')) => Some(i + 4),
                    _ => None,
                };

                match name_start {
                    Some(start) => {
                        let close = find_close(&chars, start)?;
                        captures += 1;
                        found.insert(chars[start..close].iter().collect(), captures);
                        out.push('(');
                        i = close + 1;
                    }
                    None => {
                        // Non-capturing groups, flags and lookbehinds pass through.
                        out.push_str("(?");
                        i += 2;
                    }
                }
            }
            ')' => {
                if open_groups == 0 {
                    return Err(PatternError::UnbalancedParenthesis { offset: i });
                }
                open_groups -= 1;
                out.push(c);
                i += 1;
            }
            '|' => {
                alternation |= open_groups == 0;
                out.push(c);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    if in_class {
        return Err(PatternError::UnterminatedClass);
    }
    if open_groups > 0 {
        return Err(PatternError::UnbalancedParenthesis {
            offset: chars.len(),
        });
    }

    Ok(Rewritten {
        pattern: out,
        names: found,
        alternation,
    })
}

fn find_close(chars: &[char], start: usize) -> Result<usize, PatternError> {
    chars[start..]
        .iter()
        .position(|c| *c == '>')
        .map(|offset| start + offset)
        .ok_or(PatternError::UnterminatedGroupName { offset: start })
}

/// Replaces escaped path separators (`\/`) with plain `/`.
///
/// Other escapes, including an escaped backslash before a slash, are left
/// untouched.
pub fn unescape_slashes(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('/') => out.push('/'),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Compiles declarations for one build, applying the unsupported-regex policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternCompiler {
    policy: UnsupportedRegexPolicy,
}

impl PatternCompiler {
    /// Creates a compiler with the given policy.
    pub fn new(policy: UnsupportedRegexPolicy) -> Self {
        Self { policy }
    }

    /// Compiles a declaration's main pattern.
    pub fn compile_declaration(
        &self,
        function: &EdgeFunction,
        declaration: &Declaration,
        warnings: &mut Vec<ManifestWarning>,
    ) -> BuildResult<String> {
        match &declaration.matcher {
            Matcher::Path { path } => Ok(glob_to_pattern(path)),
            Matcher::Pattern { pattern } => self.compile_regex(function, pattern, warnings),
        }
    }

    /// Compiles every exclusion of a declaration, paths first.
    pub fn compile_exclusions(
        &self,
        function: &EdgeFunction,
        declaration: &Declaration,
        warnings: &mut Vec<ManifestWarning>,
    ) -> BuildResult<Vec<String>> {
        let mut compiled: Vec<String> = declaration
            .excluded_paths()
            .iter()
            .map(|path| glob_to_pattern(path))
            .collect();

        for pattern in declaration.excluded_patterns() {
            compiled.push(self.compile_regex(function, pattern, warnings)?);
        }

        Ok(compiled)
    }

    /// Compiles a raw regular expression.
    ///
    /// When the pattern cannot be translated, the policy decides between a
    /// build error and a warning; with a warning the original source is
    /// returned unmodified.
    pub fn compile_regex(
        &self,
        function: &EdgeFunction,
        source: &str,
        warnings: &mut Vec<ManifestWarning>,
    ) -> BuildResult<String> {
        match translate_regex(source) {
            Ok(pattern) => Ok(pattern),
            Err(err) => match self.policy {
                UnsupportedRegexPolicy::Fail => Err(BuildError::UnsupportedRegex {
                    function: function.name.clone(),
                    path: function.path.clone(),
                    reason: err.to_string(),
                }),
                UnsupportedRegexPolicy::Warn => {
                    warnings.push(ManifestWarning {
                        function: function.name.clone(),
                        path: function.path.clone(),
                        message: format!(
                            "Function '{}' uses an unsupported regular expression and will not be invoked: {}",
                            function.name, err
                        ),
                    });
                    Ok(source.to_string())
                }
            },
        }
    }
}
