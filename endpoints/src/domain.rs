
use std::{fmt, str::FromStr};

use crate::error::RuleError;

/// Compiled domain pattern.
///
/// Patterns are matched against fully qualified, lower-case domains ending
/// in a dot. `*` matches any run of characters, dots included. A leading `.`
/// matches the zone itself and everything below it, and is the only place a
/// dot is not a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainPattern {
    pattern: String,
    kind: Kind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    /// `.example.com.`: exact zone or any subdomain.
    Zone,
    /// Anchored glob.
    Glob,
}

impl DomainPattern {
    pub fn matches(&self, domain: &str) -> bool {
        match self.kind {
            Kind::Zone => domain == &self.pattern[1..] || domain.ends_with(&self.pattern),
            Kind::Glob => glob_match(self.pattern.as_bytes(), domain.as_bytes()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl FromStr for DomainPattern {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pattern = s.to_ascii_lowercase();
        validate(&pattern)?;

        // trailing dot is implied
        if !pattern.ends_with('.') && !pattern.ends_with('*') {
            pattern.push('.');
        }
        let kind = if pattern.starts_with('.') {
            Kind::Zone
        } else {
            Kind::Glob
        };
        Ok(Self { pattern, kind })
    }
}

impl fmt::Display for DomainPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn validate(pattern: &str) -> Result<(), RuleError> {
    if pattern.is_empty() || pattern == "." {
        return Err(RuleError::EmptyPattern);
    }
    if let Some(found) = pattern
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '*')))
    {
        return Err(RuleError::InvalidCharacter {
            pattern: pattern.to_string(),
            found,
        });
    }
    if pattern.contains("..") {
        return Err(RuleError::EmptyLabel(pattern.to_string()));
    }
    if pattern.starts_with('.') && pattern.ends_with('*') {
        return Err(RuleError::AnchoredWildcard(pattern.to_string()));
    }
    Ok(())
}

// Backtracks only to the last star seen, which is enough for `*` globs.
fn glob_match(pattern: &[u8], target: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < target.len() {
        match pattern.get(p) {
            Some(b'*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == target[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == b'*')
}

/// Lower-cases `domain` and makes it fully qualified.
pub(crate) fn normalize(domain: &str) -> String {
    let mut domain = domain.trim().to_ascii_lowercase();
    if !domain.ends_with('.') {
        domain.push('.');
    }
    domain
}

/// The domain and its parents, stopping before the top level domain.
///
/// `a.b.example.com.` yields itself, `b.example.com.` and `example.com.`.
pub(crate) fn with_parents(domain: &str) -> impl Iterator<Item = &str> + '_ {
    let parents = domain.trim_end_matches('.').matches('.').count();
    std::iter::once(domain).chain(
        domain
            .match_indices('.')
            .take(parents.saturating_sub(1))
            .map(move |(idx, _)| &domain[idx + 1..]),
    )
}
