mod test;

use std::{fmt, str::FromStr};

use endpoints_common::EPResult;

use crate::{
    entity::Entity,
    error::RuleError,
    matcher::{MatchOutcome, Matcher},
    qualifier::Qualifier,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    /// `+`
    Permit,
    /// `-`
    Deny,
}

impl From<Sign> for EPResult {
    fn from(sign: Sign) -> Self {
        match sign {
            Sign::Permit => EPResult::Permitted,
            Sign::Deny => EPResult::Denied,
        }
    }
}

/// Compiled rule line such as `+ *.example.com UDP/53`.
///
/// A line is a sign, an endpoint and optionally a protocol and port
/// restriction, separated by whitespace:
///
/// ```text
/// + .example.com
/// - 10.0.0.0/8 TCP 22
/// + AS15169 */443
/// - L:TRAC,MAL
/// + Localhost,LAN
/// ```
///
/// # Example
/// ```
/// # use endpoints::{Entity, Rule, Sign};
/// let rule: Rule = "+ example.com 17/442-444".parse().unwrap();
/// assert_eq!(rule.sign(), Sign::Permit);
///
/// let entity = Entity::new().with_domain("example.com").with_protocol(17).with_port(443);
/// assert!(rule.matches(&entity).is_positive());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    sign: Sign,
    matcher: Matcher,
    qualifier: Qualifier,
}

impl Rule {
    pub fn new(sign: Sign, matcher: Matcher) -> Self {
        Self {
            sign,
            matcher,
            qualifier: Qualifier::default(),
        }
    }

    pub fn with_qualifier(self, qualifier: Qualifier) -> Self {
        Self { qualifier, ..self }
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    /// Protocol and port are checked first, so a rule that cannot apply
    /// never triggers a lookup.
    pub fn matches(&self, entity: &Entity) -> MatchOutcome {
        if !self.qualifier.accepts(entity.protocol(), entity.port()) {
            return MatchOutcome::Negative;
        }
        self.matcher.matches(entity)
    }
}

impl FromStr for Rule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<_> = s.split_whitespace().collect();
        let (sign, rest) = fields.split_first().ok_or(RuleError::Empty)?;
        if fields.len() > 4 {
            return Err(RuleError::TooManyFields);
        }
        let sign = match *sign {
            "+" => Sign::Permit,
            "-" => Sign::Deny,
            other => return Err(RuleError::InvalidSign(other.to_string())),
        };
        let (matcher, qualifier) = rest.split_first().ok_or(RuleError::MissingMatcher)?;
        Ok(Self {
            sign,
            matcher: matcher.parse()?,
            qualifier: Qualifier::parse(qualifier)?,
        })
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sign::Permit => f.write_str("+"),
            Sign::Deny => f.write_str("-"),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sign, self.matcher)?;
        if !self.qualifier.is_any() {
            write!(f, " {}", self.qualifier)?;
        }
        Ok(())
    }
}
