
use std::fmt;

use endpoints_common::EPResult;

use crate::{
    entity::Entity,
    error::{Error, LookupError},
    matcher::MatchOutcome,
    rule::Rule,
    Result,
};

/// Result of evaluating an [Entity] against an [EndpointList].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub result: EPResult,
    /// Index of the deciding rule.
    pub rule: Option<usize>,
    /// Canonical text of the deciding rule.
    pub reason: Option<String>,
    /// Last lookup error seen while evaluating.
    pub error: Option<LookupError>,
}

impl Evaluation {
    fn no_match(error: Option<LookupError>) -> Self {
        Self {
            result: EPResult::NoMatch,
            rule: None,
            reason: None,
            error,
        }
    }
}

/// Ordered rules, the first matching rule decides.
///
/// The list never changes once built. To change the rules, build a new list.
///
/// # Example
/// ```
/// # use endpoints::{EndpointList, Entity, EPResult};
/// let list = EndpointList::parse(["+ * */80", "- *"]).unwrap();
///
/// let http = Entity::new().with_protocol(6).with_port(80);
/// assert_eq!(list.evaluate(&http).result, EPResult::Permitted);
///
/// let ssh = Entity::new().with_protocol(6).with_port(22);
/// assert_eq!(list.evaluate(&ssh).result, EPResult::Denied);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointList {
    rules: Vec<Rule>,
}

impl EndpointList {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Compiles a rule list, failing on the first invalid line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn parse<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for (line, text) in numbered(lines) {
            let rule = text
                .as_ref()
                .parse::<Rule>()
                .map_err(|source| Error::InvalidRule { line, source })?;
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    /// Compiles a rule list, dropping invalid lines.
    ///
    /// Every dropped line is logged and returned.
    pub fn parse_lossy<I, S>(lines: I) -> (Self, Vec<Error>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        let mut errors = Vec::new();
        for (line, text) in numbered(lines) {
            match text.as_ref().parse::<Rule>() {
                Ok(rule) => rules.push(rule),
                Err(source) => {
                    tracing::warn!(line, rule = text.as_ref(), %source, "dropping invalid rule");
                    errors.push(Error::InvalidRule { line, source });
                }
            }
        }
        (Self { rules }, errors)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates the rules in order and stops at the first match.
    ///
    /// Lookup failures only make the rule that needed the lookup not match.
    /// The last failure is reported with the result.
    pub fn evaluate(&self, entity: &Entity) -> Evaluation {
        let mut error = None;
        for (idx, rule) in self.rules.iter().enumerate() {
            match rule.matches(entity) {
                MatchOutcome::Positive => {
                    tracing::debug!(index = idx, %rule, "rule matched");
                    return Evaluation {
                        result: rule.sign().into(),
                        rule: Some(idx),
                        reason: Some(rule.to_string()),
                        error,
                    };
                }
                MatchOutcome::Negative => {}
                MatchOutcome::Indeterminate(None) => {
                    tracing::trace!(index = idx, %rule, "rule indeterminate");
                }
                MatchOutcome::Indeterminate(Some(err)) => {
                    tracing::debug!(index = idx, %rule, %err, "lookup failed");
                    error = Some(err);
                }
            }
        }
        Evaluation::no_match(error)
    }
}

impl FromIterator<Rule> for EndpointList {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One rule per line.
impl fmt::Display for EndpointList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

/// Rule lines with their 1-based line numbers.
fn numbered<I, S>(lines: I) -> impl Iterator<Item = (usize, S)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .enumerate()
        .map(|(idx, text)| (idx + 1, text))
        .filter(|(_, text)| {
            let text = text.as_ref().trim();
            !text.is_empty() && !text.starts_with('#')
        })
}
