use std::sync::Arc;

use endpoints_common::{Action, EPResult};
use parking_lot::RwLock;

use crate::{
    config::Config,
    connection::ConnectionRecord,
    entity::Entity,
    intel::Intel,
    list::{EndpointList, Evaluation},
    logger, Result,
};

/// Final verdict for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub result: EPResult,
    pub action: Action,
    pub evaluation: Evaluation,
}

struct State {
    rules: Arc<EndpointList>,
    default_action: Action,
}

/// Decides connections with an [EndpointList] and a default action.
///
/// Connections are accepted or rejected by the first matching rule. Connections
/// no rule decides get the action set by
/// [`set_default_action`](Firewall::set_default_action).
///
/// # Example
/// ```
/// # use endpoints::{Action, EndpointList, Entity, Firewall, Intel};
/// let fw = Firewall::new(Intel::new());
/// fw.replace_rules(EndpointList::parse(["+ .example.com"]).unwrap());
///
/// let entity = fw.entity().with_domain("www.example.com");
/// assert_eq!(fw.decide(&entity).action, Action::Accept);
///
/// let entity = fw.entity().with_domain("example.org");
/// assert_eq!(fw.decide(&entity).action, Action::Reject);
/// ```
pub struct Firewall {
    intel: Arc<Intel>,
    state: RwLock<State>,
}

impl Firewall {
    /// Creates a [Firewall] without rules that rejects every connection.
    pub fn new(intel: Intel) -> Self {
        Self {
            intel: Arc::new(intel),
            state: RwLock::new(State {
                rules: Arc::new(EndpointList::default()),
                default_action: Action::default(),
            }),
        }
    }

    /// Creates a [Firewall] from `config`, with lookup collaborators
    /// attached to the `Intel` built from it.
    ///
    /// # Example
    /// ```
    /// # use endpoints::{Config, Firewall};
    /// let config = Config::from_json(r#"{"rules": ["+ LAN"]}"#).unwrap();
    /// let fw = Firewall::from_config(&config, |intel| intel).unwrap();
    /// assert_eq!(fw.rules().len(), 1);
    /// ```
    pub fn from_config(config: &Config, attach: impl FnOnce(Intel) -> Intel) -> Result<Self> {
        let fw = Self::new(attach(config.intel()));
        fw.replace_rules(config.endpoint_list()?);
        fw.set_default_action(config.default_action);
        Ok(fw)
    }

    /// Picks the action for connections no rule decides.
    ///
    /// If not specified it will be set to `Reject`.
    pub fn set_default_action(&self, action: Action) {
        self.state.write().default_action = action;
    }

    pub fn default_action(&self) -> Action {
        self.state.read().default_action
    }

    /// Swaps the rule list. Decisions in flight finish with the old list.
    pub fn replace_rules(&self, rules: EndpointList) {
        self.state.write().rules = Arc::new(rules);
    }

    pub fn rules(&self) -> Arc<EndpointList> {
        self.state.read().rules.clone()
    }

    /// A blank [Entity] that resolves its attributes with this firewall's collaborators.
    pub fn entity(&self) -> Entity {
        Entity::with_intel(self.intel.clone())
    }

    pub fn decide(&self, entity: &Entity) -> Decision {
        let (rules, default_action) = {
            let state = self.state.read();
            (state.rules.clone(), state.default_action)
        };
        let evaluation = rules.evaluate(entity);
        let action = Option::<Action>::from(evaluation.result).unwrap_or(default_action);
        Decision {
            result: evaluation.result,
            action,
            evaluation,
        }
    }

    /// Decides a connection and logs the verdict.
    pub fn decide_record(&self, record: &ConnectionRecord) -> Decision {
        let entity = record.entity(self.intel.clone());
        let decision = self.decide(&entity);
        logger::log_verdict(record, &entity, &decision);
        decision
    }
}

#[cfg(test)]
mod test {
    use super::Firewall;
    use crate::{
        config::Config,
        connection::{ConnectionRecord, Direction},
        error::LookupError,
        intel::{AsnResolver, Intel},
        list::EndpointList,
    };
    use endpoints_common::{Action, EPResult};
    use std::net::IpAddr;
    use test_case::test_case;

    struct Down;

    impl AsnResolver for Down {
        fn resolve_asn(&self, _ip: &IpAddr) -> Result<Option<u32>, LookupError> {
            Err(LookupError::failed("asn", "service down"))
        }
    }

    fn firewall(rules: &[&str]) -> Firewall {
        let fw = Firewall::new(Intel::new());
        fw.replace_rules(EndpointList::parse(rules).unwrap());
        fw
    }

    #[test_case(Action::Accept)]
    #[test_case(Action::Reject)]
    fn no_match_uses_default_action(default: Action) {
        let fw = firewall(&["- .example.com"]);
        fw.set_default_action(default);
        let decision = fw.decide(&fw.entity().with_domain("example.org"));
        assert_eq!(decision.result, EPResult::NoMatch);
        assert_eq!(decision.action, default);
    }

    #[test_case("+ .example.com", Action::Accept ; "permit")]
    #[test_case("- .example.com", Action::Reject ; "deny")]
    fn rules_override_default(rule: &str, action: Action) {
        let fw = firewall(&[rule]);
        for default in [Action::Accept, Action::Reject] {
            fw.set_default_action(default);
            assert_eq!(fw.decide(&fw.entity().with_domain("example.com")).action, action);
        }
    }

    #[test]
    fn default_is_reject() {
        let fw = Firewall::new(Intel::new());
        assert_eq!(fw.default_action(), Action::Reject);
        assert_eq!(fw.decide(&fw.entity()).action, Action::Reject);
    }

    #[test]
    fn failed_lookup_still_gets_verdict() {
        let fw = Firewall::new(Intel::new().with_asn_resolver(Down));
        fw.replace_rules(EndpointList::parse(["+ AS15169"]).unwrap());
        fw.set_default_action(Action::Accept);

        let decision = fw.decide(&fw.entity().with_ip("8.8.8.8".parse().unwrap()));
        assert_eq!(decision.result, EPResult::NoMatch);
        assert_eq!(decision.action, Action::Accept);
        assert_eq!(
            decision.evaluation.error,
            Some(LookupError::failed("asn", "service down"))
        );
    }

    #[test]
    fn replacing_rules_keeps_old_list_alive() {
        let fw = firewall(&["+ *"]);
        let old = fw.rules();
        fw.replace_rules(EndpointList::parse(["- *"]).unwrap());
        assert_eq!(old.to_string(), "+ *\n");
        assert_eq!(fw.decide(&fw.entity()).action, Action::Reject);
    }

    #[test]
    fn decide_record() {
        let fw = firewall(&["+ Localhost,LAN", "- *"]);
        let local = ConnectionRecord::new(
            Direction::Outbound,
            6,
            ("192.168.0.10".parse().unwrap(), 50000),
            ("192.168.0.1".parse().unwrap(), 80),
        );
        assert_eq!(fw.decide_record(&local).action, Action::Accept);

        let remote = ConnectionRecord {
            remote_ip: "8.8.8.8".parse().unwrap(),
            ..local
        };
        let decision = fw.decide_record(&remote);
        assert_eq!(decision.action, Action::Reject);
        assert_eq!(decision.evaluation.rule, Some(1));
    }

    #[test]
    fn from_config() {
        let config = Config::from_json(
            r#"{"default_action": "Accept", "rules": ["- AS15169", "bogus", "+ *"], "skip_invalid_rules": true}"#,
        )
        .unwrap();
        let fw = Firewall::from_config(&config, |intel| intel.with_asn_resolver(Down)).unwrap();
        assert_eq!(fw.default_action(), Action::Accept);
        assert_eq!(fw.rules().len(), 2);
    }
}
