#![cfg(test)]

use super::{Rule, Sign};
use crate::{
    entity::Entity,
    error::RuleError,
    matcher::{MatchOutcome, Matcher},
};
use endpoints_common::{EPResult, PortStoreError};
use test_case::test_case;

fn rule(s: &str) -> Rule {
    s.parse().unwrap()
}

fn domain(domain: &str) -> Entity {
    Entity::new().with_domain(domain).with_protocol(6).with_port(443)
}

#[test_case("+ .", RuleError::EmptyPattern ; "only dot")]
#[test_case("+ .sub.and.prefix.*", RuleError::AnchoredWildcard(".sub.and.prefix.*".into()) ; "anchored wildcard")]
#[test_case("+ *.sub..and.prefix.*", RuleError::EmptyLabel("*.sub..and.prefix.*".into()) ; "empty label")]
#[test_case("", RuleError::Empty ; "empty")]
#[test_case("   ", RuleError::Empty ; "blank")]
#[test_case("+", RuleError::MissingMatcher ; "sign only")]
#[test_case("* example.com", RuleError::InvalidSign("*".into()) ; "wildcard sign")]
#[test_case("+example.com", RuleError::InvalidSign("+example.com".into()) ; "sign not separated")]
#[test_case("+ example.com TCP 80 extra", RuleError::TooManyFields ; "five fields")]
#[test_case("+ LAN,Office", RuleError::UnknownScope("Office".into()) ; "unknown scope")]
#[test_case("+ example.com FOO", RuleError::UnknownProtocol("FOO".into()) ; "unknown protocol")]
#[test_case("+ example.com TCP 0", RuleError::InvalidPort("0".into()) ; "port zero")]
#[test_case("+ example.com TCP 90-80", RuleError::InvalidPortRange("90-80".into()) ; "reversed ports")]
#[test_case("+ 10.0.0.0/40", RuleError::InvalidCidr("10.0.0.0/40".into()) ; "bad prefix")]
fn invalid(line: &str, error: RuleError) {
    assert_eq!(line.parse::<Rule>().unwrap_err(), error);
}

#[test]
fn port_store_errors_surface() {
    let ports = (1..=600).step_by(2).map(|p| p.to_string()).collect::<Vec<_>>();
    let line = format!("+ * TCP {}", ports.join(","));
    assert_eq!(
        line.parse::<Rule>().unwrap_err(),
        RuleError::PortStore(PortStoreError::Exhausted)
    );
}

#[test]
fn parts() {
    let rule = rule("-   10.0.0.0/8\tTCP   22");
    assert_eq!(rule.sign(), Sign::Deny);
    assert_eq!(rule.matcher(), &Matcher::Network("10.0.0.0/8".parse().unwrap()));
    assert!(!rule.qualifier().is_any());
    assert_eq!(EPResult::from(rule.sign()), EPResult::Denied);
    assert_eq!(EPResult::from(Sign::Permit), EPResult::Permitted);
}

#[test_case("+ example.com", "+ example.com." ; "implied root")]
#[test_case("- *", "- *" ; "any")]
#[test_case("+ *.Example.COM udp 53", "+ *.example.com. UDP/53" ; "separated qualifier")]
#[test_case("+ example.com 17/442-444", "+ example.com. UDP/442-444" ; "combined qualifier")]
#[test_case("+ * */80", "+ * */80" ; "ports only")]
#[test_case("+ lan,localhost", "+ Localhost,LAN" ; "scopes in order")]
#[test_case("- as15169 * *", "- AS15169" ; "explicit wildcards dropped")]
#[test_case("+ l:TRAC", "+ L:TRAC" ; "list")]
#[test_case("+ ::ffff:10.0.0.1", "+ 10.0.0.1" ; "mapped ip")]
fn canonical_text(line: &str, canonical: &str) {
    assert_eq!(rule(line).to_string(), canonical);
    assert_eq!(rule(canonical), rule(line));
}

#[test_case("+ *example.com", "example.com", true ; "star suffix zone")]
#[test_case("+ *example.com", "abc.example.com", true ; "star suffix subdomain")]
#[test_case("+ *example.com", "abc-example.com", true ; "star suffix neighbour")]
#[test_case("+ *.example.com", "abc.example.com", true ; "label suffix subdomain")]
#[test_case("+ *.example.com", "example.com", false ; "label suffix zone")]
#[test_case("+ *.example.com", "abc-example.com", false ; "label suffix neighbour")]
#[test_case("+ .example.com", "example.com", true ; "dot zone")]
#[test_case("+ .example.com", "abc.example.com", true ; "dot subdomain")]
#[test_case("+ .example.com", "abc-example.com", false ; "dot neighbour")]
#[test_case("+ example.*", "example.com", true ; "label prefix")]
#[test_case("+ example.*", "abc.example.com", false ; "label prefix subdomain")]
#[test_case("+ *.exampl*", "abc.example.com", true ; "partial label")]
#[test_case("+ *.exampl*", "example.com", false ; "partial label zone")]
fn domain_patterns(line: &str, target: &str, matched: bool) {
    let rule = rule(line);
    let entity = domain(target);
    let outcome = rule.matches(&entity);
    assert_eq!(outcome.is_positive(), matched);
    // classification is a pure function of pattern and domain
    assert_eq!(rule.matches(&entity), outcome);
}

#[test]
fn domain_rule_without_domain_is_indeterminate() {
    let entity = Entity::new().with_ip("10.0.0.1".parse().unwrap());
    assert_eq!(
        rule("+ example.com").matches(&entity),
        MatchOutcome::Indeterminate(None)
    );
}

#[test]
fn qualifier_is_checked_before_matcher() {
    let entity = Entity::new().with_protocol(17).with_port(53);
    assert_eq!(rule("+ example.com TCP").matches(&entity), MatchOutcome::Negative);
    assert_eq!(
        rule("+ example.com UDP").matches(&entity),
        MatchOutcome::Indeterminate(None)
    );
}

#[test_case(441, MatchOutcome::Negative)]
#[test_case(442, MatchOutcome::Positive)]
#[test_case(443, MatchOutcome::Positive)]
#[test_case(444, MatchOutcome::Positive)]
#[test_case(445, MatchOutcome::Negative)]
fn udp_port_sweep(port: u16, outcome: MatchOutcome) {
    let entity = Entity::new()
        .with_domain("example.com")
        .with_protocol(17)
        .with_port(port);
    assert_eq!(rule("+ example.com 17/442-444").matches(&entity), outcome);
}
