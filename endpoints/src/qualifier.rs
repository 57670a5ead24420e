use std::{fmt, str::FromStr};

use endpoints_common::{PortStore, Protocol};

use crate::error::RuleError;

/// Protocols a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProtocolFilter {
    Any,
    /// Sorted protocol numbers.
    Set(Vec<u8>),
}

/// Ports a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortFilter {
    Any,
    Ranges(PortStore),
}

/// Protocol and port restriction of a rule.
///
/// A port restriction without an explicit protocol only accepts protocols
/// that carry ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qualifier {
    protocol: ProtocolFilter,
    ports: PortFilter,
}

impl Default for Qualifier {
    fn default() -> Self {
        Self {
            protocol: ProtocolFilter::Any,
            ports: PortFilter::Any,
        }
    }
}

impl Qualifier {
    pub fn protocol(&self) -> &ProtocolFilter {
        &self.protocol
    }

    pub fn ports(&self) -> &PortFilter {
        &self.ports
    }

    pub fn is_any(&self) -> bool {
        *self == Self::default()
    }

    pub fn accepts(&self, protocol: u8, port: u16) -> bool {
        let protocol_ok = match (&self.protocol, &self.ports) {
            (ProtocolFilter::Any, PortFilter::Any) => true,
            (ProtocolFilter::Any, PortFilter::Ranges(_)) => Protocol::has_ports(protocol),
            (ProtocolFilter::Set(set), _) => set.binary_search(&protocol).is_ok(),
        };
        protocol_ok
            && match &self.ports {
                PortFilter::Any => true,
                PortFilter::Ranges(store) => store.lookup(port),
            }
    }

    /// Parses the fields after the endpoint of a rule.
    ///
    /// Accepts `proto/ports` as a single field, or `proto` optionally
    /// followed by `ports`.
    pub(crate) fn parse(fields: &[&str]) -> Result<Self, RuleError> {
        match fields {
            [] => Ok(Self::default()),
            [field] => match field.split_once('/') {
                Some((protocol, ports)) => Ok(Self {
                    protocol: parse_protocols(protocol)?,
                    ports: parse_ports(ports)?,
                }),
                None => Ok(Self {
                    protocol: parse_protocols(field)?,
                    ports: PortFilter::Any,
                }),
            },
            [first, _] if first.contains('/') => Err(RuleError::TooManyFields),
            [_, ports] if ports.contains('/') => Err(RuleError::DuplicateProtocol),
            [protocol, ports] => Ok(Self {
                protocol: parse_protocols(protocol)?,
                ports: parse_ports(ports)?,
            }),
            _ => Err(RuleError::TooManyFields),
        }
    }
}

fn parse_protocols(field: &str) -> Result<ProtocolFilter, RuleError> {
    if field == "*" {
        return Ok(ProtocolFilter::Any);
    }
    let mut numbers = field
        .split(',')
        .map(parse_protocol)
        .collect::<Result<Vec<_>, _>>()?;
    numbers.sort_unstable();
    numbers.dedup();
    Ok(ProtocolFilter::Set(numbers))
}

fn parse_protocol(name: &str) -> Result<u8, RuleError> {
    if let Ok(protocol) = Protocol::from_str(name) {
        return Ok(protocol.number());
    }
    match name.parse::<u8>() {
        // 0 means "no protocol" and 255 is reserved
        Ok(number) if number != 0 && number != u8::MAX => Ok(number),
        _ => Err(RuleError::UnknownProtocol(name.to_string())),
    }
}

fn parse_ports(field: &str) -> Result<PortFilter, RuleError> {
    if field == "*" {
        return Ok(PortFilter::Any);
    }
    let ranges = field
        .split(',')
        .map(parse_range)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PortFilter::Ranges(PortStore::new(&ranges)?))
}

fn parse_range(range: &str) -> Result<(u16, u16), RuleError> {
    let mut bounds = range.split('-');
    let (start, end) = match (bounds.next(), bounds.next(), bounds.next()) {
        (Some(port), None, None) => {
            let port = parse_port(port)?;
            (port, port)
        }
        (Some(start), Some(end), None) => (parse_port(start)?, parse_port(end)?),
        _ => return Err(RuleError::InvalidPortRange(range.to_string())),
    };
    if start > end {
        return Err(RuleError::InvalidPortRange(range.to_string()));
    }
    Ok((start, end))
}

fn parse_port(port: &str) -> Result<u16, RuleError> {
    match port.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(RuleError::InvalidPort(port.to_string())),
    }
}

impl fmt::Display for ProtocolFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolFilter::Any => f.write_str("*"),
            ProtocolFilter::Set(numbers) => {
                for (i, &number) in numbers.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    match Protocol::from_number(number) {
                        Some(protocol) => write!(f, "{protocol}")?,
                        None => write!(f, "{number}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for PortFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortFilter::Any => f.write_str("*"),
            PortFilter::Ranges(store) => {
                for (i, range) in store.ranges().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if range.start() == range.end() {
                        write!(f, "{}", range.start())?;
                    } else {
                        write!(f, "{}-{}", range.start(), range.end())?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Renders the canonical single field form, empty when unrestricted.
impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.protocol, &self.ports) {
            (ProtocolFilter::Any, PortFilter::Any) => Ok(()),
            (protocol, PortFilter::Any) => write!(f, "{protocol}"),
            (protocol, ports) => write!(f, "{protocol}/{ports}"),
        }
    }
}
