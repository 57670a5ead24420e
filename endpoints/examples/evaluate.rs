use std::{net::IpAddr, path::PathBuf};

use clap::Parser;
use endpoints::{Config, Firewall, Protocol};

/// Evaluates one endpoint against the rules of a configuration file.
#[derive(Debug, Parser)]
pub struct Opt {
    /// JSON configuration
    #[clap(short, long)]
    config: PathBuf,
    #[clap(short, long)]
    domain: Option<String>,
    #[clap(short, long)]
    ip: Option<IpAddr>,
    /// Protocol name or number
    #[clap(short, long, default_value = "TCP")]
    protocol: String,
    #[clap(long, default_value = "443")]
    port: u16,
}

fn main() -> Result<(), anyhow::Error> {
    let opt = Opt::parse();
    tracing_subscriber::fmt::init();

    let config = Config::from_path(&opt.config)?;
    let firewall = Firewall::from_config(&config, |intel| intel)?;
    tracing::info!(rules = firewall.rules().len(), "rules loaded");

    let protocol = match opt.protocol.parse::<Protocol>() {
        Ok(protocol) => protocol.number(),
        Err(_) => opt.protocol.parse()?,
    };
    let mut entity = firewall.entity().with_protocol(protocol).with_port(opt.port);
    if let Some(domain) = &opt.domain {
        entity.set_domain(domain);
    }
    if let Some(ip) = opt.ip {
        entity.set_ip(ip);
    }

    let decision = firewall.decide(&entity);
    tracing::info!(
        result = %decision.result,
        action = ?decision.action,
        rule = decision.evaluation.reason.as_deref().unwrap_or("-"),
        "decided"
    );
    if let Some(err) = &decision.evaluation.error {
        tracing::warn!(%err, "lookup failed during evaluation");
    }
    println!("{:?}", decision.action);

    Ok(())
}
