//! `topofuse resolve`: MAC → vendor without building a topology.

use std::sync::Arc;

use futures_util::future::join_all;
use tabled::Tabled;

use topofuse_core::{IdentityInfo, IdentityResolver, SystemClock};

use crate::cli::{GlobalOpts, ResolveArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct IdentityRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Source")]
    source: String,
}

impl From<&IdentityInfo> for IdentityRow {
    fn from(info: &IdentityInfo) -> Self {
        Self {
            mac: info.mac.clone(),
            vendor: if info.is_known() {
                info.vendor.clone()
            } else {
                "-".into()
            },
            device_type: info.device_type().to_owned(),
            confidence: format!("{:?}", info.confidence).to_lowercase(),
            source: info.source.to_string(),
        }
    }
}

pub async fn handle(args: ResolveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = super::load(global)?;
    let mut identity = config.identity_config()?;
    if args.offline {
        identity.online_lookup = false;
    }
    let resolver = IdentityResolver::from_config(&identity, Arc::new(SystemClock))?;

    // Duplicate OUIs coalesce inside the resolver.
    let infos: Vec<IdentityInfo> =
        join_all(args.macs.iter().map(|mac| resolver.resolve(mac))).await;

    let out = output::render(
        global.output,
        &infos,
        |infos| output::table(&infos.iter().map(IdentityRow::from).collect::<Vec<_>>()),
        |infos| {
            infos
                .iter()
                .map(|i| format!("{}\t{}", i.mac, i.vendor))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
