use anyhow::bail;

use crate::config::Config;
use crate::session::{PartnerPairs, SessionFile};

pub fn cmd_login(session: &SessionFile, cfg: &Config, args: &[String]) -> anyhow::Result<()> {
    let [identity, secret] = args else {
        bail!("usage: together login <name> <secret>");
    };

    let check = PartnerPairs::new(&cfg.partners());
    if !session.authenticate(&check, identity, secret)? {
        // deliberately generic: never confirm which half of the pair failed
        bail!("invalid username or password");
    }

    println!("signed in as {identity}");
    Ok(())
}

pub fn cmd_logout(session: &SessionFile) -> anyhow::Result<()> {
    session.logout()?;
    println!("signed out");
    Ok(())
}
