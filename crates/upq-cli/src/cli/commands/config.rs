//! `upq config` – show where the config lives and what is in effect.

use anyhow::Result;
use upq_core::config;

pub fn run_config() -> Result<()> {
    let path = config::config_path()?;
    let cfg = config::load_or_init()?;
    println!("# {}", path.display());
    print!("{}", config::to_toml(&cfg)?);
    println!("# uploads go to {}", cfg.storage.resolve_dest_dir()?.display());
    Ok(())
}
