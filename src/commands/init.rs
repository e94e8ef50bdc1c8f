//! Implementation of the `pulse init` command.

use crate::commands::Out;
use crate::store::FileStore;
use crate::{Config, Records, Result};
use std::path::Path;
use std::sync::Arc;

/// Creates the pulse home directory, the config file and the seeded data
/// store (default categories and settings).
pub async fn init(home: &Path, vault_url: Option<&str>) -> Result<Out<()>> {
    let config = Config::create(home, vault_url).await?;

    let store = Arc::new(FileStore::open(config.data_dir()).await?);
    let records = Records::load(store).await?;
    records.seed_defaults().await?;

    let mut message = format!(
        "Initialized pulse home at '{}'",
        config.root().display()
    );
    if vault_url.is_none() {
        message.push_str(". Cloud sync is off; set a vault url to enable it");
    }
    Ok(Out::new_message(message))
}
