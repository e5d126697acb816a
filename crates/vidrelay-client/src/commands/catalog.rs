//! `vidrelay catalog`: display names for stored objects.

use vidrelay_core::{Catalog, CatalogEntry};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Adds an entry and saves the catalog.
pub fn add(
    config: &ClientConfig,
    bucket: String,
    storage_name: String,
    display_name: String,
) -> ClientResult<()> {
    let path = config.catalog.path();
    let mut catalog = Catalog::load(&path)?;
    catalog.add(CatalogEntry::new(bucket, storage_name, display_name))?;
    catalog.save(&path)?;
    println!("Saved to {}", path.display());
    Ok(())
}

/// Prints the display names in `bucket`.
pub fn list(config: &ClientConfig, bucket: &str) -> ClientResult<()> {
    let catalog = Catalog::load(&config.catalog.path())?;
    for name in catalog.list_display_names(bucket) {
        println!("{}", name);
    }
    Ok(())
}
