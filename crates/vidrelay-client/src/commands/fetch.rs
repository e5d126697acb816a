//! `vidrelay fetch`: download one object.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::info;

use vidrelay_core::Catalog;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::sink::{FileSink, MemorySink};
use crate::socket::TransferClient;

/// Which object to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Storage name in the bucket.
    Object(String),
    /// Display name looked up in the catalog.
    Title(String),
}

/// Where the payload goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Temporary file in this directory.
    Dir(PathBuf),
    /// Standard output.
    Stdout,
}

/// Resolves a target to the object's storage name.
pub fn resolve_target(catalog_path: &Path, bucket: &str, target: Target) -> ClientResult<String> {
    match target {
        Target::Object(name) => Ok(name),
        Target::Title(title) => {
            let catalog = Catalog::load(catalog_path)?;
            catalog
                .lookup_storage_name(&title, bucket)
                .map(str::to_string)
                .ok_or_else(|| {
                    ClientError::NotFound(format!(
                        "no catalog entry titled `{}` in bucket `{}`",
                        title, bucket
                    ))
                })
        }
    }
}

/// Fetches the object and prints the saved path, or streams it to stdout.
pub async fn run(
    client: &TransferClient,
    config: &ClientConfig,
    bucket: &str,
    target: Target,
    destination: Destination,
) -> ClientResult<()> {
    let object = resolve_target(&config.catalog.path(), bucket, target)?;

    match destination {
        Destination::Stdout => {
            let data = client.fetch_object(bucket, &object, MemorySink::new()).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await?;
            stdout.flush().await?;
        }
        Destination::Dir(dir) => {
            let sink = FileSink::create(&dir, &object)?;
            let path = client.fetch_object(bucket, &object, sink).await?;
            info!(path = %path.display(), "Saved download");
            println!("{}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidrelay_core::CatalogEntry;

    #[test]
    fn object_target_passes_through() {
        let name =
            resolve_target(Path::new("/nonexistent/catalog.toml"), "demo", Target::Object("a.mp4".into()))
                .unwrap();
        assert_eq!(name, "a.mp4");
    }

    #[test]
    fn title_target_uses_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        let mut catalog = Catalog::new();
        catalog
            .add(CatalogEntry::new("demo", "sample.mp4", "Sample clip"))
            .unwrap();
        catalog.save(&path).unwrap();

        let name = resolve_target(&path, "demo", Target::Title("Sample clip".into())).unwrap();
        assert_eq!(name, "sample.mp4");

        let err = resolve_target(&path, "other", Target::Title("Sample clip".into())).unwrap_err();
        assert!(err.is_not_found());
    }
}
