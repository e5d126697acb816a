//! `vidrelay list`.

use crate::error::ClientResult;
use crate::socket::TransferClient;

/// Prints the objects in `bucket`, one per line.
pub async fn run(client: &TransferClient, bucket: Option<&str>) -> ClientResult<()> {
    let names = client.list_objects(bucket).await?;
    if names.is_empty() {
        eprintln!("No objects.");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}
