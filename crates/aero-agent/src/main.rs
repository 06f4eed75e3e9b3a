//! aero-agent - keeps a node's nftables forwards in sync with the panel.

use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    aero_agent::run().await
}
