//! Material submission trait

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::types::{CreateMaterialRequest, MaterialReceipt};

/// Sends chunked material to the processing service
///
/// Implementations:
/// - `MaterialClient`: REST API with bearer-token refresh
#[async_trait]
pub trait MaterialSubmitter: Send + Sync {
    /// Persist a material and start backend processing
    async fn submit(&self, request: &CreateMaterialRequest) -> Result<MaterialReceipt>;

    /// Current processing state of a submitted material
    async fn status(&self, material_id: &str) -> Result<MaterialReceipt>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Poll `status` until the material is `ready` or `failed`.
///
/// Returns the last receipt, still `processing`, once `max_polls` is spent.
pub async fn wait_until_settled(
    submitter: &dyn MaterialSubmitter,
    material_id: &str,
    interval: Duration,
    max_polls: u32,
) -> Result<MaterialReceipt> {
    let mut receipt = submitter.status(material_id).await?;
    let mut polls = 1;

    while !receipt.status.is_settled() && polls < max_polls {
        tokio::time::sleep(interval).await;
        receipt = submitter.status(material_id).await?;
        polls += 1;
    }

    if !receipt.status.is_settled() {
        tracing::warn!(
            "Material {} still processing after {} polls via {}",
            material_id,
            polls,
            submitter.name()
        );
    }
    Ok(receipt)
}
