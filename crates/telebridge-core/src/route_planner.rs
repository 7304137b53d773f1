//! Route-planner push collaborator

use async_trait::async_trait;

use crate::error::RoutePlannerError;
use crate::models::{ChargeStatus, VehicleStatus};

/// Third-party route planner that accepts live vehicle telemetry
#[async_trait]
pub trait RoutePlanner: Send + Sync {
    /// Push one telemetry sample built from a fresh status and charge payload.
    ///
    /// Returns the planner's textual response.
    async fn push(
        &self,
        api_key: &str,
        user_token: &str,
        status: &VehicleStatus,
        charge: &ChargeStatus,
    ) -> Result<String, RoutePlannerError>;
}
