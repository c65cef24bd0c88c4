//! Orchestrates end-to-end template synthesis.
//!
//! Synthesis is a linear, run-to-completion flow: resolve the database's
//! network placement, find a public subnet in its VPC, then declare the
//! bastion resource graph. Any failure aborts the whole flow before a
//! template exists, so nothing materially incomplete is ever emitted.

use thiserror::Error;

use crate::config::Deployment;
use crate::lookup::{DbNetworkDetails, LookupError, NetworkLookup};
use crate::stack;
use crate::template::Template;

/// Errors surfaced while synthesising a stack.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Raised when the database lookup fails.
    #[error("database lookup failed: {0}")]
    Database(#[source] LookupError),
    /// Raised when no public subnet can be found in the database's VPC.
    #[error("subnet lookup failed: {0}")]
    Subnet(#[source] LookupError),
}

/// Result of a successful synthesis.
#[derive(Clone, Debug)]
pub struct Synthesis {
    /// The declared resource template.
    pub template: Template,
    /// Network placement the declaration was derived from.
    pub db: DbNetworkDetails,
    /// Public subnet chosen for the bastion host.
    pub subnet_id: String,
}

/// Executes the synthesis flow using the provided lookup.
#[derive(Clone, Debug)]
pub struct SynthOrchestrator<L> {
    lookup: L,
}

impl<L> SynthOrchestrator<L>
where
    L: NetworkLookup,
{
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(lookup: L) -> Self {
        Self { lookup }
    }

    /// Runs the lookup-then-declare flow and returns the synthesis result.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError`] when either lookup fails; no partial template
    /// is produced.
    pub async fn synthesise(&self, deployment: &Deployment) -> Result<Synthesis, SynthError> {
        let db = self
            .lookup
            .database(&deployment.db_instance_identifier)
            .await
            .map_err(SynthError::Database)?;
        let subnet_id = self
            .lookup
            .public_subnet(&db.vpc_id)
            .await
            .map_err(SynthError::Subnet)?;

        let template = stack::declare(deployment, &db, &subnet_id);
        Ok(Synthesis {
            template,
            db,
            subnet_id,
        })
    }
}
