//! Testing utilities and mock implementations.
//!
//! Mocks for every external collaborator of the workflow (renderer, artifact
//! storage and delivery transports), so pipelines can be exercised end to end
//! against an in-memory repository.
//!
//! # Example
//!
//! ```rust,ignore
//! use racdesk_core::testing::{fixtures, MemoryArtifactStore, MockRenderer};
//!
//! let renderer = Arc::new(MockRenderer::new());
//! renderer.fail_for("RAC0002").await;
//!
//! let artifacts = Arc::new(MemoryArtifactStore::new());
//! let pipeline = ReportPipeline::new(repo, renderer.clone(), artifacts, timeout);
//! let sweep = pipeline.sweep_pending(&CancellationToken::new()).await?;
//! assert_eq!(renderer.render_count().await, 3);
//! ```

pub mod fixtures;
mod memory_artifacts;
mod mock_renderer;
mod mock_transport;

pub use memory_artifacts::MemoryArtifactStore;
pub use mock_renderer::MockRenderer;
pub use mock_transport::{MockAlternateTransport, MockEmailTransport, RecordedSend};
