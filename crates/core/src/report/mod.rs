//! Report generation for resolved tickets.
//!
//! A [`Renderer`] turns the joined ticket view into bytes, an
//! [`ArtifactStore`] keeps them, and [`ReportPipeline`] registers exactly one
//! report per ticket in the repository, overwriting on regeneration.
//!
//! # Example
//!
//! ```ignore
//! use racdesk_core::report::{FsArtifactStore, ReportPipeline, TextReportRenderer};
//!
//! let pipeline = ReportPipeline::new(
//!     repository,
//!     Arc::new(TextReportRenderer::new()),
//!     Arc::new(FsArtifactStore::new("relatorios")),
//!     Duration::from_secs(30),
//! );
//!
//! let handle = pipeline.generate("RAC0001").await?;
//! println!("Report {} stored at {}", handle.report_id, handle.artifact);
//! ```

mod artifact;
mod pipeline;
mod renderer;

pub use artifact::{ArtifactError, ArtifactStore, FsArtifactStore};
pub use pipeline::{ReportError, ReportHandle, ReportPipeline};
pub use renderer::{RenderError, Renderer, TextReportRenderer};
