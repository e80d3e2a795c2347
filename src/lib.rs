//! # Volume LOD library
//!
//! This crate drives interactive rendering of volumetric scans (an anatomy
//! volume plus an optional segmentation mask) on hardware that cannot ray cast
//! a full resolution volume at interactive rates.
//!
//! Every volume is decimated once into a three tier resolution pyramid
//! (full, half and quarter resolution). While the user drags or scrolls, the
//! viewer shows the quarter tier with flat shading; once the interaction has
//! quiesced it climbs back through the half tier to the full tier after short
//! debounce delays. Redraw requests are coalesced to a fixed frame budget and
//! wheel zooming is smoothed over several frames.
//!
//! The crate never issues GPU calls. It decides which tier and which shading
//! each volume uses and hands that to a [`RenderBackend`]. Deferred work runs
//! on a cooperative [`Scheduler`](scheduler::Scheduler) that the host advances by calling
//! [`Viewer::tick`] once per animation frame.
//!
//! DICOM series can be loaded with [`DicomDirectoryLoader`]. Files are opened
//! in parallel using rayon and the pyramid tiers are decimated in parallel as
//! well. DICOM files are assumed to have the following attributes:
//!   - Axial data set
//!   - No multiframe (always the first frame is used)
//!   - Images from the same series and acquisition
//!
//! # Examples
//!
//! ## Viewing a DICOM directory headlessly
//!
//! ```no_run
//! # use volume_lod::{DicomDirectoryLoader, RecordingBackend, Viewer, ViewerConfig};
//! # use volume_lod::scheduler::SystemClock;
//! # async fn run() -> Result<(), volume_lod::ViewerError> {
//! let loader = DicomDirectoryLoader::default();
//! let mut viewer = Viewer::load(
//!     RecordingBackend::new(),
//!     ViewerConfig::default(),
//!     &loader,
//!     "dicom/anatomy",
//!     None,
//!     SystemClock,
//! )
//! .await?;
//!
//! viewer.start_interaction();
//! viewer.end_interaction();
//! // Call once per animation frame.
//! viewer.tick();
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod clipping;
pub mod config;
pub mod enums;
pub mod error;
pub mod lod_manager;
pub mod lod_unit;
pub mod pyramid;
pub mod scheduler;
pub mod throttle;
pub mod transfer_function;
pub mod viewer;
pub mod volume;
pub mod volume_loader;
pub mod zoom;

pub use backend::{Camera, RecordingBackend, RenderBackend};
pub use config::ViewerConfig;
pub use error::{ConfigurationError, ViewerError};
pub use viewer::Viewer;
pub use volume::VoxelField;
pub use volume_loader::{DicomDirectoryLoader, LoadError, VolumeLoader};
