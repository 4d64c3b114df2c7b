//! Studio
//!
//! Take sessions: configuration, the vocal-drop library, the render pipeline
//! and artifact naming.

pub mod drops;
pub mod naming;
pub mod pipeline;
pub mod session;
pub mod take;

pub use drops::{DropId, VocalDrop, VocalDropLibrary};
pub use naming::artifact_file_name;
pub use pipeline::{render_take, RenderReport, RenderedTake, TakeJob};
pub use session::{Artifact, RenderTicket, Studio};
pub use take::{
    BackgroundConfig, DropPlacement, SfxPlacement, Take, TakeConfig, TakeId, TrackChoice,
};
