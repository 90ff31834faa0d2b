// Engine module - autofill core
//
// Leaf-first:
//   mesh, restroke, graph → host interface, resampling, boundary walks
//   side, patch, patches  → boundary topology
//   pattern, service      → candidate fills and where they come from
//   stroke, session       → artist actions
//   saved, config, error  → ambient

pub mod config;
pub mod error;
pub mod graph;
pub mod mesh;
pub mod patch;
pub mod patches;
pub mod pattern;
pub mod restroke;
pub mod saved;
pub mod service;
pub mod session;
pub mod side;
pub mod stroke;

// Re-export commonly used items
pub use config::AutofillOptions;
pub use error::{AutofillError, MeshError, Result, ServiceError};
pub use mesh::{Adjacency, EdgeId, FaceId, HostMesh, PolyMesh, VertId};
pub use patch::Patch;
pub use patches::{PatchSet, Selection, SideOutcome};
pub use pattern::{DrawnPattern, ExpandedPattern, PatternCache};
pub use saved::{SavedDrawn, SavedPatch, SavedPatchSet, SavedPattern, SavedSide};
pub use service::{HttpTransport, JsonPatternService, PatternService, Transport};
pub use session::{Autofill, Deferred};
pub use side::Side;
