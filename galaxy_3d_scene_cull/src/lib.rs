/*!
# Galaxy 3D Scene Cull

Scene culling core for the Galaxy 3D engine.

This crate decides, every frame, which instances of a scenario a camera
(or a shadow face, or a reflection probe face) has to draw. It keeps
instances in a spatial index, maintains which lights, probes and volumes
affect which geometry, and hands ready-made visibility lists to a
rendering backend through a trait.

## Architecture

- **SceneCull**: Registry owning scenarios, instances and cameras
- **SceneIndex**: Spatial index (dynamic BVH or octree) per scenario partition
- **Dirty pass**: Batched re-indexing of moved or edited instances
- **Pairing**: Symmetric geometry/volume relationships kept by overlap
- **CullContext**: Per-frame lists produced by one linear scan
- **SceneRenderBackend**: Trait the renderer implements to receive the lists

Base resources (meshes, lights, probes) stay in an external storage reached
through the `GeometryStorage` trait.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod math;
pub mod camera;
pub mod index;
pub mod utils;
pub mod scene;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Logger host
    pub use crate::engine::Engine;

    // Registry and backend contract
    pub use crate::scene::{SceneCull, SceneRenderBackend, GeometryStorage};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Configuration and statistics
    pub mod config {
        pub use crate::config::*;
    }

    // Bounding volumes
    pub mod math {
        pub use crate::math::*;
    }

    // Cameras, frustums and render views
    pub mod camera {
        pub use crate::camera::*;
    }

    // Spatial indexes
    pub mod index {
        pub use crate::index::*;
    }

    // Scenarios, instances and the frame pipeline
    pub mod scene {
        pub use crate::scene::*;
    }

    pub mod utils {
        pub use crate::utils::*;
    }
}

// Re-export math library at crate root
pub use glam;
