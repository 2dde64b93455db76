//! Host runtime seams: the logic thread, engine safety state, and editor
//! operations.

mod editor;
mod logic_thread;
mod safety;

pub use self::editor::{
    EditorHost, EngineVersion, FoliageInstance, HeadlessEditor, HostError, Vector3,
};
pub use self::logic_thread::{Job, LogicLoop, LogicThread, LogicThreadError, LogicThreadHandle};
pub use self::safety::{EngineSafetyProbe, EngineSafetyState, SafetyFlags};
