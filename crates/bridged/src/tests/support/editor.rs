//! `mockall` double for [`EditorHost`].

use mockall::mock;

use crate::host::{EditorHost, EngineVersion, FoliageInstance, HostError, Vector3};

mock! {
    pub Editor {}
    impl EditorHost for Editor {
        fn execute_console_command(&self, command: &str) -> Result<(), HostError>;
        fn engine_version(&self) -> EngineVersion;
        fn is_playing(&self) -> bool;
        fn start_play(&self) -> Result<(), HostError>;
        fn stop_play(&self) -> Result<(), HostError>;
        fn save_all(&self) -> Result<usize, HostError>;
        fn create_widget(&self, name: &str) -> Result<String, HostError>;
        fn remove_widget(&self, name: &str) -> Result<(), HostError>;
        fn widgets(&self) -> Vec<String>;
        fn paint_foliage(&self, foliage_type: &str, locations: &[Vector3]) -> Result<usize, HostError>;
        fn foliage_instances(&self) -> Vec<FoliageInstance>;
        fn remove_foliage(&self, foliage_type: &str) -> Result<usize, HostError>;
        fn clear_foliage(&self) -> usize;
        fn set_time_of_day(&self, hour: f64) -> Result<(), HostError>;
        fn create_sky_sphere(&self, name: &str) -> Result<String, HostError>;
    }
}
