pub mod package_manager;
pub mod publish_tool;

pub use package_manager::LockfileDetector;
pub use publish_tool::{PublishTool, detect_publish_tool};
