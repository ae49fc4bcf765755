mod version;
mod workflow;

pub use version::Version;
pub use workflow::Workflow;
