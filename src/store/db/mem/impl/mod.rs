mod version;
mod workflow;
