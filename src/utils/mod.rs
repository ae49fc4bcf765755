pub mod time;

/// Generates a url-safe unique id for steps, transitions and workflows.
pub fn longid() -> String {
    nanoid::nanoid!()
}
