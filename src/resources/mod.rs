mod static_website;
pub use static_website::*;
mod bucket_deployment;
pub use bucket_deployment::*;

/// logical ids must be alphanumeric. Anything else in the
/// declaration id is dropped before it is appended to `prefix`.
pub fn logical_id(prefix: &str, id: &str) -> String {
    let id: String = id.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    format!("{prefix}{id}")
}

pub fn bucket_name_for(id: &str) -> String {
    format!("static-site-{id}").to_lowercase()
}
