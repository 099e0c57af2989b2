//! Remote path construction.
//!
//! Layout: `s3://<bucket>[/<namespace>][/<project_id>]/dot-scrapy/<spider>/`.
//! Bracketed segments are omitted, never left empty.

/// URI scheme of the object store.
pub const SCHEME: &str = "s3";

/// Fixed sub-namespace holding persisted `.scrapy` directories.
pub const STATE_SEGMENT: &str = "dot-scrapy";

/// Build the remote location for a spider's state directory.
///
/// Empty strings count as absent.
pub fn build_remote_path(
    bucket: &str,
    namespace: Option<&str>,
    project_id: Option<&str>,
    spider_name: &str,
) -> String {
    let prefix: Vec<&str> = [Some(bucket), namespace, project_id]
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty())
        .collect();
    format!(
        "{SCHEME}://{}/{STATE_SEGMENT}/{spider_name}/",
        prefix.join("/")
    )
}
