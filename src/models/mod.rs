mod site_root;
mod snapshot;
mod url_collection;

pub use site_root::SiteRoot;
pub use snapshot::{group_by_site, Page, Snapshot, SnapshotSummary, SnapshotView};
pub use url_collection::UrlCollection;
