use std::path::PathBuf;

pub enum Command {
    /// Run an item search against a catalog file.
    Search {
        catalog: PathBuf,
        ids: Option<String>,
        collections: Option<String>,
        bbox: Option<String>,
        intersects: Option<String>,
        datetime: Option<String>,
        filter: Option<String>,
        filter_lang: Option<String>,
        count: bool,
    },
    /// Summarize a catalog: item count, collections, and filterable columns.
    Info { catalog: PathBuf },
    /// List the supported filter languages.
    Languages,
}
