pub mod bondstats;
pub mod diff;
pub mod models;
pub mod run;
pub mod setup;
pub mod splittraj;
pub mod table_convert;
pub mod thermo;

use std::path::Path;

/// Title lines recording the program version and the input files.
pub(crate) fn provenance_title(inputs: &[(&str, &Path)]) -> Vec<String> {
    let mut title = vec![format!("Created by fluctmatch {}", env!("CARGO_PKG_VERSION"))];
    title.extend(
        inputs
            .iter()
            .map(|(label, path)| format!("{}: {}", label, path.display())),
    );
    title
}
