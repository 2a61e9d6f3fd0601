use std::path::Path;

use anyhow::Result;
use icsport_core::CheckpointStore;

pub fn run(file: &Path) -> Result<()> {
    let checkpoint = CheckpointStore::for_document(file);

    if checkpoint.clear()? {
        println!("Removed {}", checkpoint.path().display());
    } else {
        println!("No import progress recorded for {}", file.display());
    }

    Ok(())
}
