use crate::cli::DiffArgs;
use crate::error::Result;
use fluctmatch::workflows::diff::{COUPLING_FILE, INTERACTIONS_FILE, PER_RESIDUE_FILE, diff_tables};

pub fn run(args: DiffArgs) -> Result<()> {
    let difference = diff_tables(&args.table1, &args.table2, args.ressep, &args.outdir)?;
    println!(
        "✓ {} bonds compared; wrote {}, {} and {} to {}",
        difference.coupling.table().n_rows(),
        COUPLING_FILE,
        PER_RESIDUE_FILE,
        INTERACTIONS_FILE,
        args.outdir.display()
    );
    Ok(())
}
