use crate::cli::TableConvertArgs;
use crate::error::Result;
use fluctmatch::workflows::convert::convert_table_file;

pub fn run(args: TableConvertArgs) -> Result<()> {
    let table = convert_table_file(
        &args.cg_topology,
        &args.fm_topology,
        &args.table,
        &args.outfile,
    )?;
    println!(
        "✓ {} rows relabelled and written to {}",
        table.n_rows(),
        args.outfile.display()
    );
    Ok(())
}
