//! Persisted reconciliations as prefix-based file sets.
//!
//! # Labeled form
//! * `<prefix>.lct.tree` - gene tree in Newick, internal names included
//! * `<prefix>.lct.recon` - `gene<TAB>species<TAB>locus` per gene vertex
//! * `<prefix>.lct.order` - `species<TAB>locus<TAB>g1,g2,...` per order list
//!
//! # Three-tree form
//! * `<prefix>.coal.tree` - coalescent tree
//! * `<prefix>.coal.recon` - `coal<TAB>locus` per coalescent vertex
//! * `<prefix>.locus.tree` - locus tree
//! * `<prefix>.locus.recon` - `locus<TAB>species<TAB>event` per locus vertex,
//!   with event one of `spec`, `dup`, `gene`
//! * `<prefix>.daughters` - one daughter name per line
//!
//! The parts can also be written to and read from any [std::io::Write] /
//! [std::io::Read] with [ReconWriter] and the `read_*` functions.

mod defs;
pub mod reader;
pub mod writer;

pub use self::reader::{
    read_coal_recon, read_daughters, read_labeled_recon, read_locus_recon, read_order, read_tree,
};
pub use self::writer::ReconWriter;

use crate::error::Result;
use crate::model::{LabeledRecon, Recon, Tree};
use defs::{COAL_RECON, COAL_TREE, DAUGHTERS, LCT_ORDER, LCT_RECON, LCT_TREE, LOCUS_RECON, LOCUS_TREE};
use log::debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

/// Appends a suffix to a path prefix.
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = prefix.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

fn create(prefix: &Path, suffix: &str) -> Result<ReconWriter<BufWriter<File>>> {
    let path = with_suffix(prefix, suffix);
    debug!("writing {}", path.display());
    Ok(ReconWriter::new(BufWriter::new(File::create(path)?)))
}

fn open(prefix: &Path, suffix: &str) -> Result<impl Read> {
    let path = with_suffix(prefix, suffix);
    debug!("reading {}", path.display());
    Ok(BufReader::new(File::open(path)?))
}

// ============================================================================
// Labeled form (pub)
// ============================================================================
/// Writes a labeled reconciliation to `<prefix>.lct.*`.
///
/// # Example
/// ```no_run
/// use dlcrecon::io::{read_labeled_files, write_labeled_files};
/// # use dlcrecon::model::{LabeledRecon, Tree};
/// # fn run(gene_tree: &Tree, labeled: &LabeledRecon, species_tree: &Tree) -> dlcrecon::error::Result<()> {
/// write_labeled_files("out/family1", gene_tree, labeled, species_tree)?;
/// let (tree, recon) = read_labeled_files("out/family1", species_tree)?;
/// assert_eq!(tree.num_vertices(), recon.species_map.len());
/// # Ok(())
/// # }
/// ```
pub fn write_labeled_files<P: AsRef<Path>>(
    prefix: P,
    gene_tree: &Tree,
    labeled: &LabeledRecon,
    species_tree: &Tree,
) -> Result<()> {
    let prefix = prefix.as_ref();
    create(prefix, LCT_TREE)?.write_tree(gene_tree)?.finish()?;
    create(prefix, LCT_RECON)?
        .write_labeled_recon(gene_tree, labeled, species_tree)?
        .finish()?;
    create(prefix, LCT_ORDER)?
        .write_order(gene_tree, labeled, species_tree)?
        .finish()?;
    Ok(())
}

/// Reads a labeled reconciliation from `<prefix>.lct.*`.
pub fn read_labeled_files<P: AsRef<Path>>(prefix: P, species_tree: &Tree) -> Result<(Tree, LabeledRecon)> {
    let prefix = prefix.as_ref();
    let gene_tree = read_tree(open(prefix, LCT_TREE)?)?;
    let (species_map, locus_map) = read_labeled_recon(open(prefix, LCT_RECON)?, &gene_tree, species_tree)?;
    let order = read_order(open(prefix, LCT_ORDER)?, &gene_tree, species_tree)?;
    let labeled = LabeledRecon::new(species_map, locus_map, order);
    labeled.validate(&gene_tree, species_tree)?;
    Ok((gene_tree, labeled))
}

// ============================================================================
// Three-tree form (pub)
// ============================================================================
/// Writes a three-tree reconciliation to `<prefix>.coal.*`, `<prefix>.locus.*`
/// and `<prefix>.daughters`.
pub fn write_recon_files<P: AsRef<Path>>(
    prefix: P,
    coal_tree: &Tree,
    recon: &Recon,
    species_tree: &Tree,
) -> Result<()> {
    let prefix = prefix.as_ref();
    create(prefix, COAL_TREE)?.write_tree(coal_tree)?.finish()?;
    create(prefix, COAL_RECON)?.write_coal_recon(coal_tree, recon)?.finish()?;
    create(prefix, LOCUS_TREE)?.write_tree(&recon.locus_tree)?.finish()?;
    create(prefix, LOCUS_RECON)?
        .write_locus_recon(recon, species_tree)?
        .finish()?;
    create(prefix, DAUGHTERS)?.write_daughters(recon)?.finish()?;
    Ok(())
}

/// Reads a three-tree reconciliation written by [write_recon_files].
pub fn read_recon_files<P: AsRef<Path>>(prefix: P, species_tree: &Tree) -> Result<(Tree, Recon)> {
    let prefix = prefix.as_ref();
    let coal_tree = read_tree(open(prefix, COAL_TREE)?)?;
    let locus_tree = read_tree(open(prefix, LOCUS_TREE)?)?;
    let coal_recon = read_coal_recon(open(prefix, COAL_RECON)?, &coal_tree, &locus_tree)?;
    let (locus_recon, locus_events) = read_locus_recon(open(prefix, LOCUS_RECON)?, &locus_tree, species_tree)?;
    let daughters = read_daughters(open(prefix, DAUGHTERS)?, &locus_tree)?;
    let recon = Recon {
        locus_tree,
        locus_recon,
        locus_events,
        coal_recon,
        daughters,
    };
    recon.validate(&coal_tree, species_tree)?;
    Ok((coal_tree, recon))
}
