//! Writer for the record files of persisted reconciliations.

use crate::error::{ReconError, Result};
use crate::io::defs::{FIELD_SEPARATOR, LIST_SEPARATOR, RESERVED_CHARS};
use crate::model::{LabeledRecon, Recon, Tree};
use crate::newick::{NewickStyle, to_newick};
use std::io::Write;

// =#========================================================================#=
// RECON WRITER
// =#========================================================================#=
/// Writer for one part of a persisted reconciliation.
///
/// Every `write_*` method returns the writer again, so parts can be chained
/// onto one output (as in the tests) or written to separate files.
///
/// # Example
/// ```
/// use dlcrecon::io::ReconWriter;
/// use dlcrecon::newick::parse_str;
///
/// let tree = parse_str("((a,b)ab,c)r;")?;
/// let mut writer = ReconWriter::new(Vec::new());
/// writer.write_tree(&tree)?;
/// assert_eq!(writer.into_inner(), b"((a,b)ab,c)r;\n");
/// # Ok::<(), dlcrecon::error::ReconError>(())
/// ```
pub struct ReconWriter<W: Write> {
    out: W,
}

// ============================================================================
// API (public)
// ============================================================================
impl<W: Write> ReconWriter<W> {
    /// Creates a writer on the given output.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying output.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Flushes the underlying output.
    pub fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Writes a tree as one Newick line including internal names.
    pub fn write_tree(&mut self, tree: &Tree) -> Result<&mut Self> {
        self.out.write_all(to_newick(tree, NewickStyle::Internal, true).as_bytes())?;
        self.newline()
    }

    /// Writes `gene<TAB>species<TAB>locus` for every gene vertex, in pre-order.
    pub fn write_labeled_recon(
        &mut self,
        gene_tree: &Tree,
        labeled: &LabeledRecon,
        species_tree: &Tree,
    ) -> Result<&mut Self> {
        for g in gene_tree.pre_order() {
            let locus = labeled.locus_map[g].to_string();
            self.record(&[
                gene_tree.name(g),
                species_tree.name(labeled.species_map[g]),
                &locus,
            ])?;
        }
        self.flush()
    }

    /// Writes `species<TAB>locus<TAB>g1,g2,...` for every order list.
    pub fn write_order(&mut self, gene_tree: &Tree, labeled: &LabeledRecon, species_tree: &Tree) -> Result<&mut Self> {
        for (&(species, locus), list) in &labeled.order {
            let names: Vec<&str> = list.iter().map(|&g| gene_tree.name(g)).collect();
            for name in &names {
                check_name(name)?;
            }
            let locus = locus.to_string();
            let joined = names.join(&LIST_SEPARATOR.to_string());
            self.record(&[species_tree.name(species), &locus, &joined])?;
        }
        self.flush()
    }

    /// Writes `coal<TAB>locus` for every coalescent vertex, in pre-order.
    pub fn write_coal_recon(&mut self, coal_tree: &Tree, recon: &Recon) -> Result<&mut Self> {
        for c in coal_tree.pre_order() {
            self.record(&[coal_tree.name(c), recon.locus_tree.name(recon.coal_recon[c])])?;
        }
        self.flush()
    }

    /// Writes `locus<TAB>species<TAB>event` for every locus vertex, in pre-order.
    pub fn write_locus_recon(&mut self, recon: &Recon, species_tree: &Tree) -> Result<&mut Self> {
        for x in recon.locus_tree.pre_order() {
            let event = recon.locus_events[x].to_string();
            self.record(&[
                recon.locus_tree.name(x),
                species_tree.name(recon.locus_recon[x]),
                &event,
            ])?;
        }
        self.flush()
    }

    /// Writes one daughter name per line.
    pub fn write_daughters(&mut self, recon: &Recon) -> Result<&mut Self> {
        for &d in &recon.daughters {
            self.record(&[recon.locus_tree.name(d)])?;
        }
        self.flush()
    }
}

// ============================================================================
// Record writing (private)
// ============================================================================
impl<W: Write> ReconWriter<W> {
    /// Writes a tab separated record line.
    fn record(&mut self, fields: &[&str]) -> Result<&mut Self> {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                write!(self.out, "{FIELD_SEPARATOR}")?;
            }
            if field.contains(['\t', '\n', '\r']) {
                return Err(ReconError::format(format!("name {field:?} contains a separator")));
            }
            self.out.write_all(field.as_bytes())?;
        }
        self.newline()
    }

    fn newline(&mut self) -> Result<&mut Self> {
        self.out.write_all(b"\n")?;
        Ok(self)
    }

    fn flush(&mut self) -> Result<&mut Self> {
        self.out.flush()?;
        Ok(self)
    }
}

/// Rejects names that cannot be stored in a record list.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(RESERVED_CHARS) {
        Err(ReconError::format(format!("name {name:?} cannot be stored in an order list")))
    } else {
        Ok(())
    }
}
