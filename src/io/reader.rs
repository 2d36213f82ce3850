//! Readers for the record files of persisted reconciliations.
//!
//! Names in the records are resolved against the trees read before, so a
//! record naming an unknown vertex is a [ReconError::Format] error. Empty
//! lines are skipped.

use crate::error::{ReconError, Result};
use crate::io::defs::{FIELD_SEPARATOR, LIST_SEPARATOR};
use crate::model::{Locus, LocusEvent, OrderKey, Tree, VertexIndex};
use crate::newick;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, BufReader, Read};

/// Reads a single Newick tree.
pub fn read_tree<R: Read>(mut input: R) -> Result<Tree> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    Ok(newick::parse_str(text.trim())?)
}

/// Reads `gene<TAB>species<TAB>locus` records into a species and a locus map.
///
/// # Errors
/// [ReconError::Format] if a record is malformed, names an unknown vertex,
/// or some gene vertex has no record.
pub fn read_labeled_recon<R: Read>(
    input: R,
    gene_tree: &Tree,
    species_tree: &Tree,
) -> Result<(Vec<VertexIndex>, Vec<Locus>)> {
    let n = gene_tree.num_vertices();
    let mut species_map = vec![None; n];
    let mut locus_map = vec![None; n];
    for_each_record(input, 3, |fields| {
        let g = lookup(gene_tree, fields[0], "gene")?;
        species_map[g] = Some(lookup(species_tree, fields[1], "species")?);
        locus_map[g] = Some(parse_locus(fields[2])?);
        Ok(())
    })?;
    Ok((complete(species_map, gene_tree)?, complete(locus_map, gene_tree)?))
}

/// Reads `species<TAB>locus<TAB>g1,g2,...` records into order lists.
pub fn read_order<R: Read>(
    input: R,
    gene_tree: &Tree,
    species_tree: &Tree,
) -> Result<BTreeMap<OrderKey, Vec<VertexIndex>>> {
    let mut order = BTreeMap::new();
    for_each_record(input, 3, |fields| {
        let species = lookup(species_tree, fields[0], "species")?;
        let locus = parse_locus(fields[1])?;
        let list = fields[2]
            .split(LIST_SEPARATOR)
            .filter(|name| !name.is_empty())
            .map(|name| lookup(gene_tree, name, "gene"))
            .collect::<Result<Vec<_>>>()?;
        if order.insert((species, locus), list).is_some() {
            return Err(ReconError::format(format!(
                "order of species {} and locus {locus} given twice",
                fields[0]
            )));
        }
        Ok(())
    })?;
    Ok(order)
}

/// Reads `coal<TAB>locus` records into a coalescent-to-locus map.
pub fn read_coal_recon<R: Read>(input: R, coal_tree: &Tree, locus_tree: &Tree) -> Result<Vec<VertexIndex>> {
    let mut coal_recon = vec![None; coal_tree.num_vertices()];
    for_each_record(input, 2, |fields| {
        let c = lookup(coal_tree, fields[0], "coalescent")?;
        coal_recon[c] = Some(lookup(locus_tree, fields[1], "locus")?);
        Ok(())
    })?;
    complete(coal_recon, coal_tree)
}

/// Reads `locus<TAB>species<TAB>event` records.
pub fn read_locus_recon<R: Read>(
    input: R,
    locus_tree: &Tree,
    species_tree: &Tree,
) -> Result<(Vec<VertexIndex>, Vec<LocusEvent>)> {
    let n = locus_tree.num_vertices();
    let mut locus_recon = vec![None; n];
    let mut locus_events = vec![None; n];
    for_each_record(input, 3, |fields| {
        let x = lookup(locus_tree, fields[0], "locus")?;
        locus_recon[x] = Some(lookup(species_tree, fields[1], "species")?);
        locus_events[x] = Some(fields[2].parse::<LocusEvent>()?);
        Ok(())
    })?;
    Ok((complete(locus_recon, locus_tree)?, complete(locus_events, locus_tree)?))
}

/// Reads one daughter name per line.
pub fn read_daughters<R: Read>(input: R, locus_tree: &Tree) -> Result<BTreeSet<VertexIndex>> {
    let mut daughters = BTreeSet::new();
    for_each_record(input, 1, |fields| {
        daughters.insert(lookup(locus_tree, fields[0], "locus")?);
        Ok(())
    })?;
    Ok(daughters)
}

// ============================================================================
// Helpers (private)
// ============================================================================
/// Calls `f` on the fields of every non-empty line.
fn for_each_record<R, F>(input: R, num_fields: usize, mut f: F) -> Result<()>
where
    R: Read,
    F: FnMut(&[&str]) -> Result<()>,
{
    for (i, line) in BufReader::new(input).lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != num_fields {
            return Err(ReconError::format(format!(
                "line {}: expected {num_fields} fields, found {}",
                i + 1,
                fields.len()
            )));
        }
        f(&fields)?;
    }
    Ok(())
}

fn lookup(tree: &Tree, name: &str, kind: &str) -> Result<VertexIndex> {
    tree.find(name)
        .ok_or_else(|| ReconError::format(format!("unknown {kind} vertex {name:?}")))
}

fn parse_locus(field: &str) -> Result<Locus> {
    field
        .parse()
        .map_err(|_| ReconError::format(format!("invalid locus {field:?}")))
}

/// Unwraps a per-vertex table, failing on the first vertex without a record.
fn complete<T>(table: Vec<Option<T>>, tree: &Tree) -> Result<Vec<T>> {
    table
        .into_iter()
        .enumerate()
        .map(|(v, entry)| entry.ok_or_else(|| ReconError::format(format!("no record for vertex {}", tree.name(v)))))
        .collect()
}
