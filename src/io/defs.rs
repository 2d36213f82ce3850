// =#========================================================================#=
// FILE SUFFIXES
// =#========================================================================#=
pub(crate) const LCT_TREE: &str = ".lct.tree";
pub(crate) const LCT_RECON: &str = ".lct.recon";
pub(crate) const LCT_ORDER: &str = ".lct.order";

pub(crate) const COAL_TREE: &str = ".coal.tree";
pub(crate) const COAL_RECON: &str = ".coal.recon";
pub(crate) const LOCUS_TREE: &str = ".locus.tree";
pub(crate) const LOCUS_RECON: &str = ".locus.recon";
pub(crate) const DAUGHTERS: &str = ".daughters";

// =#========================================================================#=
// RECORDS
// =#========================================================================#=
/// Separator between the fields of a record line
pub(crate) const FIELD_SEPARATOR: char = '\t';
/// Separator between the gene names of an order list
pub(crate) const LIST_SEPARATOR: char = ',';
/// Characters a name in a record file must not contain
pub(crate) const RESERVED_CHARS: &[char] = &['\t', ',', '\n', '\r'];
