/// Atom type for target molecular graphs.
///
/// `Atom` stores the intrinsic properties read off a structural formula.
/// Everything a SMARTS query needs beyond these (ring membership, total
/// hydrogen count, perceived aromaticity, ...) is derived by
/// [`annotate`](crate::annotate::annotate) into a side table; the atom itself
/// is never rewritten during matching.
///
/// # Examples
///
/// ```
/// use crabquery::Atom;
///
/// let carbon = Atom {
///     atomic_num: 6,
///     hydrogen_count: 3,
///     ..Atom::default()
/// };
/// assert_eq!(carbon.atomic_num, 6);
/// assert!(!carbon.is_aromatic);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atom {
    /// Atomic number (1 = H, 6 = C, 7 = N, …). `0` is a wildcard/dummy atom.
    pub atomic_num: u8,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Mass number. `0` means natural isotopic abundance.
    pub isotope: u16,
    /// Number of implicit hydrogens carried by this atom.
    ///
    /// These are not graph nodes. Hydrogens written as their own atoms
    /// (`[H]` in SMILES) are neighbors instead and are counted separately.
    pub hydrogen_count: u8,
    /// Aromatic flag as written in the input (lowercase SMILES symbol).
    ///
    /// Query evaluation uses the perceived aromaticity from the annotation
    /// table, not this flag.
    pub is_aromatic: bool,
}

impl crate::traits::HasAtomicNum for Atom {
    fn atomic_num(&self) -> u8 {
        self.atomic_num
    }
}

impl crate::traits::HasFormalCharge for Atom {
    fn formal_charge(&self) -> i8 {
        self.formal_charge
    }
}

impl crate::traits::HasHydrogenCount for Atom {
    fn hydrogen_count(&self) -> u8 {
        self.hydrogen_count
    }
}
