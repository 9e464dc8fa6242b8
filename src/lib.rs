pub mod annotate;
pub mod aromaticity;
pub mod atom;
pub mod bind;
pub mod bond;
pub mod element;
pub mod matcher;
pub mod mol;
pub mod resolve;
pub mod rings;
pub mod smarts;
pub mod smiles;
pub mod tool;
pub mod traits;

pub use annotate::{
    annotate, Annotations, AnnotatorConfig, AtomAnnotation, BondAnnotation, PerceptionError,
};
pub use aromaticity::{detect_aromaticity, Aromaticity, AromaticityError};
pub use atom::Atom;
pub use bind::{bind, Bindings, MatchContext};
pub use bond::{Bond, BondOrder};
pub use element::Element;
pub use matcher::{find_all, single_atom_matches, BondMapping};
pub use mol::Mol;
pub use resolve::{resolve, unique_of, AtomMapping};
pub use rings::{all_rings, sssr, RingPerceptionError, RingSet};
pub use smarts::{compile, AtomExpr, BondExpr, QueryGraph, SmartsError};
pub use smiles::{from_smiles, SmilesError};
pub use tool::{QueryError, SmartsQueryTool};
pub use traits::{HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount};
