use serde::Deserialize;

use crabquery::{from_smiles, Atom, Bond, Mol, SmartsQueryTool};

fn parse(smiles: &str) -> Mol<Atom, Bond> {
    from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
}

#[derive(Deserialize)]
struct SmartsEntry {
    smiles: String,
    smarts: String,
    count: usize,
    unique: usize,
}

#[test]
fn approval_smarts_counts() {
    let data: Vec<SmartsEntry> =
        serde_json::from_str(include_str!("approval_data/smarts.json")).unwrap();

    let mut failures = Vec::new();
    for entry in &data {
        let mol = parse(&entry.smiles);
        let mut tool = match SmartsQueryTool::new(&entry.smarts) {
            Ok(t) => t,
            Err(e) => {
                failures.push(format!("[compile] {}: {e}", entry.smarts));
                continue;
            }
        };
        let found = match tool.matches(&mol) {
            Ok(found) => found,
            Err(e) => {
                failures.push(format!("[match] {} on {}: {e}", entry.smarts, entry.smiles));
                continue;
            }
        };

        if found != (entry.count > 0) {
            failures.push(format!(
                "[found] {} on {}: expected {}, got {found}",
                entry.smarts,
                entry.smiles,
                entry.count > 0
            ));
        }
        if tool.count_matches() != entry.count {
            failures.push(format!(
                "[count] {} on {}: expected {}, got {}",
                entry.smarts,
                entry.smiles,
                entry.count,
                tool.count_matches()
            ));
        }
        let unique = tool.unique_matching_atoms().len();
        if unique != entry.unique {
            failures.push(format!(
                "[unique] {} on {}: expected {}, got {unique}",
                entry.smarts, entry.smiles, entry.unique
            ));
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} of {} SMARTS approval checks failed:\n{}",
            failures.len(),
            data.len(),
            failures.join("\n")
        );
    }
}
