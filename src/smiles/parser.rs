use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::element::Element;
use crate::mol::Mol;

use super::error::SmilesError;

struct RingOpening {
    atom: NodeIndex,
    order: Option<BondOrder>,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    mol: Mol<Atom, Bond>,
    /// Per atom: written in brackets, so its hydrogen count is explicit.
    bracketed: Vec<bool>,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            mol: Mol::new(),
            bracketed: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos > start {
            let s: String = self.chars[start..self.pos].iter().collect();
            s.parse().ok()
        } else {
            None
        }
    }

    fn parse(mut self) -> Result<Mol<Atom, Bond>, SmilesError> {
        let mut branches: Vec<NodeIndex> = Vec::new();
        let mut current: Option<NodeIndex> = None;
        let mut pending: Option<BondOrder> = None;
        let mut rings: HashMap<u16, RingOpening> = HashMap::new();

        while let Some(ch) = self.peek() {
            match ch {
                '(' => {
                    let cur = current.ok_or(SmilesError::UnmatchedParen { pos: self.pos })?;
                    branches.push(cur);
                    self.pos += 1;
                }
                ')' => {
                    if pending.is_some() {
                        return Err(SmilesError::UnexpectedChar { pos: self.pos, ch });
                    }
                    current =
                        Some(branches.pop().ok_or(SmilesError::UnmatchedParen { pos: self.pos })?);
                    self.pos += 1;
                }
                '.' => {
                    if pending.is_some() {
                        return Err(SmilesError::UnexpectedChar { pos: self.pos, ch });
                    }
                    current = None;
                    self.pos += 1;
                }
                '-' | '=' | '#' | ':' | '/' | '\\' => {
                    if pending.is_some() || current.is_none() {
                        return Err(SmilesError::UnexpectedChar { pos: self.pos, ch });
                    }
                    pending = Some(bond_order(ch));
                    self.pos += 1;
                }
                '0'..='9' | '%' => {
                    let pos = self.pos;
                    let digit = self.parse_ring_digit()?;
                    let cur = current.ok_or(SmilesError::InvalidRingBond { digit, pos })?;
                    match rings.remove(&digit) {
                        Some(opening) => {
                            let order = match (pending.take(), opening.order) {
                                (Some(a), Some(b)) if a != b => {
                                    return Err(SmilesError::RingBondConflict { digit });
                                }
                                (a, b) => a.or(b),
                            };
                            let duplicate = opening.atom == cur
                                || self.mol.bond_between(opening.atom, cur).is_some();
                            if duplicate {
                                return Err(SmilesError::InvalidRingBond { digit, pos });
                            }
                            self.connect(opening.atom, cur, order);
                        }
                        None => {
                            rings.insert(
                                digit,
                                RingOpening {
                                    atom: cur,
                                    order: pending.take(),
                                },
                            );
                        }
                    }
                }
                _ => {
                    let idx = if ch == '[' {
                        self.parse_bracket_atom()?
                    } else {
                        self.parse_bare_atom()?
                    };
                    if let Some(prev) = current {
                        self.connect(prev, idx, pending.take());
                    }
                    current = Some(idx);
                }
            }
        }

        if pending.is_some() {
            return Err(SmilesError::UnexpectedEnd);
        }
        if !branches.is_empty() {
            return Err(SmilesError::UnmatchedParen { pos: self.pos });
        }
        if let Some(&digit) = rings.keys().min() {
            return Err(SmilesError::UnclosedRing { digit });
        }

        self.assign_implicit_hydrogens();
        Ok(self.mol)
    }

    fn connect(&mut self, a: NodeIndex, b: NodeIndex, order: Option<BondOrder>) {
        let order = order.unwrap_or_else(|| {
            if self.mol.atom(a).is_aromatic && self.mol.atom(b).is_aromatic {
                BondOrder::Aromatic
            } else {
                BondOrder::Single
            }
        });
        self.mol.add_bond(a, b, Bond::new(order));
    }

    fn parse_ring_digit(&mut self) -> Result<u16, SmilesError> {
        let start = self.pos;
        if self.peek() == Some('%') {
            match (self.peek_at(1), self.peek_at(2)) {
                (Some(d1), Some(d2)) if d1.is_ascii_digit() && d2.is_ascii_digit() => {
                    self.pos += 3;
                    Ok((d1 as u16 - '0' as u16) * 10 + (d2 as u16 - '0' as u16))
                }
                _ => Err(SmilesError::UnexpectedChar { pos: start, ch: '%' }),
            }
        } else {
            let d = self.chars[start] as u16 - '0' as u16;
            self.pos += 1;
            Ok(d)
        }
    }

    fn add(&mut self, atom: Atom, bracketed: bool) -> NodeIndex {
        self.bracketed.push(bracketed);
        self.mol.add_atom(atom)
    }

    fn parse_bare_atom(&mut self) -> Result<NodeIndex, SmilesError> {
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Err(SmilesError::UnexpectedEnd);
        };

        if ch == '*' {
            self.pos += 1;
            return Ok(self.add(Atom::default(), false));
        }

        let (element, aromatic, len) = match (ch, self.peek_at(1)) {
            ('B', Some('r')) => (Element::Br, false, 2),
            ('C', Some('l')) => (Element::Cl, false, 2),
            ('B', _) => (Element::B, false, 1),
            ('C', _) => (Element::C, false, 1),
            ('N', _) => (Element::N, false, 1),
            ('O', _) => (Element::O, false, 1),
            ('P', _) => (Element::P, false, 1),
            ('S', _) => (Element::S, false, 1),
            ('F', _) => (Element::F, false, 1),
            ('I', _) => (Element::I, false, 1),
            ('b', _) => (Element::B, true, 1),
            ('c', _) => (Element::C, true, 1),
            ('n', _) => (Element::N, true, 1),
            ('o', _) => (Element::O, true, 1),
            ('p', _) => (Element::P, true, 1),
            ('s', _) => (Element::S, true, 1),
            _ => return Err(SmilesError::UnexpectedChar { pos: start, ch }),
        };
        self.pos += len;

        let atom = Atom {
            atomic_num: element.atomic_num(),
            is_aromatic: aromatic,
            ..Atom::default()
        };
        Ok(self.add(atom, false))
    }

    fn parse_bracket_atom(&mut self) -> Result<NodeIndex, SmilesError> {
        let start = self.pos;
        self.pos += 1;

        let isotope = match self.parse_number() {
            Some(n) => u16::try_from(n).map_err(|_| SmilesError::UnexpectedChar {
                pos: start + 1,
                ch: self.chars[start + 1],
            })?,
            None => 0,
        };

        let (atomic_num, is_aromatic) = self.parse_bracket_element()?;

        // Stereo marks are accepted and dropped.
        while self.peek() == Some('@') {
            self.pos += 1;
        }

        let hydrogen_count = if self.peek() == Some('H') {
            self.pos += 1;
            self.parse_number().map_or(1, |n| n.min(u8::MAX as u32) as u8)
        } else {
            0
        };

        let formal_charge = self.parse_charge()?;

        if self.peek() == Some(':') {
            self.pos += 1;
            self.parse_number();
        }

        if self.peek() != Some(']') {
            return Err(SmilesError::UnclosedBracket { pos: start });
        }
        self.pos += 1;

        let atom = Atom {
            atomic_num,
            formal_charge,
            isotope,
            hydrogen_count,
            is_aromatic,
        };
        Ok(self.add(atom, true))
    }

    fn parse_bracket_element(&mut self) -> Result<(u8, bool), SmilesError> {
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Err(SmilesError::UnexpectedEnd);
        };

        if ch == '*' {
            self.pos += 1;
            return Ok((0, false));
        }

        if ch.is_ascii_lowercase() {
            for (sym, elem) in [
                ("se", Element::Se),
                ("as", Element::As),
                ("te", Element::Te),
                ("b", Element::B),
                ("c", Element::C),
                ("n", Element::N),
                ("o", Element::O),
                ("p", Element::P),
                ("s", Element::S),
            ] {
                if self.lookahead_is(sym) {
                    self.pos += sym.len();
                    return Ok((elem.atomic_num(), true));
                }
            }
            return Err(SmilesError::InvalidElement {
                pos: start,
                text: ch.to_string(),
            });
        }

        if ch.is_ascii_uppercase() {
            if let Some(next) = self.peek_at(1).filter(|c| c.is_ascii_lowercase()) {
                if let Some(elem) = Element::from_symbol(&format!("{ch}{next}")) {
                    self.pos += 2;
                    return Ok((elem.atomic_num(), false));
                }
            }
            if let Some(elem) = Element::from_symbol(&ch.to_string()) {
                self.pos += 1;
                return Ok((elem.atomic_num(), false));
            }
        }

        Err(SmilesError::InvalidElement {
            pos: start,
            text: ch.to_string(),
        })
    }

    fn lookahead_is(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn parse_charge(&mut self) -> Result<i8, SmilesError> {
        let sign: i8 = match self.peek() {
            Some('+') => 1,
            Some('-') => -1,
            _ => return Ok(0),
        };
        let start = self.pos;
        let symbol = self.chars[start];
        self.pos += 1;

        if let Some(n) = self.parse_number() {
            let magnitude = i8::try_from(n).map_err(|_| SmilesError::InvalidCharge { pos: start })?;
            return Ok(sign * magnitude);
        }

        let mut magnitude: i8 = 1;
        while self.peek() == Some(symbol) {
            magnitude = magnitude
                .checked_add(1)
                .ok_or(SmilesError::InvalidCharge { pos: start })?;
            self.pos += 1;
        }
        Ok(sign * magnitude)
    }

    fn assign_implicit_hydrogens(&mut self) {
        let atoms: Vec<NodeIndex> = self.mol.atoms().collect();
        for idx in atoms {
            if self.bracketed[idx.index()] {
                continue;
            }
            let h = implicit_hydrogens(&self.mol, idx);
            self.mol.atom_mut(idx).hydrogen_count = h;
        }
    }
}

fn bond_order(ch: char) -> BondOrder {
    match ch {
        '=' => BondOrder::Double,
        '#' => BondOrder::Triple,
        ':' => BondOrder::Aromatic,
        _ => BondOrder::Single,
    }
}

/// Implicit hydrogens of an organic-subset atom: the lowest default valence
/// that accommodates its bonds, minus the bond valence sum. An aromatic atom
/// gives one of those hydrogens up to the pi system.
fn implicit_hydrogens(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> u8 {
    let atom = mol.atom(idx);
    let Some(element) = Element::from_atomic_num(atom.atomic_num) else {
        return 0;
    };

    let bond_sum: u8 = mol
        .bonds_of(idx)
        .map(|e| mol.bond(e).order.valence())
        .fold(0u8, |acc, v| acc.saturating_add(v));

    let Some(&target) = element.default_valences().iter().find(|&&v| v >= bond_sum) else {
        return 0;
    };

    let h = target - bond_sum;
    if atom.is_aromatic && h > 0 { h - 1 } else { h }
}

pub(crate) fn parse(input: &str) -> Result<Mol<Atom, Bond>, SmilesError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    Parser::new(trimmed).parse()
}
