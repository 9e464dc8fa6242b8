use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::element::Element;

use super::error::SmartsError;
use super::query::{
    AtomExpr, AtomPrimitive, BondExpr, BondPrimitive, QueryGraph, RecursivePattern,
};

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn expect(&mut self, ch: char) -> Result<(), SmartsError> {
        match self.peek() {
            Some(c) if c == ch => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(SmartsError::UnexpectedChar { pos: self.pos, ch: c }),
            None => Err(SmartsError::InvalidSmarts {
                pos: self.pos,
                msg: format!("expected '{ch}', got end of input"),
            }),
        }
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

    /// Optional count after a primitive symbol, `default` when absent.
    fn parse_count(&mut self, default: u8) -> Result<u8, SmartsError> {
        let start = self.pos;
        match self.parse_number() {
            None => Ok(default),
            Some(n) => u8::try_from(n).map_err(|_| SmartsError::InvalidSmarts {
                pos: start,
                msg: format!("count {n} out of range"),
            }),
        }
    }

    fn lookahead_is(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn parse_smarts(&mut self) -> Result<QueryGraph, SmartsError> {
        let mut mol = QueryGraph::new();
        let mut stack: Vec<(NodeIndex, Option<BondExpr>)> = Vec::new();
        let mut current: Option<NodeIndex> = None;
        let mut pending_bond: Option<BondExpr> = None;
        let mut ring_map: HashMap<u16, (NodeIndex, Option<BondExpr>)> = HashMap::new();

        while let Some(ch) = self.peek() {
            match ch {
                '(' => {
                    let cur = current.ok_or(SmartsError::UnmatchedParen { pos: self.pos })?;
                    stack.push((cur, pending_bond.take()));
                    self.pos += 1;
                }
                ')' => {
                    let (prev, saved_bond) =
                        stack.pop().ok_or(SmartsError::UnmatchedParen { pos: self.pos })?;
                    current = Some(prev);
                    pending_bond = saved_bond;
                    self.pos += 1;
                }
                '.' => {
                    self.pos += 1;
                    current = None;
                    pending_bond = None;
                }
                '/' | '\\' => {
                    return Err(SmartsError::Unsupported {
                        pos: self.pos,
                        feature: "directional bond",
                    });
                }
                '-' | '=' | '#' | '~' | ':' | '@' | '!' => {
                    if current.is_none() {
                        return Err(SmartsError::UnexpectedChar { pos: self.pos, ch });
                    }
                    if pending_bond.is_some() {
                        return Err(SmartsError::InvalidSmarts {
                            pos: self.pos,
                            msg: "consecutive bond expressions".into(),
                        });
                    }
                    pending_bond = Some(self.parse_bond_expr()?);
                }
                '0'..='9' | '%' => {
                    let pos = self.pos;
                    let digit = self.parse_ring_closure()?;
                    let cur = current.ok_or_else(|| SmartsError::InvalidSmarts {
                        pos,
                        msg: "ring closure without preceding atom".into(),
                    })?;
                    match ring_map.remove(&digit) {
                        Some((other, saved_bond)) => {
                            if other == cur || mol.bond_between(other, cur).is_some() {
                                return Err(SmartsError::InvalidSmarts {
                                    pos,
                                    msg: format!("ring closure {digit} duplicates a bond"),
                                });
                            }
                            let bond = pending_bond.take().or(saved_bond).unwrap_or_default();
                            mol.add_bond(other, cur, bond);
                        }
                        None => {
                            ring_map.insert(digit, (cur, pending_bond.take()));
                        }
                    }
                }
                _ => {
                    let atom_expr = if ch == '[' {
                        self.parse_bracket_atom()?
                    } else {
                        self.parse_bare_atom()?
                    };
                    let idx = mol.add_atom(atom_expr);
                    if let Some(prev) = current {
                        mol.add_bond(prev, idx, pending_bond.take().unwrap_or_default());
                    }
                    current = Some(idx);
                }
            }
        }

        if pending_bond.is_some() {
            return Err(SmartsError::InvalidSmarts {
                pos: self.pos,
                msg: "bond without a following atom".into(),
            });
        }

        if !stack.is_empty() {
            return Err(SmartsError::UnmatchedParen { pos: self.pos });
        }

        if let Some(&digit) = ring_map.keys().min() {
            return Err(SmartsError::UnclosedRing { digit });
        }

        Ok(mol)
    }

    fn parse_ring_closure(&mut self) -> Result<u16, SmartsError> {
        let start = self.pos;
        if self.peek() == Some('%') {
            match (self.peek_at(1), self.peek_at(2)) {
                (Some(d1), Some(d2)) if d1.is_ascii_digit() && d2.is_ascii_digit() => {
                    self.pos += 3;
                    Ok((d1 as u16 - '0' as u16) * 10 + (d2 as u16 - '0' as u16))
                }
                _ => Err(SmartsError::InvalidSmarts {
                    pos: start,
                    msg: "expected two digits after %".into(),
                }),
            }
        } else {
            let d = self.chars[start] as u16 - '0' as u16;
            self.pos += 1;
            Ok(d)
        }
    }

    // Bond expressions share the atom operator precedence: `!` binds
    // tightest, then `&` (or juxtaposition), then `,`, then `;`.

    fn parse_bond_expr(&mut self) -> Result<BondExpr, SmartsError> {
        let mut expr = self.parse_bond_or()?;
        while self.peek() == Some(';') {
            self.pos += 1;
            let rhs = self.parse_bond_or()?;
            expr = BondExpr::and(expr, rhs);
        }
        Ok(expr)
    }

    fn parse_bond_or(&mut self) -> Result<BondExpr, SmartsError> {
        let mut expr = self.parse_bond_and()?;
        while self.peek() == Some(',') {
            self.pos += 1;
            let rhs = self.parse_bond_and()?;
            expr = BondExpr::or(expr, rhs);
        }
        Ok(expr)
    }

    fn parse_bond_and(&mut self) -> Result<BondExpr, SmartsError> {
        let mut expr = self.parse_bond_not()?;
        loop {
            match self.peek() {
                Some('&') => {
                    self.pos += 1;
                    let rhs = self.parse_bond_not()?;
                    expr = BondExpr::and(expr, rhs);
                }
                Some(c) if is_bond_symbol(c) => {
                    let rhs = self.parse_bond_not()?;
                    expr = BondExpr::and(expr, rhs);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_bond_not(&mut self) -> Result<BondExpr, SmartsError> {
        if self.peek() == Some('!') {
            self.pos += 1;
            return Ok(BondExpr::not(self.parse_bond_not()?));
        }
        self.parse_bond_primitive()
    }

    fn parse_bond_primitive(&mut self) -> Result<BondExpr, SmartsError> {
        let pos = self.pos;
        let Some(ch) = self.peek() else {
            return Err(SmartsError::InvalidSmarts {
                pos,
                msg: "expected bond primitive".into(),
            });
        };
        let prim = match ch {
            '-' => BondPrimitive::Single,
            '=' => BondPrimitive::Double,
            '#' => BondPrimitive::Triple,
            '~' => BondPrimitive::Any,
            ':' => BondPrimitive::Aromatic,
            '@' => BondPrimitive::Ring,
            '/' | '\\' => {
                return Err(SmartsError::Unsupported {
                    pos,
                    feature: "directional bond",
                });
            }
            _ => return Err(SmartsError::UnexpectedChar { pos, ch }),
        };
        self.pos += 1;
        Ok(BondExpr::Primitive(prim))
    }

    fn parse_bare_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Err(SmartsError::InvalidSmarts {
                pos: start,
                msg: "expected atom".into(),
            });
        };

        let (prim, len) = match (ch, self.peek_at(1)) {
            ('*', _) => (AtomPrimitive::Any, 1),
            ('A', _) => (AtomPrimitive::Aliphatic, 1),
            ('a', _) => (AtomPrimitive::Aromatic, 1),
            ('C', Some('l')) => (aliphatic(Element::Cl), 2),
            ('B', Some('r')) => (aliphatic(Element::Br), 2),
            ('B', _) => (aliphatic(Element::B), 1),
            ('C', _) => (aliphatic(Element::C), 1),
            ('N', _) => (aliphatic(Element::N), 1),
            ('O', _) => (aliphatic(Element::O), 1),
            ('P', _) => (aliphatic(Element::P), 1),
            ('S', _) => (aliphatic(Element::S), 1),
            ('F', _) => (aliphatic(Element::F), 1),
            ('I', _) => (aliphatic(Element::I), 1),
            ('b', _) => (aromatic(Element::B), 1),
            ('c', _) => (aromatic(Element::C), 1),
            ('n', _) => (aromatic(Element::N), 1),
            ('o', _) => (aromatic(Element::O), 1),
            ('p', _) => (aromatic(Element::P), 1),
            ('s', _) => (aromatic(Element::S), 1),
            _ => return Err(SmartsError::UnexpectedChar { pos: start, ch }),
        };
        self.pos += len;
        Ok(AtomExpr::Primitive(prim))
    }

    fn parse_bracket_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let bracket_start = self.pos;
        self.expect('[')?;

        if self.peek() == Some(']') {
            return Err(SmartsError::InvalidSmarts {
                pos: bracket_start,
                msg: "empty bracket atom".into(),
            });
        }

        let expr = self.parse_semicolon_expr()?;

        // Atom map classes only label atoms for reactions.
        if self.peek() == Some(':') {
            self.pos += 1;
            if self.parse_number().is_none() {
                return Err(SmartsError::InvalidSmarts {
                    pos: self.pos,
                    msg: "expected atom map number".into(),
                });
            }
        }

        if self.peek() != Some(']') {
            return Err(SmartsError::UnclosedBracket { pos: bracket_start });
        }
        self.pos += 1;

        Ok(expr)
    }

    fn parse_semicolon_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut expr = self.parse_comma_expr()?;
        while self.peek() == Some(';') {
            self.pos += 1;
            let rhs = self.parse_comma_expr()?;
            expr = AtomExpr::and(expr, rhs);
        }
        Ok(expr)
    }

    fn parse_comma_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut expr = self.parse_high_and_expr()?;
        while self.peek() == Some(',') {
            self.pos += 1;
            let rhs = self.parse_high_and_expr()?;
            expr = AtomExpr::or(expr, rhs);
        }
        Ok(expr)
    }

    fn parse_high_and_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut expr = self.parse_not_expr()?;
        loop {
            match self.peek() {
                None | Some(']' | ',' | ';' | ':') => break,
                Some('&') => {
                    self.pos += 1;
                    let rhs = self.parse_not_expr()?;
                    expr = AtomExpr::and(expr, rhs);
                }
                Some(_) => {
                    let rhs = self.parse_not_expr()?;
                    expr = AtomExpr::and(expr, rhs);
                }
            }
        }
        Ok(expr)
    }

    fn parse_not_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        if self.peek() == Some('!') {
            self.pos += 1;
            return Ok(AtomExpr::not(self.parse_not_expr()?));
        }
        self.parse_primitive()
    }

    fn parse_primitive(&mut self) -> Result<AtomExpr, SmartsError> {
        let Some(ch) = self.peek() else {
            return Err(SmartsError::InvalidSmarts {
                pos: self.pos,
                msg: "expected atom primitive".into(),
            });
        };

        let prim = match ch {
            '*' => {
                self.pos += 1;
                AtomPrimitive::Any
            }
            'A' => {
                if self.two_letter_element_ahead() {
                    return self.parse_bracket_element();
                }
                self.pos += 1;
                AtomPrimitive::Aliphatic
            }
            'a' => {
                if self.lookahead_is("as") {
                    return self.parse_bracket_element();
                }
                self.pos += 1;
                AtomPrimitive::Aromatic
            }
            '#' => {
                self.pos += 1;
                let num = self
                    .parse_number()
                    .ok_or(SmartsError::InvalidAtomicNum { pos: self.pos })?;
                if num == 0 || num > 118 {
                    return Err(SmartsError::InvalidAtomicNum { pos: self.pos });
                }
                AtomPrimitive::Element {
                    atomic_num: num as u8,
                    aromatic: None,
                }
            }
            'D' => {
                self.pos += 1;
                AtomPrimitive::Degree(self.parse_count(1)?)
            }
            'v' => {
                self.pos += 1;
                AtomPrimitive::Valence(self.parse_count(1)?)
            }
            'X' => {
                if self.two_letter_element_ahead() {
                    return self.parse_bracket_element();
                }
                self.pos += 1;
                AtomPrimitive::Connectivity(self.parse_count(1)?)
            }
            'h' => {
                self.pos += 1;
                AtomPrimitive::ImplicitHCount(self.parse_count(1)?)
            }
            'x' => {
                self.pos += 1;
                AtomPrimitive::RingConnectivity(self.parse_count(1)?)
            }
            'H' => {
                if self.two_letter_element_ahead() {
                    return self.parse_bracket_element();
                }
                if self.is_hydrogen_atom_context() {
                    self.pos += 1;
                    aliphatic(Element::H)
                } else {
                    self.pos += 1;
                    return Ok(AtomExpr::HydrogenCount(self.parse_count(1)?));
                }
            }
            'R' => {
                self.pos += 1;
                match self.parse_number() {
                    None => AtomPrimitive::InRing,
                    Some(0) => AtomPrimitive::NotInRing,
                    Some(n) => AtomPrimitive::RingMembership(self.narrow(n)?),
                }
            }
            'r' => {
                self.pos += 1;
                match self.parse_number() {
                    None => AtomPrimitive::InRing,
                    Some(0) => AtomPrimitive::NotInRing,
                    Some(n) => AtomPrimitive::SmallestRingSize(self.narrow(n)?),
                }
            }
            '@' => {
                return Err(SmartsError::Unsupported {
                    pos: self.pos,
                    feature: "chirality",
                });
            }
            '+' | '-' => self.parse_charge(ch)?,
            '$' => return self.parse_recursive(),
            _ if ch.is_ascii_digit() => {
                let start = self.pos;
                let iso = self
                    .parse_number()
                    .and_then(|n| u16::try_from(n).ok())
                    .ok_or_else(|| SmartsError::InvalidSmarts {
                        pos: start,
                        msg: "isotope out of range".into(),
                    })?;
                AtomPrimitive::Isotope(iso)
            }
            _ if ch.is_ascii_alphabetic() => return self.parse_bracket_element(),
            _ => return Err(SmartsError::UnexpectedChar { pos: self.pos, ch }),
        };

        Ok(AtomExpr::Primitive(prim))
    }

    fn narrow(&self, n: u32) -> Result<u8, SmartsError> {
        u8::try_from(n).map_err(|_| SmartsError::InvalidSmarts {
            pos: self.pos,
            msg: format!("count {n} out of range"),
        })
    }

    fn parse_charge(&mut self, sign_char: char) -> Result<AtomPrimitive, SmartsError> {
        let start = self.pos;
        let sign: i8 = if sign_char == '+' { 1 } else { -1 };
        self.pos += 1;

        let magnitude = match self.parse_number() {
            Some(n) => i8::try_from(n).map_err(|_| SmartsError::InvalidSmarts {
                pos: start,
                msg: format!("charge {n} out of range"),
            })?,
            None => {
                let mut m: i8 = 1;
                while self.peek() == Some(sign_char) {
                    m = m.checked_add(1).ok_or_else(|| SmartsError::InvalidSmarts {
                        pos: start,
                        msg: "charge out of range".into(),
                    })?;
                    self.pos += 1;
                }
                m
            }
        };
        Ok(AtomPrimitive::Charge(sign * magnitude))
    }

    fn parse_recursive(&mut self) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        self.pos += 1;
        if self.peek() != Some('(') {
            return Err(SmartsError::UnclosedRecursive { pos: start });
        }
        self.pos += 1;
        let inner = self.extract_balanced_parens(start)?;
        let query = parse(&inner)?;
        Ok(AtomExpr::Recursive(RecursivePattern {
            id: 0,
            query: Box::new(query),
        }))
    }

    fn extract_balanced_parens(&mut self, recursive_start: usize) -> Result<String, SmartsError> {
        let begin = self.pos;
        let mut depth = 1;
        while let Some(ch) = self.peek() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner: String = self.chars[begin..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(SmartsError::UnclosedRecursive {
            pos: recursive_start,
        })
    }

    // `[H]`, `[2H]` and `[H+]` name hydrogen atoms; elsewhere `H` counts
    // attached hydrogens.
    fn is_hydrogen_atom_context(&self) -> bool {
        let before_is_isotope = self
            .bracket_content_before_pos()
            .iter()
            .all(|c| c.is_ascii_digit());
        let next_ends_atom = matches!(self.peek_at(1), Some(']' | '+' | '-' | ':'));
        before_is_isotope && next_ends_atom
    }

    fn bracket_content_before_pos(&self) -> &[char] {
        let mut start = self.pos;
        while start > 0 && self.chars[start - 1] != '[' {
            start -= 1;
        }
        &self.chars[start..self.pos]
    }

    fn two_letter_element_ahead(&self) -> bool {
        match (self.peek(), self.peek_at(1)) {
            (Some(a), Some(b)) if b.is_ascii_lowercase() => {
                Element::from_symbol(&format!("{a}{b}")).is_some()
            }
            _ => false,
        }
    }

    fn parse_bracket_element(&mut self) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Err(SmartsError::InvalidSmarts {
                pos: start,
                msg: "expected element symbol".into(),
            });
        };

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
                    return Ok(AtomExpr::Primitive(aromatic(elem)));
                }
            }
            return Err(SmartsError::UnexpectedChar { pos: start, ch });
        }

        if self.two_letter_element_ahead() {
            let symbol: String = self.chars[start..start + 2].iter().collect();
            if let Some(elem) = Element::from_symbol(&symbol) {
                self.pos += 2;
                return Ok(AtomExpr::Primitive(aliphatic(elem)));
            }
        }

        if let Some(elem) = Element::from_symbol(&ch.to_string()) {
            self.pos += 1;
            return Ok(AtomExpr::Primitive(aliphatic(elem)));
        }

        Err(SmartsError::UnexpectedChar { pos: start, ch })
    }
}

fn is_bond_symbol(c: char) -> bool {
    matches!(c, '-' | '=' | '#' | '~' | ':' | '@' | '!' | '/' | '\\')
}

fn aliphatic(elem: Element) -> AtomPrimitive {
    AtomPrimitive::Element {
        atomic_num: elem.atomic_num(),
        aromatic: Some(false),
    }
}

fn aromatic(elem: Element) -> AtomPrimitive {
    AtomPrimitive::Element {
        atomic_num: elem.atomic_num(),
        aromatic: Some(true),
    }
}

/// Parse SMARTS text into a query graph. Recursive patterns are left with
/// id 0; [`compile`](super::compile) numbers them.
pub(super) fn parse(input: &str) -> Result<QueryGraph, SmartsError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SmartsError::EmptyInput);
    }
    Parser::new(trimmed).parse_smarts()
}
