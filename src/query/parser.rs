//! Hand-written recursive-descent parser for the path-expression DSL.
//!
//! Grammar:
//! ```text
//! query      := subset-sel ('/' component)+
//! subset-sel := '*' | IDENT (',' IDENT)*
//! component  := IDENT ('[' INT ']')? ('{' INT (',' INT)* '}')?
//! IDENT      := [A-Z0-9_]+
//! ```
//! Mirrors `Descriptor::read`'s style: small, single-purpose
//! functions each returning `Result<_, Error>`, advancing an explicit cursor.

use crate::Error;

use super::types::{Component, Query, Subset};

struct Cursor<'a> {
    raw: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(raw: &'a str) -> Self {
        Cursor {
            raw,
            bytes: raw.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn err(&self, reason: impl Into<String>) -> Error {
        Error::MalformedQuery {
            query: self.raw.to_string(),
            reason: reason.into(),
        }
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_'
}

fn read_ident(c: &mut Cursor<'_>) -> Result<String, Error> {
    let start = c.pos;
    while matches!(c.peek(), Some(b) if is_ident_byte(b)) {
        c.pos += 1;
    }
    if c.pos == start {
        return Err(c.err("expected an identifier ([A-Z0-9_]+)"));
    }
    Ok(c.raw[start..c.pos].to_string())
}

fn read_uint(c: &mut Cursor<'_>) -> Result<u32, Error> {
    let start = c.pos;
    while matches!(c.peek(), Some(b) if b.is_ascii_digit()) {
        c.pos += 1;
    }
    if c.pos == start {
        return Err(c.err("expected an integer"));
    }
    c.raw[start..c.pos]
        .parse()
        .map_err(|_| c.err("integer literal out of range"))
}

fn read_subset_names(c: &mut Cursor<'_>) -> Result<Vec<Subset>, Error> {
    if c.peek() == Some(b'*') {
        c.bump();
        return Ok(vec![Subset {
            name: "*".to_string(),
            is_any: true,
        }]);
    }
    let mut names = vec![read_ident(c)?];
    while c.peek() == Some(b',') {
        c.bump();
        names.push(read_ident(c)?);
    }
    Ok(names
        .into_iter()
        .map(|name| Subset {
            name,
            is_any: false,
        })
        .collect())
}

fn read_index(c: &mut Cursor<'_>) -> Result<Option<u32>, Error> {
    if c.peek() != Some(b'[') {
        return Ok(None);
    }
    c.bump();
    let n = read_uint(c)?;
    if c.bump() != Some(b']') {
        return Err(c.err("unbalanced '[' in index"));
    }
    Ok(Some(n))
}

fn read_filter(c: &mut Cursor<'_>) -> Result<Option<Vec<u32>>, Error> {
    if c.peek() != Some(b'{') {
        return Ok(None);
    }
    c.bump();
    let mut values = vec![read_uint(c)?];
    while c.peek() == Some(b',') {
        c.bump();
        values.push(read_uint(c)?);
    }
    if c.bump() != Some(b'}') {
        return Err(c.err("unbalanced '{' in filter"));
    }
    Ok(Some(values))
}

fn read_component(c: &mut Cursor<'_>) -> Result<Component, Error> {
    let mnemonic = read_ident(c)?;
    let index = read_index(c)?;
    let filter = read_filter(c)?;
    Ok(Component {
        mnemonic,
        index,
        filter,
    })
}

/// Parses a query path string into one [`Query`] per subset named by its
/// (possibly comma-separated) subset selector.
pub fn parse(input: &str) -> Result<Vec<Query>, Error> {
    let trimmed: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut c = Cursor::new(&trimmed);

    let subsets = read_subset_names(&mut c)?;

    if c.bump() != Some(b'/') {
        return Err(c.err("expected '/' after the subset selector"));
    }

    let mut components = vec![read_component(&mut c)?];
    while c.peek() == Some(b'/') {
        c.bump();
        components.push(read_component(&mut c)?);
    }

    if !c.eof() {
        return Err(c.err(format!("unexpected trailing input at byte {}", c.pos)));
    }

    Ok(subsets
        .into_iter()
        .map(|subset| Query {
            raw: input.to_string(),
            subset,
            components: components.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_scalar_path() {
        let qs = parse("*/CLAT").unwrap();
        assert_eq!(qs.len(), 1);
        assert!(qs[0].subset.is_any);
        assert_eq!(qs[0].components.len(), 1);
        assert_eq!(qs[0].components[0].mnemonic, "CLAT");
    }

    #[test]
    fn parses_nested_path_with_index_and_filter() {
        let qs = parse("ATMS/BRIT/TMBR[1]{1,3,5}").unwrap();
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].subset.name, "ATMS");
        assert!(!qs[0].subset.is_any);
        assert_eq!(qs[0].components.len(), 2);
        let tmbr = &qs[0].components[1];
        assert_eq!(tmbr.mnemonic, "TMBR");
        assert_eq!(tmbr.index, Some(1));
        assert_eq!(tmbr.filter.as_deref(), Some([1, 3, 5].as_slice()));
    }

    #[test]
    fn parses_comma_subset_list() {
        let qs = parse("ATMS,AMSU/CLAT").unwrap();
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].subset.name, "ATMS");
        assert_eq!(qs[1].subset.name, "AMSU");
    }

    #[test]
    fn strips_whitespace() {
        let qs = parse(" */ BRIT / TMBR ").unwrap();
        assert_eq!(qs[0].components[0].mnemonic, "BRIT");
        assert_eq!(qs[0].components[1].mnemonic, "TMBR");
    }

    #[test]
    fn rejects_unbalanced_brackets() {
        assert!(parse("*/TMBR[1").is_err());
        assert!(parse("*/TMBR{1,2").is_err());
    }

    #[test]
    fn rejects_empty_component() {
        assert!(parse("*/").is_err());
        assert!(parse("*/CLAT/").is_err());
    }

    #[test]
    fn rejects_lowercase_identifiers() {
        assert!(parse("*/clat").is_err());
    }

    #[test]
    fn rejects_missing_leading_slash() {
        assert!(parse("CLAT").is_err());
    }
}
