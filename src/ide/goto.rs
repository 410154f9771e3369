//! Go-to-definition.
//!
//! The identifier under the cursor is taken from the raw text, so a name
//! inside `"$name"`, `${name}`, `@items` or `$[expr]` resolves the same as a
//! bare one. `base.key` forms first try the literal keys of a dict-valued
//! constant named `base`.

use smol_str::SmolStr;

use crate::base::{FileId, LineRange, TextRange, TextSize};
use crate::hir::{SymbolKind, WorkspaceIndex};

/// A definition site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub file: FileId,
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// The whole declaration.
    pub full_range: TextRange,
    /// The identifier (or dict key) itself.
    pub focus_range: TextRange,
    pub focus_lines: LineRange,
}

/// The identifier under a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierAt {
    pub name: SmolStr,
    pub range: TextRange,
    /// `base` when the cursor is on `key` in `base.key`.
    pub base: Option<SmolStr>,
}

const SIGILS: &[u8] = b"$@{[";

fn is_name_char(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_continue(c)
}

fn char_at(text: &str, at: usize) -> Option<char> {
    text.get(at..)?.chars().next()
}

fn char_before(text: &str, at: usize) -> Option<char> {
    text.get(..at)?.chars().next_back()
}

/// Start of the name ending at `end`. Hyphens join name characters.
fn scan_back(text: &str, mut at: usize) -> usize {
    while let Some(c) = char_before(text, at) {
        let joins = c == '-'
            && char_before(text, at - 1).is_some_and(is_name_char)
            && char_at(text, at).is_some_and(is_name_char);
        if !is_name_char(c) && !joins {
            break;
        }
        at -= c.len_utf8();
    }
    at
}

fn scan_forward(text: &str, mut at: usize) -> usize {
    while let Some(c) = char_at(text, at) {
        let joins = c == '-'
            && char_before(text, at).is_some_and(is_name_char)
            && char_at(text, at + 1).is_some_and(is_name_char);
        if !is_name_char(c) && !joins {
            break;
        }
        at += c.len_utf8();
    }
    at
}

/// Extract the identifier at `offset`. A cursor on a sigil or just past the
/// end of a name counts as on the name.
pub fn identifier_at(text: &str, offset: TextSize) -> Option<IdentifierAt> {
    let mut at = usize::from(offset).min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }

    if !char_at(text, at).is_some_and(is_name_char) {
        let sigils = text.as_bytes()[at..]
            .iter()
            .take_while(|b| SIGILS.contains(b))
            .count();
        if sigils > 0 && char_at(text, at + sigils).is_some_and(is_name_char) {
            at += sigils;
        } else if char_before(text, at).is_some_and(is_name_char) {
            at = scan_back(text, at);
        } else {
            return None;
        }
    }

    let start = scan_back(text, at);
    let end = scan_forward(text, at);
    let name = text.get(start..end)?;
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let base = if char_before(text, start) == Some('.') {
        let base_end = start - 1;
        let base_start = scan_back(text, base_end);
        text.get(base_start..base_end)
            .filter(|base| !base.is_empty())
            .map(SmolStr::new)
    } else {
        None
    };

    let offset = |n: usize| TextSize::from(n as u32);
    Some(IdentifierAt {
        name: SmolStr::new(name),
        range: TextRange::new(offset(start), offset(end)),
        base,
    })
}

/// Definitions of the identifier at `offset` in `file`, whose text is
/// `text`. Current-file declarations win over those in other files.
pub fn goto_definition(
    index: &WorkspaceIndex,
    file: FileId,
    text: &str,
    offset: TextSize,
) -> Vec<NavigationTarget> {
    let Some(ident) = identifier_at(text, offset) else {
        return Vec::new();
    };

    let name = match &ident.base {
        Some(base) => {
            let keys = index.lookup_dict_key(Some(file), base, &ident.name);
            if !keys.is_empty() {
                return keys
                    .into_iter()
                    .map(|found| NavigationTarget {
                        file: found.file,
                        name: ident.name.clone(),
                        kind: found.symbol.kind,
                        full_range: found.symbol.range,
                        focus_range: found.key.range,
                        focus_lines: found.key.lines,
                    })
                    .collect();
            }
            base.clone()
        }
        None => ident.name.clone(),
    };

    let mut found = index.lookup(file, &name);
    if found.is_empty() && name.contains('-') {
        // `a-b` may be subtraction rather than a hyphenated proc name.
        if let Some(part) = identifier_part(text, &ident, offset) {
            found = index.lookup(file, part);
        }
    }

    found
        .into_iter()
        .map(|found| NavigationTarget {
            file: found.file,
            name: found.symbol.name.clone(),
            kind: found.symbol.kind,
            full_range: found.symbol.range,
            focus_range: found.symbol.name_range,
            focus_lines: found.symbol.name_lines,
        })
        .collect()
}

/// The hyphen-free segment of a hyphenated identifier under `offset`.
fn identifier_part<'t>(text: &'t str, ident: &IdentifierAt, offset: TextSize) -> Option<&'t str> {
    let word = &text[ident.range];
    let rel = usize::from(offset.clamp(ident.range.start(), ident.range.end()) - ident.range.start());
    let start = word[..rel].rfind('-').map_or(0, |i| i + 1);
    let end = word[rel..].find('-').map_or(word.len(), |i| rel + i);
    word.get(start..end).filter(|part| !part.is_empty())
}
