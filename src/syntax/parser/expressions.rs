//! The typed expression language, parsed with binding powers.

use crate::base::TextSize;
use crate::syntax::ast::{
    AttrOp, BinaryOp, CompareOp, DictKey, LiteralValue, Name, Node, NodeKind, RangeOp, UnaryOp,
};
use crate::syntax::error::SyntaxError;
use crate::syntax::scanner::ScanKind;
use crate::syntax::token::TokenKind;

use super::{PResult, Parser};

/// Left binding power of postfix operators. Parsing at this power yields
/// a place expression: a name with calls, subscripts and attributes.
const POSTFIX_BP: u8 = 29;
const COMPARE_RIGHT_BP: u8 = 11;
const NOT_BP: u8 = 8;
const UNARY_BP: u8 = 24;

#[derive(Debug, Clone, Copy)]
enum Infix {
    Binary(BinaryOp),
    Compare,
    Ternary,
    Range(RangeOp),
    Call,
    Subscript,
    Attribute(AttrOp),
}

impl Parser<'_> {
    pub(crate) fn expression(&mut self) -> PResult<Node> {
        self.expr_bp(0)
    }

    /// An expression, or a tuple of them on the right of `=`.
    pub(crate) fn expr_or_tuple(&mut self) -> PResult<Node> {
        let start = self.start();
        let first = self.expression()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma)? {
            if !self.at_expr_start() {
                break;
            }
            items.push(self.expression()?);
        }
        Ok(Node::new(NodeKind::Tuple(items), self.range_from(start)))
    }

    /// Target of a mutation: `x`, `d.k`, `a[i]`.
    pub(crate) fn place(&mut self) -> PResult<Node> {
        self.expr_bp(POSTFIX_BP)
    }

    /// `( expr )`, returning the inner expression.
    pub(crate) fn paren_expr(&mut self) -> PResult<Node> {
        self.bump()?;
        self.skipping_newlines(|p| {
            let expr = p.expression()?;
            p.expect(TokenKind::RParen, "`)`")?;
            Ok(expr)
        })
    }

    pub(crate) fn at_expr_start(&self) -> bool {
        use TokenKind::*;
        if self.at_closing_backtick() {
            return false;
        }
        matches!(
            self.kind(),
            Int | Float
                | Ident
                | SimpleVar
                | SpecialVar
                | DollarBrace
                | DollarParen
                | AtParen
                | DollarBracket
                | Backtick
                | Splice
                | LParen
                | LBracket
                | LBrace
                | Slash
                | Minus
                | Plus
                | Tilde
                | Bang
                | Ellipsis
        ) || self.kind().is_quote_opener()
    }

    fn expr_bp(&mut self, min_bp: u8) -> PResult<Node> {
        self.enter()?;
        let start = self.start();
        let mut lhs = self.prefix()?;
        let mut folds = 0;

        while let Some((op, l_bp, r_bp)) = self.infix() {
            if l_bp < min_bp {
                break;
            }
            folds += 1;
            self.fold()?;

            let kind = match op {
                Infix::Call => {
                    let args = self.arg_list()?;
                    NodeKind::Call {
                        callee: Box::new(lhs),
                        args: Box::new(args),
                    }
                }
                Infix::Subscript => {
                    self.bump()?;
                    let index = self.skipping_newlines(|p| {
                        let index = p.subscript_index()?;
                        p.expect(TokenKind::RBracket, "`]`")?;
                        Ok(index)
                    })?;
                    NodeKind::Subscript {
                        object: Box::new(lhs),
                        index: Box::new(index),
                    }
                }
                Infix::Attribute(op) => {
                    self.bump()?;
                    let name = self.ident_name("an attribute name")?;
                    NodeKind::Attribute {
                        op,
                        object: Box::new(lhs),
                        name,
                    }
                }
                Infix::Binary(op) => {
                    self.bump()?;
                    let rhs = self.expr_bp(r_bp)?;
                    NodeKind::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    }
                }
                Infix::Compare => {
                    let mut ops = Vec::new();
                    let mut operands = vec![lhs];
                    while let Some(op) = self.compare_op()? {
                        ops.push(op);
                        operands.push(self.expr_bp(COMPARE_RIGHT_BP)?);
                    }
                    NodeKind::Compare { ops, operands }
                }
                Infix::Ternary => {
                    self.bump()?;
                    let condition = self.expr_bp(r_bp)?;
                    let else_value = if self.eat_keyword("else")? {
                        self.expr_bp(l_bp)?
                    } else {
                        self.missing("`else`")
                    };
                    NodeKind::Ternary {
                        then_value: Box::new(lhs),
                        condition: Box::new(condition),
                        else_value: Box::new(else_value),
                    }
                }
                Infix::Range(op) => {
                    self.bump()?;
                    let end = self.expr_bp(r_bp)?;
                    NodeKind::Range {
                        op,
                        start: Box::new(lhs),
                        end: Box::new(end),
                    }
                }
            };
            lhs = Node::new(kind, self.range_from(start));
        }

        self.unfold(folds);
        self.exit();
        Ok(lhs)
    }

    fn infix(&self) -> Option<(Infix, u8, u8)> {
        use TokenKind::*;
        let (op, l_bp, r_bp) = match self.kind() {
            LParen if self.adjacent() => (Infix::Call, 30, 0),
            LBracket if self.adjacent() => (Infix::Subscript, 30, 0),
            Dot => (Infix::Attribute(AttrOp::Dot), 30, 0),
            ThinArrow => (Infix::Attribute(AttrOp::Arrow), 30, 0),
            FatArrow => (Infix::Attribute(AttrOp::FatArrow), 30, 0),
            StarStar => (Infix::Binary(BinaryOp::Pow), 27, 26),
            Star => (Infix::Binary(BinaryOp::Mul), 22, 23),
            Slash => (Infix::Binary(BinaryOp::Div), 22, 23),
            SlashSlash => (Infix::Binary(BinaryOp::FloorDiv), 22, 23),
            Percent => (Infix::Binary(BinaryOp::Mod), 22, 23),
            Plus => (Infix::Binary(BinaryOp::Add), 20, 21),
            Minus => (Infix::Binary(BinaryOp::Sub), 20, 21),
            PlusPlus => (Infix::Binary(BinaryOp::Concat), 20, 21),
            LtLt => (Infix::Binary(BinaryOp::Shl), 18, 19),
            GtGt => (Infix::Binary(BinaryOp::Shr), 18, 19),
            Amp => (Infix::Binary(BinaryOp::BitAnd), 16, 17),
            Caret => (Infix::Binary(BinaryOp::BitXor), 14, 15),
            Pipe => (Infix::Binary(BinaryOp::BitOr), 12, 13),
            EqEqEq | NotEqEq | EqEq | NotEq | TildeEqEq | Lt | LtEq | Gt | GtEq | Tilde
            | BangTilde => (Infix::Compare, 10, 11),
            DotDot | DotDotLt => (Infix::Range(RangeOp::Exclusive), 2, 3),
            DotDotEq => (Infix::Range(RangeOp::Inclusive), 2, 3),
            Ident => match self.current.text.as_str() {
                "or" => (Infix::Binary(BinaryOp::Or), 4, 5),
                "and" => (Infix::Binary(BinaryOp::And), 6, 7),
                "in" | "is" => (Infix::Compare, 10, 11),
                "not" if self.peek().is_word("in") => (Infix::Compare, 10, 11),
                "if" => (Infix::Ternary, 2, 3),
                _ => return None,
            },
            _ => return None,
        };
        Some((op, l_bp, r_bp))
    }

    /// Consume one comparison operator, if `current` starts one.
    fn compare_op(&mut self) -> PResult<Option<CompareOp>> {
        use TokenKind::*;
        let (op, width) = match self.kind() {
            EqEqEq => (CompareOp::Identical, 1),
            NotEqEq => (CompareOp::NotIdentical, 1),
            EqEq => (CompareOp::Eq, 1),
            NotEq => (CompareOp::NotEq, 1),
            TildeEqEq => (CompareOp::ApproxEq, 1),
            Lt => (CompareOp::Lt, 1),
            LtEq => (CompareOp::LtEq, 1),
            Gt => (CompareOp::Gt, 1),
            GtEq => (CompareOp::GtEq, 1),
            Tilde => (CompareOp::Match, 1),
            BangTilde => (CompareOp::NotMatch, 1),
            Ident => match self.current.text.as_str() {
                "in" => (CompareOp::In, 1),
                "is" if self.peek().is_word("not") => (CompareOp::IsNot, 2),
                "is" => (CompareOp::Is, 1),
                "not" if self.peek().is_word("in") => (CompareOp::NotIn, 2),
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        for _ in 0..width {
            self.bump()?;
        }
        Ok(Some(op))
    }

    fn prefix(&mut self) -> PResult<Node> {
        match self.kind() {
            TokenKind::Int => {
                let token = self.bump()?;
                match token.text.replace('_', "").parse::<i64>() {
                    Ok(value) => Ok(Node::new(
                        NodeKind::Literal(LiteralValue::Int(value)),
                        token.range,
                    )),
                    Err(_) => {
                        self.diagnostics.syntax(SyntaxError::new(
                            "integer literal out of range",
                            token.range,
                        ));
                        Ok(Node::error(token.range))
                    }
                }
            }
            TokenKind::Float => {
                let token = self.bump()?;
                let value = token.text.replace('_', "").parse::<f64>().unwrap_or(f64::NAN);
                Ok(Node::new(
                    NodeKind::Literal(LiteralValue::Float(value)),
                    token.range,
                ))
            }
            TokenKind::Ident => {
                let literal = match self.current.text.as_str() {
                    "true" => Some(LiteralValue::Bool(true)),
                    "false" => Some(LiteralValue::Bool(false)),
                    "null" => Some(LiteralValue::Null),
                    "not" => return self.unary(UnaryOp::Not, NOT_BP),
                    _ => None,
                };
                let token = self.bump()?;
                let kind = match literal {
                    Some(value) => NodeKind::Literal(value),
                    None => NodeKind::Var(token.text),
                };
                Ok(Node::new(kind, token.range))
            }
            TokenKind::LParen => self.paren_or_tuple(),
            TokenKind::LBracket => self.list_literal(),
            TokenKind::LBrace => self.dict_literal(),
            TokenKind::Slash => self.eggex(),
            TokenKind::Minus => self.unary(UnaryOp::Neg, UNARY_BP),
            TokenKind::Plus => self.unary(UnaryOp::Pos, UNARY_BP),
            TokenKind::Tilde => self.unary(UnaryOp::BitNot, UNARY_BP),
            TokenKind::Ellipsis => self.unary(UnaryOp::Spread, UNARY_BP),
            TokenKind::Bang => self.unary(UnaryOp::Not, NOT_BP),
            kind if kind.is_quote_opener() => self.string_literal(),
            _ => match self.substitution()? {
                Some(node) => Ok(node),
                None => Ok(self.missing("an expression")),
            },
        }
    }

    fn unary(&mut self, op: UnaryOp, bp: u8) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        let operand = self.expr_bp(bp)?;
        Ok(Node::new(
            NodeKind::Unary {
                op,
                operand: Box::new(operand),
            },
            self.range_from(start),
        ))
    }

    /// `(expr)`, `()`, `(a,)`, `(a, b)`
    fn paren_or_tuple(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.skipping_newlines(|p| {
            if p.eat(TokenKind::RParen)? {
                return Ok(Node::new(NodeKind::Tuple(Vec::new()), p.range_from(start)));
            }
            let first = p.expression()?;
            if !p.at(TokenKind::Comma) {
                p.expect(TokenKind::RParen, "`)`")?;
                return Ok(first);
            }
            let mut items = vec![first];
            while p.eat(TokenKind::Comma)? {
                if !p.at_expr_start() {
                    break;
                }
                items.push(p.expression()?);
            }
            p.expect(TokenKind::RParen, "`)`")?;
            Ok(Node::new(NodeKind::Tuple(items), p.range_from(start)))
        })
    }

    /// `[a, b, c]`
    fn list_literal(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;
        let items = self.skipping_newlines(|p| {
            let mut items = Vec::new();
            while !matches!(p.kind(), TokenKind::RBracket | TokenKind::Eof) && !p.at_closing_backtick() {
                p.tick()?;
                if !p.at_expr_start() {
                    items.push(p.force_advance("a list element")?);
                    continue;
                }
                items.push(p.expression()?);
                if !p.eat(TokenKind::Comma)? {
                    break;
                }
            }
            p.expect(TokenKind::RBracket, "`]`")?;
            Ok(items)
        })?;
        self.exit();
        Ok(Node::new(NodeKind::List(items), self.range_from(start)))
    }

    /// `{name: v, 'quoted': v, [computed]: v, shorthand}`
    fn dict_literal(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;
        let entries = self.skipping_newlines(|p| {
            let mut entries = Vec::new();
            while !matches!(p.kind(), TokenKind::RBrace | TokenKind::Eof) && !p.at_closing_backtick() {
                p.tick()?;
                let entry_start = p.start();
                let key = match p.kind() {
                    TokenKind::Ident => {
                        let token = p.bump()?;
                        DictKey::Name(Name::new(token.text, token.range))
                    }
                    TokenKind::LBracket => {
                        p.bump()?;
                        let key = p.expression()?;
                        p.expect(TokenKind::RBracket, "`]`")?;
                        DictKey::Computed(Box::new(key))
                    }
                    kind if kind.is_quote_opener() => DictKey::Str(Box::new(p.string_literal()?)),
                    _ => {
                        entries.push(p.force_advance("a dict key")?);
                        continue;
                    }
                };
                let value = if p.eat(TokenKind::Colon)? {
                    Some(Box::new(p.expression()?))
                } else {
                    None
                };
                entries.push(Node::new(
                    NodeKind::DictEntry { key, value },
                    p.range_from(entry_start),
                ));
                if !p.eat(TokenKind::Comma)? {
                    break;
                }
            }
            p.expect(TokenKind::RBrace, "`}`")?;
            Ok(entries)
        })?;
        self.exit();
        Ok(Node::new(NodeKind::Dict(entries), self.range_from(start)))
    }

    /// `/ digit+ '.' /`, kept as raw text.
    pub(crate) fn eggex(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        let mut content = String::new();
        if let Some(scanned) = self.scanner.scan(self.text, self.pos, &[ScanKind::RegexContent]) {
            self.advance_to(scanned.range.end())?;
            if let Some(error) = &scanned.error {
                self.lexical_error(error, self.range_from(start));
            }
            content = scanned.text;
        }
        if self.text.as_bytes().get(usize::from(self.pos)) == Some(&b'/') {
            self.advance_to(self.pos + TextSize::from(1))?;
        } else {
            self.error_expected("a closing `/`");
        }
        Ok(Node::new(
            NodeKind::Regex(content.trim().into()),
            self.range_from(start),
        ))
    }

    /// `( positional, ...; named = v, ... )`
    pub(crate) fn arg_list(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;
        let (positional, named) = self.skipping_newlines(|p| {
            let mut positional = Vec::new();
            let mut named = Vec::new();
            loop {
                p.tick()?;
                let before = p.pos;
                match p.kind() {
                    TokenKind::RParen | TokenKind::Eof => break,
                    _ if p.at_closing_backtick() => break,
                    TokenKind::Comma | TokenKind::Semi => {
                        p.bump()?;
                        continue;
                    }
                    TokenKind::Ident if p.peek().kind == TokenKind::Eq => {
                        named.push(p.named_arg()?);
                    }
                    _ if p.at_expr_start() => positional.push(p.expression()?),
                    _ => positional.push(p.force_advance("an argument")?),
                }
                if p.pos == before {
                    positional.push(p.force_advance("an argument")?);
                }
            }
            p.expect(TokenKind::RParen, "`)`")?;
            Ok((positional, named))
        })?;
        self.exit();
        Ok(Node::new(
            NodeKind::ArgList { positional, named },
            self.range_from(start),
        ))
    }

    fn named_arg(&mut self) -> PResult<Node> {
        let start = self.start();
        let token = self.bump()?;
        self.bump()?;
        let value = self.expression()?;
        Ok(Node::new(
            NodeKind::NamedArg {
                name: Name::new(token.text, token.range),
                value: Box::new(value),
            },
            self.range_from(start),
        ))
    }

    /// `i` or a slice `lo:hi`.
    fn subscript_index(&mut self) -> PResult<Node> {
        let start = self.start();
        let index = self.expression()?;
        if !self.eat(TokenKind::Colon)? || !self.at_expr_start() {
            return Ok(index);
        }
        let end = self.expression()?;
        Ok(Node::new(
            NodeKind::Range {
                op: RangeOp::Exclusive,
                start: Box::new(index),
                end: Box::new(end),
            },
            self.range_from(start),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::ast::*;
    use crate::syntax::parser::parse;
    use rstest::rstest;

    /// The value expression of `var x = <text>`.
    fn value(text: &str) -> Node {
        let parse = parse(&format!("var x = {text}\n"));
        assert!(parse.diagnostics.is_empty(), "{text}: {:?}", parse.diagnostics);
        let NodeKind::VarDecl(decl) = &parse.statements()[0].kind else {
            panic!("{:?}", parse.statements())
        };
        *decl.value.clone().unwrap()
    }

    #[test]
    fn test_precedence() {
        let node = value("1 + 2 * 3");
        let NodeKind::Binary { op: BinaryOp::Add, rhs, .. } = &node.kind else { panic!("{node:?}") };
        assert!(matches!(rhs.kind, NodeKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_power_is_right_associative() {
        let node = value("2 ** 3 ** 2");
        let NodeKind::Binary { op: BinaryOp::Pow, rhs, .. } = &node.kind else { panic!() };
        assert!(matches!(rhs.kind, NodeKind::Binary { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn test_comparisons_flatten() {
        let node = value("a < b <= c");
        let NodeKind::Compare { ops, operands } = &node.kind else { panic!("{node:?}") };
        assert_eq!(ops, &[CompareOp::Lt, CompareOp::LtEq]);
        assert_eq!(operands.len(), 3);
    }

    #[rstest]
    #[case("x not in items", CompareOp::NotIn)]
    #[case("x is not null", CompareOp::IsNot)]
    #[case("s ~ /d+/", CompareOp::Match)]
    #[case("a === b", CompareOp::Identical)]
    fn test_compare_ops(#[case] text: &str, #[case] op: CompareOp) {
        let node = value(text);
        let NodeKind::Compare { ops, .. } = &node.kind else { panic!("{node:?}") };
        assert_eq!(ops, &[op]);
    }

    #[test]
    fn test_logical_ops_and_not() {
        let node = value("not a or b and c");
        let NodeKind::Binary { op: BinaryOp::Or, lhs, rhs } = &node.kind else { panic!() };
        assert!(matches!(lhs.kind, NodeKind::Unary { op: UnaryOp::Not, .. }));
        assert!(matches!(rhs.kind, NodeKind::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn test_ternary() {
        let node = value("a if cond else b");
        assert!(matches!(node.kind, NodeKind::Ternary { .. }));
    }

    #[test]
    fn test_postfix_chain() {
        let node = value("obj.items[0]->method(1, key = 2)");
        let NodeKind::Call { callee, args } = &node.kind else { panic!("{node:?}") };
        assert!(matches!(callee.kind, NodeKind::Attribute { op: AttrOp::Arrow, .. }));
        let NodeKind::ArgList { positional, named } = &args.kind else { panic!() };
        assert_eq!((positional.len(), named.len()), (1, 1));
    }

    #[test]
    fn test_dict_keys() {
        let node = value("{name: 'x', 'quoted': 1, [k]: 2, short}");
        let NodeKind::Dict(entries) = &node.kind else { panic!("{node:?}") };
        assert_eq!(entries.len(), 4);
        let NodeKind::DictEntry { key, value } = &entries[3].kind else { panic!() };
        assert_eq!(key.literal().map(|n| n.text), Some("short".into()));
        assert!(value.is_none());
    }

    #[test]
    fn test_multiline_list() {
        let node = value("[\n  1,\n  2.5,\n  'three',\n]");
        assert!(matches!(&node.kind, NodeKind::List(items) if items.len() == 3));
    }

    #[test]
    fn test_ranges_and_literals() {
        assert!(matches!(value("1 ..< 10").kind, NodeKind::Range { op: RangeOp::Exclusive, .. }));
        assert!(matches!(value("null").kind, NodeKind::Literal(LiteralValue::Null)));
        assert!(matches!(value("1_000").kind, NodeKind::Literal(LiteralValue::Int(1000))));
    }

    #[test]
    fn test_integer_overflow_is_diagnosed() {
        let parse = parse("var x = 99999999999999999999999\n");
        assert_eq!(parse.diagnostics.len(), 1);
    }

    #[test]
    fn test_missing_operand() {
        let parse = parse("var x = 1 +\n");
        assert!(parse.has_errors());
    }
}
