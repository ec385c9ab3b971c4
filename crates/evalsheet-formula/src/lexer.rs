//! Formula lexer
//!
//! Turns source text into a flat token list. Offsets are 0-based character
//! (not byte) positions so that error messages line up with what the user typed.

use crate::dialect::Dialect;
use crate::error::LexError;
use crate::functions::{self, FunctionRegistry};
use evalsheet_core::{CellAddress, CellRange};
use std::fmt;

/// A token together with the text it was scanned from
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The source characters the token covers
    pub lexeme: String,
    /// 0-based character offset of the first character
    pub offset: usize,
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),

    // References
    Variable(String),
    Cell(CellAddress),
    Range(CellRange),

    /// Built-in function name (canonical upper case), always followed by `(`
    Function(&'static str),
    /// A word that is nothing else; the parser rejects it
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Ampersand,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Not,

    // Punctuation
    LeftParen,
    RightParen,
    Comma,
    Colon,

    Eof,
}

impl TokenKind {
    /// Human-readable description for parse errors
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::String(s) => format!("string \"{}\"", s),
            TokenKind::Boolean(b) => format!("boolean {}", if *b { "TRUE" } else { "FALSE" }),
            TokenKind::Variable(name) => format!("variable [{}]", name),
            TokenKind::Cell(addr) => format!("cell {}", addr),
            TokenKind::Range(range) => format!("range {}:{}", range.start, range.end),
            TokenKind::Function(name) => format!("function {}", name),
            TokenKind::Identifier(word) => format!("identifier '{}'", word),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("'{}'", other),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::Ampersand => "&",
            TokenKind::Equal => "=",
            TokenKind::NotEqual => "<>",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Eof => "<eof>",
            other => return f.write_str(&other.describe()),
        };
        f.write_str(s)
    }
}

/// Split `source` into tokens for the given dialect
///
/// The returned list always ends with a single [`TokenKind::Eof`].
///
/// # Example
/// ```rust
/// use evalsheet_formula::{tokenize, Dialect, TokenKind};
///
/// let tokens = tokenize("SUM(A1:B2) > 3", Dialect::Spreadsheet).unwrap();
/// assert_eq!(tokens[0].kind, TokenKind::Function("SUM"));
/// assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
/// ```
pub fn tokenize(source: &str, dialect: Dialect) -> Result<Vec<Token>, LexError> {
    log::trace!("tokenize ({}): {}", dialect, source);
    Lexer::new(source, dialect).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    dialect: Dialect,
    registry: &'static FunctionRegistry,
}

impl Lexer {
    fn new(source: &str, dialect: Dialect) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            dialect,
            registry: functions::registry(dialect),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        self.skip_whitespace();
        if self.dialect.allows_leading_equals() && self.peek_char() == Some('=') {
            self.advance();
        }

        loop {
            self.skip_whitespace();
            let start = self.pos;
            if self.is_at_end() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    lexeme: String::new(),
                    offset: start,
                });
                return Ok(tokens);
            }
            let kind = self.scan_token()?;
            tokens.push(Token {
                kind,
                lexeme: self.chars[start..self.pos].iter().collect(),
                offset: start,
            });
        }
    }

    // === Token scanning ===

    fn scan_token(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(TokenKind::Eof),
        };

        let single = match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '%' => Some(TokenKind::Percent),
            '^' => Some(TokenKind::Caret),
            ',' => Some(TokenKind::Comma),
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            ':' if self.dialect.has_cell_references() => Some(TokenKind::Colon),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(kind);
        }

        match c {
            '&' => {
                self.advance();
                if self.peek_char() == Some('&') {
                    self.advance();
                    return Ok(TokenKind::And);
                }
                return Ok(TokenKind::Ampersand);
            }
            '|' => {
                self.advance();
                if self.peek_char() == Some('|') {
                    self.advance();
                    return Ok(TokenKind::Or);
                }
                return Err(LexError::new(start, "unrecognized character '|'"));
            }
            '!' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(TokenKind::NotEqual);
                }
                return Ok(TokenKind::Not);
            }
            '=' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                }
                return Ok(TokenKind::Equal);
            }
            '<' => {
                self.advance();
                return Ok(match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        TokenKind::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::NotEqual
                    }
                    _ => TokenKind::Less,
                });
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(TokenKind::GreaterEqual);
                }
                return Ok(TokenKind::Greater);
            }
            _ => {}
        }

        if c == '"' {
            return self.scan_string();
        }

        if c == '[' && self.dialect.has_variables() {
            return self.scan_variable();
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        if c.is_alphabetic() || c == '_' || (c == '$' && self.dialect.has_cell_references()) {
            return self.scan_word();
        }

        Err(LexError::new(
            start,
            format!("unrecognized character '{}'", c),
        ))
    }

    fn scan_string(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.advance(); // opening quote

        let mut s = String::new();
        loop {
            let c = self
                .peek_char()
                .ok_or_else(|| LexError::new(start, "unterminated string literal"))?;
            match c {
                '"' if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                '"' => {
                    self.advance();
                    return Ok(TokenKind::String(s));
                }
                '\\' => {
                    let escaped = match self.peek_char_at(1) {
                        Some('"') => Some('"'),
                        Some('\\') => Some('\\'),
                        Some('n') => Some('\n'),
                        Some('t') => Some('\t'),
                        Some('r') => Some('\r'),
                        _ => None,
                    };
                    match escaped {
                        Some(e) => {
                            s.push(e);
                            self.advance();
                            self.advance();
                        }
                        // unknown escapes are kept literally, e.g. "C:\data"
                        None => {
                            s.push('\\');
                            self.advance();
                        }
                    }
                }
                _ => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_variable(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.advance(); // [

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some(']') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => return Err(LexError::new(start, "unterminated variable reference")),
            }
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(LexError::new(start, "empty variable name"));
        }
        Ok(TokenKind::Variable(name.to_string()))
    }

    fn scan_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;

        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            let digits_start = self.pos;
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
            if self.pos == digits_start {
                return Err(self.invalid_number(start));
            }
        }

        // 12abc, 1.2.3
        if self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            return Err(self.invalid_number(start));
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.invalid_number(start))
    }

    fn invalid_number(&mut self, start: usize) -> LexError {
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.advance();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        LexError::new(start, format!("invalid numeric literal '{}'", text))
    }

    fn scan_word(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let allow_dollar = self.dialect.has_cell_references();
        while self.peek_char().map_or(false, |c| {
            c.is_alphanumeric() || c == '_' || (allow_dollar && c == '$')
        }) {
            self.advance();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let upper = word.to_uppercase();

        if self.next_non_space() == Some('(') {
            if let Some(def) = self.registry.get(&upper) {
                return Ok(TokenKind::Function(def.name));
            }
        }

        match upper.as_str() {
            "TRUE" => return Ok(TokenKind::Boolean(true)),
            "FALSE" => return Ok(TokenKind::Boolean(false)),
            "AND" => return Ok(TokenKind::And),
            "OR" => return Ok(TokenKind::Or),
            "NOT" => return Ok(TokenKind::Not),
            _ => {}
        }

        if self.dialect.has_cell_references() && CellAddress::looks_like_address(&word) {
            let first = CellAddress::parse(&word)
                .map_err(|e| LexError::new(start, e.to_string()))?;
            return self.scan_range_tail(first);
        }

        Ok(TokenKind::Identifier(word))
    }

    /// After a cell address: `:B3` directly attached turns it into a range
    fn scan_range_tail(&mut self, first: CellAddress) -> Result<TokenKind, LexError> {
        if self.peek_char() != Some(':') {
            return Ok(TokenKind::Cell(first));
        }

        let colon = self.pos;
        let mut end = colon + 1;
        while self
            .chars
            .get(end)
            .map_or(false, |c| c.is_ascii_alphanumeric() || *c == '$')
        {
            end += 1;
        }
        let word: String = self.chars[colon + 1..end].iter().collect();
        if !CellAddress::looks_like_address(&word) {
            // leave the ':' for the parser to report
            return Ok(TokenKind::Cell(first));
        }

        let second = CellAddress::parse(&word)
            .map_err(|e| LexError::new(colon + 1, e.to_string()))?;
        self.pos = end;
        Ok(TokenKind::Range(CellRange::new(first, second)))
    }

    // === Character helpers ===

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn next_non_space(&self) -> Option<char> {
        self.chars[self.pos..]
            .iter()
            .copied()
            .find(|c| !c.is_whitespace())
    }

    fn advance(&mut self) {
        if self.pos < self.chars.len() {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str, dialect: Dialect) -> Vec<TokenKind> {
        tokenize(source, dialect)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 .5 1e3 2.5E-3", Dialect::Expression),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.5),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
                TokenKind::Number(0.0025),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_invalid_numbers() {
        let err = tokenize("1 + 12abc", Dialect::Expression).unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(err.message.contains("12abc"));

        assert!(tokenize("2e", Dialect::Expression).is_err());
        assert!(tokenize("1.2.3", Dialect::Expression).is_err());
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#""say ""hi""" "a\"b\n" "C:\data""#, Dialect::Spreadsheet),
            vec![
                TokenKind::String("say \"hi\"".into()),
                TokenKind::String("a\"b\n".into()),
                TokenKind::String("C:\\data".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_reports_opening_quote() {
        let err = tokenize("1 & \"abc", Dialect::Spreadsheet).unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.message, "unterminated string literal");
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a == b != c <> d <= e >= f && g || !h", Dialect::Expression)
                .into_iter()
                .filter(|k| !matches!(k, TokenKind::Identifier(_)))
                .collect::<Vec<_>>(),
            vec![
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_function_keyword_needs_paren() {
        assert_eq!(
            kinds("sum (1) and not TRUE", Dialect::Spreadsheet),
            vec![
                TokenKind::Function("SUM"),
                TokenKind::LeftParen,
                TokenKind::Number(1.0),
                TokenKind::RightParen,
                TokenKind::And,
                TokenKind::Not,
                TokenKind::Boolean(true),
                TokenKind::Eof,
            ]
        );
        // no paren: falls through to identifier
        assert_eq!(
            kinds("sum", Dialect::Spreadsheet),
            vec![TokenKind::Identifier("sum".into()), TokenKind::Eof]
        );
        // unknown function stays an identifier
        assert_eq!(
            kinds("FOO(1)", Dialect::Spreadsheet)[0],
            TokenKind::Identifier("FOO".into())
        );
    }

    #[test]
    fn test_cells_and_ranges() {
        let tokens = tokenize("=$A$1 + B3:a1", Dialect::Spreadsheet).unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Cell(CellAddress::with_absolute(0, 0, true, true))
        );
        assert_eq!(tokens[0].offset, 1);
        assert_eq!(tokens[0].lexeme, "$A$1");
        assert_eq!(
            tokens[2].kind,
            TokenKind::Range(CellRange::from_indices(0, 0, 2, 1))
        );
        assert_eq!(tokens[2].lexeme, "B3:a1");
    }

    #[test]
    fn test_cell_out_of_bounds() {
        let err = tokenize("A99999999", Dialect::Spreadsheet).unwrap_err();
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_variables() {
        assert_eq!(
            kinds("[unit price] * [qty]", Dialect::Expression),
            vec![
                TokenKind::Variable("unit price".into()),
                TokenKind::Star,
                TokenKind::Variable("qty".into()),
                TokenKind::Eof,
            ]
        );
        let err = tokenize("1 + [abc", Dialect::Expression).unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(tokenize("[x]", Dialect::Spreadsheet).is_err());
    }

    #[test]
    fn test_expression_dialect_has_no_cells() {
        assert_eq!(
            kinds("A1", Dialect::Expression),
            vec![TokenKind::Identifier("A1".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_offsets_count_characters() {
        let tokens = tokenize("\"héllo\" & x", Dialect::Expression).unwrap();
        assert_eq!(tokens[1].offset, 8);
        assert_eq!(tokens[2].offset, 10);
    }

    #[test]
    fn test_unrecognized_character() {
        let err = tokenize("1 # 2", Dialect::Spreadsheet).unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.message, "unrecognized character '#'");
    }
}
