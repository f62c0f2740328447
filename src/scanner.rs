use crate::prelude::*;

#[derive(Debug)]
pub struct Scanner {
    source_chars: Vec<char>,
    tokens: Vec<Token>,
    errors: Vec<ParseError>,
    start: usize,
    current: usize,
    line: u32,
    column: u32,
    start_line: u32,
    start_column: u32,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            source_chars: source.chars().collect(),
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, Vec<ParseError>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column;
            self.scan_token();
        }

        self.tokens.push(Token::new(TokenType::EOF, "", None, self.line, self.column));

        if self.errors.is_empty() {
            // Take our temporary tokens out. It will be replaced by the
            // default() value for the vector
            Ok(std::mem::take(&mut self.tokens))
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source_chars.len()
    }

    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ':' => self.add_token(TokenType::Colon),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            ';' => self.add_token(TokenType::Semicolon),
            '*' => self.add_token(TokenType::Star),
            '!' => {
                let token_type = if self.match_next('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type);
            }
            '=' => {
                let token_type = if self.match_next('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }
            '<' => {
                let token_type = if self.match_next('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }
            '>' => {
                let token_type = if self.match_next('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }
            '/' => {
                if self.match_next('/') {
                    // Go until end of the commented line
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            // Line and column counters are kept by advance()
            ' ' | '\r' | '\t' | '\n' => {}
            '"' => self.string(),
            '0'..='9' => self.number(),
            c if is_alpha(c) => self.identifier(),
            _ => {
                let token = self.make_token(TokenType::Illegal, None);
                self.errors.push(ParseError::IllegalToken(token));
            }
        }
    }

    fn advance(&mut self) -> char {
        let ch = *self
            .source_chars
            .get(self.current)
            .expect("failed to read char!");
        self.current += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        ch
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_token_with_literal(token_type, None);
    }

    fn source_substring(&self, start: usize, end: usize) -> String {
        self.source_chars.get(start..end).unwrap().iter().collect()
    }

    fn make_token(&self, token_type: TokenType, literal_value: Option<Value>) -> Token {
        let text = self.source_substring(self.start, self.current);
        Token::new(
            token_type,
            &text,
            literal_value,
            self.start_line,
            self.start_column,
        )
    }

    fn add_token_with_literal(&mut self, token_type: TokenType, literal_value: Option<Value>) {
        let token = self.make_token(token_type, literal_value);
        self.tokens.push(token);
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.is_at_end() {
            return false;
        }

        if let Some(c) = self.source_chars.get(self.current) {
            if c == &expected {
                self.advance();
                return true;
            }
        }

        false
    }

    fn peek(&self) -> char {
        *self.source_chars.get(self.current).unwrap_or(&'\0')
    }

    fn peek_next(&self) -> char {
        *self.source_chars.get(self.current + 1).unwrap_or(&'\0')
    }

    fn string(&mut self) {
        while self.peek() != '"' && !self.is_at_end() {
            self.advance();
        }

        if self.is_at_end() {
            let token = self.make_token(TokenType::Illegal, None);
            self.errors
                .push(ParseError::message(Some(token), "Unterminated string"));
            return;
        }

        // The closing "
        self.advance();

        // Skip the quote marks
        let text = self.source_substring(self.start + 1, self.current - 1);
        self.add_token_with_literal(TokenType::StringLiteral, Some(Value::Str(text)));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;

            // Consume '.'
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.source_substring(self.start, self.current);

        // Integer literals too large for i64 fall back to a float value.
        let value = if is_float {
            Value::Float(
                text.parse::<f64>()
                    .unwrap_or_else(|_| panic!("failed to parse number: {}", text)),
            )
        } else {
            match text.parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => Value::Float(
                    text.parse::<f64>()
                        .unwrap_or_else(|_| panic!("failed to parse number: {}", text)),
                ),
            }
        };

        let token_type = if is_float {
            TokenType::FloatLiteral
        } else {
            TokenType::IntLiteral
        };
        self.add_token_with_literal(token_type, Some(value));
    }

    fn identifier(&mut self) {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let text = self.source_substring(self.start, self.current);
        let token_type = get_keyword(&text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alpha_numeric(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

fn get_keyword(text: &str) -> Option<TokenType> {
    match text {
        "and" => Some(TokenType::And),
        "break" => Some(TokenType::Break),
        "continue" => Some(TokenType::Continue),
        "else" => Some(TokenType::Else),
        "false" => Some(TokenType::False),
        "fun" => Some(TokenType::Fun),
        "if" => Some(TokenType::If),
        "null" => Some(TokenType::Null),
        "or" => Some(TokenType::Or),
        "return" => Some(TokenType::Return),
        "true" => Some(TokenType::True),
        "var" => Some(TokenType::Var),
        "while" => Some(TokenType::While),
        _ => None,
    }
}
