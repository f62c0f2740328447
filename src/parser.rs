use std::rc::Rc;

use crate::prelude::*;

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    // Static-check depths: break/continue need an enclosing loop, return an
    // enclosing function. Misuse is rejected here, before execution.
    loop_depth: usize,
    function_depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            loop_depth: 0,
            function_depth: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>, Vec<ParseError>> {
        let mut statements = vec![];
        let mut errors = vec![];

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    errors.push(e);
                    self.synchronize();
                }
            }
        }

        if errors.is_empty() {
            Ok(statements)
        } else {
            Err(errors)
        }
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        if self.match_tt(&[TokenType::Var]) {
            self.var_declaration()
        } else if self.match_tt(&[TokenType::Fun]) {
            self.function()
        } else {
            self.statement()
        }
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect variable name")?;

        let initializer = if self.match_tt(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    fn function(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect function name")?;

        self.consume(TokenType::LeftParen, "Expect '(' after function name")?;

        let mut parameters = vec![];
        if !self.check(&TokenType::RightParen) {
            loop {
                if parameters.len() >= 255 {
                    return Err(self.error_at_peek("Can't have more than 255 parameters"));
                }

                parameters.push(self.consume(TokenType::Identifier, "Expect parameter name")?);
                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "Expect ')' after parameters")?;
        self.consume(TokenType::LeftBrace, "Expect '{' before function body")?;

        // A function body starts a fresh loop context: a `break` inside it
        // cannot target a loop surrounding the declaration.
        let enclosing_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.block();
        self.function_depth -= 1;
        self.loop_depth = enclosing_loop_depth;

        let body = body?.into_iter().map(Rc::new).collect::<Vec<_>>();

        Ok(Stmt::Function {
            name,
            params: parameters,
            body,
        })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_tt(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_tt(&[TokenType::While]) {
            self.while_statement()
        } else if self.match_tt(&[TokenType::Return]) {
            self.return_statement()
        } else if self.match_tt(&[TokenType::Break]) {
            self.break_statement()
        } else if self.match_tt(&[TokenType::Continue]) {
            self.continue_statement()
        } else if self.match_tt(&[TokenType::LeftBrace]) {
            Ok(Stmt::Block {
                statements: self.block()?,
            })
        } else {
            self.expression_statement()
        }
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_tt(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after while condition")?;

        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;

        Ok(Stmt::While {
            condition,
            body: Box::new(body?),
        })
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous();
        if self.function_depth == 0 {
            return Err(ParseError::message(
                Some(keyword),
                "Cannot return outside of a function",
            ));
        }

        let value = if !self.check(&TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::Semicolon, "Expect ';' after 'return'")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn break_statement(&mut self) -> ParseResult<Stmt> {
        let token = self.previous();
        if self.loop_depth == 0 {
            return Err(ParseError::message(
                Some(token),
                "Cannot use 'break' outside of a loop",
            ));
        }

        self.consume(TokenType::Semicolon, "Expect ';' after 'break'")?;
        Ok(Stmt::Break { token })
    }

    fn continue_statement(&mut self) -> ParseResult<Stmt> {
        let token = self.previous();
        if self.loop_depth == 0 {
            return Err(ParseError::message(
                Some(token),
                "Cannot use 'continue' outside of a loop",
            ));
        }

        self.consume(TokenType::Semicolon, "Expect ';' after 'continue'")?;
        Ok(Stmt::Continue { token })
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = vec![];

        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression")?;
        Ok(Stmt::Expression { expr })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if self.match_tt(&[TokenType::Equal]) {
            let equals = self.previous();
            let value = self.assignment()?;
            if let Expr::Variable { name } = expr {
                return Ok(Expr::Assignment {
                    name,
                    value: Box::new(value),
                });
            }

            return Err(ParseError::message(
                Some(equals),
                "Invalid assignment target",
            ));
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;

        while self.match_tt(&[TokenType::Or]) {
            let operator = self.previous();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;

        while self.match_tt(&[TokenType::And]) {
            let operator = self.previous();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;

        while self.match_tt(&[TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator: Token = self.previous();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;

        while self.match_tt(&[
            TokenType::GreaterEqual,
            TokenType::Greater,
            TokenType::LessEqual,
            TokenType::Less,
        ]) {
            let operator: Token = self.previous();
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;

        while self.match_tt(&[TokenType::Minus, TokenType::Plus]) {
            let operator: Token = self.previous();
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;

        while self.match_tt(&[TokenType::Slash, TokenType::Star]) {
            let operator: Token = self.previous();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_tt(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_tt(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_tt(&[TokenType::Dot]) {
                let name = self.consume(TokenType::Identifier, "Expect property name after '.'")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = vec![];

        if !self.check(&TokenType::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    return Err(self.error_at_peek("Can't have more than 255 arguments"));
                }

                // `name: expr` is a named argument; anything else is positional.
                if self.check(&TokenType::Identifier) && self.check_next(&TokenType::Colon) {
                    let name = self.advance();
                    self.advance(); // the ':'
                    let value = self.expression()?;
                    arguments.push(Argument::Named { name, value });
                } else {
                    arguments.push(Argument::Positional(self.expression()?));
                }

                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.match_tt(&[TokenType::False]) {
            return Ok(Expr::Literal {
                value: Value::Bool(false),
            });
        }
        if self.match_tt(&[TokenType::True]) {
            return Ok(Expr::Literal {
                value: Value::Bool(true),
            });
        }
        if self.match_tt(&[TokenType::Null]) {
            return Ok(Expr::Literal { value: Value::Null });
        }
        if self.match_tt(&[
            TokenType::IntLiteral,
            TokenType::FloatLiteral,
            TokenType::StringLiteral,
        ]) {
            let token = self.previous();
            let value = token.literal.clone().ok_or_else(|| {
                ParseError::message(Some(token), "Literal token without a value")
            })?;
            return Ok(Expr::Literal { value });
        }
        if self.match_tt(&[TokenType::Identifier]) {
            return Ok(Expr::Variable {
                name: self.previous(),
            });
        }
        if self.match_tt(&[TokenType::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping {
                expr: Box::new(expr),
            });
        }

        Err(ParseError::UnexpectedToken(self.peek().clone()))
    }

    /// Return the next token if its `token_type` matches the given type.
    /// Otherwise, fail with the given message at the offending token.
    fn consume(&mut self, token_type: TokenType, message: &str) -> ParseResult<Token> {
        if self.check(&token_type) {
            return Ok(self.advance());
        }

        Err(self.error_at_peek(message))
    }

    fn error_at_peek(&self, message: &str) -> ParseError {
        let token = self.peek().clone();
        let location = if token.token_type == TokenType::EOF {
            "at end".to_owned()
        } else {
            format!("at '{}'", token.lexeme)
        };

        ParseError::message(Some(token), format!("{message} ({location})"))
    }

    fn match_tt(&mut self, types: &[TokenType]) -> bool {
        for tt in types {
            if self.check(tt) {
                self.advance();
                return true;
            }
        }

        false
    }

    /// Check to see if the next token's type matches the given `token_type`.
    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == *token_type
    }

    fn check_next(&self, token_type: &TokenType) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(t) => t.token_type == *token_type,
            None => false,
        }
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap()
    }

    fn previous(&mut self) -> Token {
        self.tokens.get(self.current - 1).unwrap().clone()
    }

    fn synchronize(&mut self) {
        self.advance();

        // Move and discard tokens until we find a statement boundary
        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Fun
                | TokenType::Var
                | TokenType::If
                | TokenType::While
                | TokenType::Break
                | TokenType::Continue
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<ParseError>> {
        let tokens = Scanner::new(source).scan_tokens().expect("scan failed");
        Parser::new(tokens).parse()
    }

    #[test]
    fn call_arguments_keep_their_keying() {
        let stmts = parse("f(1, b: 2);").unwrap();
        let expr = match &stmts[0] {
            Stmt::Expression { expr } => expr,
            other => panic!("expected expression statement, got {other:?}"),
        };
        let arguments = match expr {
            Expr::Call { arguments, .. } => arguments,
            other => panic!("expected call, got {other:?}"),
        };

        assert_eq!(arguments.len(), 2);
        assert!(matches!(arguments[0], Argument::Positional(_)));
        match &arguments[1] {
            Argument::Named { name, .. } => assert_eq!(name.lexeme, "b"),
            other => panic!("expected named argument, got {other:?}"),
        }
    }

    #[test]
    fn a_colon_does_not_make_a_variable_reference_named() {
        // `b: x` is named with value `x`; plain `b` stays positional.
        let stmts = parse("f(b);").unwrap();
        if let Stmt::Expression {
            expr: Expr::Call { arguments, .. },
        } = &stmts[0]
        {
            assert!(matches!(arguments[0], Argument::Positional(_)));
        } else {
            panic!("expected a call expression");
        }
    }

    #[test]
    fn break_outside_a_loop_is_rejected() {
        let errors = parse("break;").unwrap_err();
        assert!(errors[0].to_string().contains("outside of a loop"));
    }

    #[test]
    fn continue_outside_a_loop_is_rejected() {
        let errors = parse("if (true) { continue; }").unwrap_err();
        assert!(errors[0].to_string().contains("outside of a loop"));
    }

    #[test]
    fn break_inside_nested_statements_within_a_loop_is_accepted() {
        let res = parse("while (true) { if (true) { break; } }");
        assert!(res.is_ok());
    }

    #[test]
    fn break_cannot_target_a_loop_outside_the_enclosing_function() {
        let errors = parse("while (true) { fun g() { break; } }").unwrap_err();
        assert!(errors[0].to_string().contains("outside of a loop"));
    }

    #[test]
    fn return_outside_a_function_is_rejected() {
        let errors = parse("return 1;").unwrap_err();
        assert!(errors[0].to_string().contains("outside of a function"));
    }

    #[test]
    fn property_access_parses_into_get() {
        let stmts = parse("\"abc\".length;").unwrap();
        if let Stmt::Expression {
            expr: Expr::Get { name, .. },
        } = &stmts[0]
        {
            assert_eq!(name.lexeme, "length");
        } else {
            panic!("expected a property access");
        }
    }

    #[test]
    fn unexpected_token_reports_lexeme_and_position() {
        let errors = parse("var a = ;").unwrap_err();
        match &errors[0] {
            ParseError::UnexpectedToken(token) => {
                assert_eq!(token.lexeme, ";");
                assert_eq!((token.line, token.column), (1, 9));
            }
            other => panic!("expected UnexpectedToken, got {other:?}"),
        }
    }

    #[test]
    fn parsing_continues_past_an_error_to_collect_more() {
        let errors = parse("var = 1; var b = ;").unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
