use super::{is_instruction, Token, TokenKind};

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    /** Human Readable positions in file */
    pub cur_line: usize,
    pub cur_col: usize,

    /** 'raw' format / offset within the file (in terms of 'codepoints') */
    pub codepoint_offset: usize,

    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(chars: &'a str) -> Lexer<'a> {
        Lexer {
            cur_col: 1,
            cur_line: 1,

            codepoint_offset: 0,

            chars: chars.chars().peekable(),
        }
    }

    fn consume_char(&mut self) -> Option<char> {
        match self.chars.next() {
            Some(c) => {
                self.cur_col += 1;
                if c == '\n' {
                    self.cur_line += 1;
                    self.cur_col = 1;
                }
                self.codepoint_offset += 1;
                Some(c)
            }
            None => None,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.chars.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.consume_char();
        }
    }

    /// Next token including comments, `None` once the source runs out
    pub fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();

        let (line, column, offset) = (self.cur_line, self.cur_col, self.codepoint_offset);
        let c = self.consume_char()?;

        let kind = match TokenKind::from_glyph(c) {
            Some(kind) => kind,
            None => {
                // Simplify the comment stream down to strings
                let mut comment = String::from(c);
                while let Some(&next) = self.chars.peek() {
                    if is_instruction(next) {
                        break;
                    }
                    self.consume_char();
                    comment.push(next);
                }
                TokenKind::Comment(comment.trim_end().to_string())
            }
        };

        Some(Token {
            kind,
            line,
            column,
            offset,
        })
    }

    /// Next instruction token, comments are skipped
    pub fn next_instruction(&mut self) -> Option<Token> {
        loop {
            let token = self.next_token()?;
            if !matches!(token.kind, TokenKind::Comment(_)) {
                return Some(token);
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}
