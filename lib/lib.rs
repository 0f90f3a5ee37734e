extern crate proc_macro;
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, LitStr, Result, Token};

/// One or more string literals that together form a program
#[derive(Debug)]
struct ProgramLiteral {
    pieces: Vec<LitStr>,
}

impl Parse for ProgramLiteral {
    fn parse(input: ParseStream) -> Result<Self> {
        let pieces = Punctuated::<LitStr, Token![,]>::parse_terminated(input)?;
        if pieces.is_empty() {
            return Err(input.error("expected at least one string literal"));
        }

        Ok(ProgramLiteral {
            pieces: pieces.into_iter().collect(),
        })
    }
}

impl ProgramLiteral {
    /// Finds the first bracket that has no partner, reporting it against the literal it came from
    fn check_balance(&self) -> Result<()> {
        // (piece index, char index within the piece) of every open `[`
        let mut open: Vec<(usize, usize)> = vec![];

        for (piece, lit) in self.pieces.iter().enumerate() {
            for (at, c) in lit.value().chars().enumerate() {
                match c {
                    '[' => open.push((piece, at)),
                    ']' => {
                        if open.pop().is_none() {
                            return Err(syn::Error::new(
                                lit.span(),
                                format!("Can't find `[` for the `]` at character {}", at + 1),
                            ));
                        }
                    }
                    _ => {}
                }
            }
        }

        match open.pop() {
            Some((piece, at)) => Err(syn::Error::new(
                self.pieces[piece].span(),
                format!("Can't find `]` for the `[` at character {}", at + 1),
            )),
            None => Ok(()),
        }
    }

    fn joined(&self) -> String {
        self.pieces.iter().map(|lit| lit.value()).collect()
    }
}

/// A program literal whose brackets are checked while compiling the Rust code.
///
/// `bf!("+++[->+<]")` or `bf!("+++", "[->+<]")` both expand to `"+++[->+<]"`.
#[proc_macro]
pub fn bf(stream: TokenStream) -> TokenStream {
    let input = parse_macro_input!(stream as ProgramLiteral);

    if let Err(error) = input.check_balance() {
        return error.to_compile_error().into();
    }

    let program = LitStr::new(&input.joined(), Span::call_site());
    quote! {
        #program
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(source: &str) -> ProgramLiteral {
        syn::parse_str(source).unwrap()
    }

    #[test]
    fn joins_pieces() {
        let input = literal(r#""++[", "-", "]""#);

        assert_eq!(input.joined(), "++[-]");
        assert!(input.check_balance().is_ok());
    }

    #[test]
    fn brackets_may_span_pieces() {
        assert!(literal(r#""[[", "]]", """#).check_balance().is_ok());
    }

    #[test]
    fn reports_unmatched_close() {
        let error = literal(r#""+]""#).check_balance().unwrap_err();

        assert_eq!(error.to_string(), "Can't find `[` for the `]` at character 2");
    }

    #[test]
    fn reports_innermost_unmatched_open() {
        let error = literal(r#""[", "[][""#).check_balance().unwrap_err();

        assert_eq!(error.to_string(), "Can't find `]` for the `[` at character 3");
    }

    #[test]
    fn needs_at_least_one_literal() {
        assert!(syn::parse_str::<ProgramLiteral>("").is_err());
        assert!(syn::parse_str::<ProgramLiteral>("42").is_err());
    }
}
