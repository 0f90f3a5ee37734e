use brainfreeze::bf;

/// Prints `Hello World!` followed by a newline
pub const HELLO_WORLD: &str = bf!(
    "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]",
    ">>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++."
);
