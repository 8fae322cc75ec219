pub mod ast_printer;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod native;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod subroutine;
pub mod token;
pub mod value;
