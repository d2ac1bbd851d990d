//! Abstract Syntax Tree types for the observed scripting language.
//!
//! Architecture: Input → Lexer → Parser → AST → Code-Map Builder.

pub mod types;
