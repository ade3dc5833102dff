pub mod document;
pub mod tree;
