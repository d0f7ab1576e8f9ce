pub mod parser;
pub mod pass;
pub mod quotation;
pub mod repository;
pub mod segmenter;
pub mod template;
