pub mod embedding;
pub mod refine;
pub mod similarity;
pub mod text;
