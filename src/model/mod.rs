pub mod field;
pub mod issue;
pub mod project;
