pub mod links;
pub mod templates;
