pub mod apply;
pub mod validation;
