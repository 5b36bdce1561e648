pub mod decision;
pub mod handlers;
