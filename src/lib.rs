//! Virtual stylist: transfers style attributes from a reference photo onto a
//! character photo through a hosted image model, then refines the result.

pub mod config;
pub mod handlers;
pub mod llm;
pub mod stylist;
pub mod utils;
