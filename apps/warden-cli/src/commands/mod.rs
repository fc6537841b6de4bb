pub mod classify;
pub mod outcomes;
pub mod serve;
pub mod tier;
