mod alias;
mod resolver;

pub use crate::{alias::match_alias, resolver::Resolver};
