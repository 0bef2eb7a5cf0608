pub mod asset;
pub mod css;
pub mod ecmascript;
