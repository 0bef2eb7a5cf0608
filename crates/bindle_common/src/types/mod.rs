pub mod chunk_kind;
pub mod dependency_request;
pub mod entry_point;
pub mod import_kind;
pub mod manifest;
pub mod module_id;
pub mod module_record;
pub mod module_table;
pub mod output_asset;
pub mod raw_idx;
pub mod resolved_id;
