pub mod bucket_tree;
pub mod edit_buffer;
pub mod export;
pub mod partition;
pub mod performance;
pub mod sankey;
pub mod split;
