pub mod koch_strip;
pub mod response_panel;
pub mod stats_table;
