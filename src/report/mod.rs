//! Report generation modules.

pub mod generator;
pub mod timeline;
pub mod xlsx;

pub use generator::{
    generate_items_table, generate_json_report, generate_markdown_report, generate_status_line,
    OtdReport,
};
pub use timeline::{build_timeline, render_timeline};
pub use xlsx::export_xlsx;
