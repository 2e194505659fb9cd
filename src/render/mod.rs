pub mod html;
pub mod page;
pub mod target;

pub use html::{render_failure, render_table};
pub use page::render_page;
pub use target::{RenderTarget, SortDirection};
