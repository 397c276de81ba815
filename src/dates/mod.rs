//! Date resolution for forum timestamps
//!
//! Converts ISO attributes and human-language strings ("Hoy a las 14:30",
//! "hace 10 minutos", "15 de marzo de 2023") into absolute UTC timestamps.

mod locale;
mod resolver;

pub use locale::DateLocale;
pub use resolver::{resolve_date, DateResolver};
