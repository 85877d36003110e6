//! MySQL protocol level constants shared by the option tables and the
//! transport seam

pub mod constants;
