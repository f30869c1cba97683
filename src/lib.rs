//! Library entry for loctable: the localization engine and its support paths.

pub mod i18n;
pub mod util;
