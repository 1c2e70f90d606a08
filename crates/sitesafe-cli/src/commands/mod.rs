pub mod auth_cmd;
pub mod common;
pub mod dead_letters;
pub mod drafts;
pub mod new_form;
pub mod pending;
pub mod records;
pub mod status;
pub mod submit;
pub mod sync;
