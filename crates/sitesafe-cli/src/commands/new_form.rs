use chrono::Local;
use sitesafe_core::models::FormType;
use sitesafe_core::schema::FormSchema;

use crate::commands::common::LocalState;
use crate::error::CliError;

pub fn run_new_form(form_type: FormType, local: &LocalState) -> Result<(), CliError> {
    let author = local
        .user
        .as_ref()
        .map_or("", |user| user.full_name.as_str());
    let schema = FormSchema::for_form_type(form_type);
    if !schema.is_configured() {
        tracing::warn!("{form_type} has no form layout yet");
    }

    let data = schema.initial_values(author, &Local::now());
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
