//! Rendering of the locality alert email.

use anyhow::{anyhow, Result};
use minijinja::{context, Environment};
use std::sync::OnceLock;

use crate::domain::incident::Incident;

const TEMPLATE_NAME: &str = "incident_alert.html";
const TEMPLATE_SOURCE: &str = include_str!("../../templates/email/incident_alert.html");

static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(|| {
        // `.html` names get HTML auto-escaping from the default callback.
        let mut env = Environment::new();
        if let Err(err) = env.add_template(TEMPLATE_NAME, TEMPLATE_SOURCE) {
            tracing::error!(error = %err, "failed to load alert email template");
        }
        env
    })
}

pub fn subject(incident: &Incident) -> String {
    format!("Alert: New Incident in {}", incident.locality)
}

/// Renders the HTML body for one recipient.
pub fn render_body(incident: &Incident, recipient_name: Option<&str>) -> Result<String> {
    let greeting_name = recipient_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("there");

    let template = environment()
        .get_template(TEMPLATE_NAME)
        .map_err(|err| anyhow!("alert template unavailable: {}", err))?;

    template
        .render(context! {
            locality => &incident.locality,
            greeting_name => greeting_name,
            title => &incident.title,
            location => &incident.location,
            description => &incident.description,
            image_url => &incident.image_url,
        })
        .map_err(|err| anyhow!("failed to render alert email: {}", err))
}
