//! List command implementation.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::components::Component;
use crate::logging::Logger;
use crate::registry::Registry;

/// Heading for components without a category.
const UNCATEGORIZED: &str = "Other";

/// Components grouped by category: declared categories first (in their
/// declared order), then any undeclared ones in order of first use, then
/// uncategorized components.
#[must_use]
pub fn grouped(registry: &Registry) -> Vec<(&str, Vec<&Component>)> {
    let mut order: Vec<&str> = registry.categories().iter().map(String::as_str).collect();
    for component in registry.components() {
        if let Some(category) = component.category.as_deref()
            && !order.contains(&category)
        {
            order.push(category);
        }
    }

    let mut groups: Vec<(&str, Vec<&Component>)> = order
        .into_iter()
        .map(|category| {
            let members = registry
                .components()
                .iter()
                .filter(|c| c.category.as_deref() == Some(category))
                .collect();
            (category, members)
        })
        .collect();

    let other: Vec<&Component> = registry
        .components()
        .iter()
        .filter(|c| c.category.is_none())
        .collect();
    groups.push((UNCATEGORIZED, other));

    groups.retain(|(_, members)| !members.is_empty());
    groups
}

/// One listing line for `component`.
#[must_use]
pub fn describe(component: &Component) -> String {
    let mut line = format!("{:<20} {}", component.name, component.title());
    if !component.description.is_empty() {
        line.push_str(&format!(" - {}", component.description));
    }
    if !component.aliases.is_empty() {
        line.push_str(&format!(" (aliases: {})", component.aliases.join(", ")));
    }
    if component.opt_in {
        line.push_str(" [opt-in]");
    }
    if component.reboot {
        line.push_str(" [reboot]");
    }
    line
}

/// Run the list command.
///
/// # Errors
///
/// Returns an error if configuration loading or the registry self-check fails.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    for (category, members) in grouped(&setup.registry) {
        log.stage(category);
        for component in members {
            log.info(&describe(component));
        }
    }
    log.info("");
    log.info("'all' selects every component not marked [opt-in]");
    Ok(())
}
