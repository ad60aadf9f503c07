// ABOUTME: Apps command implementation.
// ABOUTME: Lists controller applications with their resolved route hosts.

use devforge::error::Result;
use devforge::output::Output;
use devforge::workflow::Workflow;

pub async fn apps(workflow: Workflow, output: Output) -> Result<()> {
    let listing = workflow.list_apps().await?;
    output.warnings(&listing.warnings);

    if output.document(&listing) {
        return Ok(());
    }
    for app in &listing.apps {
        output.detail(&format!(
            "{}\t{}\t{}\t{}\t{}",
            app.app_name,
            app.namespace,
            app.sync_status.as_deref().unwrap_or("-"),
            app.health.as_deref().unwrap_or("-"),
            app.route_host.as_deref().unwrap_or("-"),
        ));
    }
    output.success(&format!("{} application(s)", listing.apps.len()));
    Ok(())
}
