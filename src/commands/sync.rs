// ABOUTME: Sync command implementation.

use devforge::error::Result;
use devforge::output::Output;
use devforge::workflow::Workflow;

pub async fn sync(workflow: Workflow, app_name: &str, output: Output) -> Result<()> {
    let report = workflow.sync(app_name).await?;
    if !output.document(&report) {
        output.success(&format!(
            "Sync triggered for {} (HTTP {})",
            report.app_name, report.response.status
        ));
    }
    Ok(())
}
