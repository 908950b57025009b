use crate::build::BuildManifest;
use crate::cli::parser::CliParser;
use crate::orchestrator::{plan, PlannedTarget};
use crate::result::Result;

pub async fn execute(config_path: Option<&str>) -> Result<()> {
    let manifest_path = CliParser::validate_manifest_path(config_path)?;
    let manifest = BuildManifest::from_file(&manifest_path).await?;
    let planned = plan(&manifest.targets)?;

    log::info!("Planned {} targets from {}", planned.len(), manifest_path.display());

    println!(
        "{} ({}, dSYMs: {})",
        manifest.project_path().display(),
        manifest.build.configuration,
        manifest.build.debug_symbols
    );
    for target in &planned {
        print!("{}", render(target));
    }
    Ok(())
}

fn render(target: &PlannedTarget) -> String {
    let sdks: Vec<&str> = target.sdks.iter().map(|s| s.as_str()).collect();
    let mut out = format!(
        "{} [{}]\n  slices: {}\n",
        target.label,
        target.platform,
        sdks.join(", ")
    );
    for module in &target.modules {
        if target.merges {
            out.push_str(&format!("  merge: {}.xcframework\n", module));
        } else {
            out.push_str(&format!("  product: {}\n", module));
        }
    }
    out
}
