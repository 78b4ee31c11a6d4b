use almanac_core::PipelineConfig;
use serde_json::json;

use crate::error::CliError;

use super::CommandResult;

pub fn run(config: &PipelineConfig) -> Result<CommandResult, CliError> {
    let data = json!({
        "select_model": config.select_model,
        "default": config.scorer,
        "configs": config.grid.configs(),
    });
    Ok(CommandResult::ok(data))
}
